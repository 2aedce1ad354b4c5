// Chunked JSON streaming utilities
use crate::application::engine::EngineHandle;
use crate::infrastructure::http_response::brotli_compress;
use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::Stream;
use futures::{future, StreamExt};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;

/// Stream already-encoded JSON documents, one length-prefixed chunk each.
///
/// Chunks are compressed individually, so no `Content-Encoding` header is
/// set on the response itself.
pub fn chunked_json_stream<S>(stream: S, compress: bool) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = Vec<u8>> + Send + 'static,
{
    let byte_stream = stream.then(move |json| frame_chunk(json, compress));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson-chunks")
        .header(header::TRANSFER_ENCODING, "chunked")
        .body(Body::from_stream(byte_stream))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// 4-byte big-endian length followed by the (optionally Brotli) JSON payload.
pub async fn frame_chunk(json: Vec<u8>, compress: bool) -> std::io::Result<Bytes> {
    let payload = if compress {
        brotli_compress(json).await?
    } else {
        json
    };

    let mut chunk = BytesMut::with_capacity(4 + payload.len());
    chunk.put_u32(payload.len() as u32);
    chunk.put_slice(&payload);
    Ok(chunk.freeze())
}

/// Encode the chart's window every `period` until the chart is removed or
/// the engine stops.
pub fn window_stream(
    engine: EngineHandle,
    chart_id: String,
    period: Duration,
) -> impl Stream<Item = Vec<u8>> + Send + 'static {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    IntervalStream::new(interval)
        .then(move |_| {
            let engine = engine.clone();
            let chart_id = chart_id.clone();
            async move {
                match engine.window_json(chart_id).await {
                    Ok(window) => window,
                    Err(e) => {
                        tracing::debug!("Window stream ended: {}", e);
                        None
                    }
                }
            }
        })
        .take_while(|window| future::ready(window.is_some()))
        .filter_map(future::ready)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::engine::tests::{spawn_engine, ManualClock};
    use crate::domain::sample::Sample;

    #[tokio::test]
    async fn test_chunk_is_length_prefixed() {
        let chunk = frame_chunk(b"[1,2]".to_vec(), false).await.unwrap();
        assert_eq!(&chunk[..4], &[0, 0, 0, 5]);
        assert_eq!(&chunk[4..], b"[1,2]");
    }

    #[tokio::test]
    async fn test_compressed_chunk_length_matches_payload() {
        let chunk = frame_chunk("x".repeat(1_000).into_bytes(), true).await.unwrap();
        let len = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as usize;
        assert_eq!(len, chunk.len() - 4);
        assert!(len < 1_000);
    }

    #[tokio::test]
    async fn test_stream_body_frames_every_document() {
        let documents = futures::stream::iter(vec![b"{}".to_vec(), b"[]".to_vec()]);
        let response = chunked_json_stream(documents, false).unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"\x00\x00\x00\x02{}\x00\x00\x00\x02[]");
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_stream_ends_when_chart_removed() {
        let clock = ManualClock::at(10_000);
        let engine = spawn_engine(clock);
        engine.ingest(vec![Sample::new("A", 1.0, 9_900)]).await.unwrap();

        let mut stream = Box::pin(window_stream(
            engine.clone(),
            "chart-1".into(),
            Duration::from_millis(50),
        ));
        let first: serde_json::Value = serde_json::from_slice(&stream.next().await.unwrap()).unwrap();
        assert_eq!(first["chart_id"], "chart-1");
        assert_eq!(first["visible"].as_array().map(|v| v.len()), Some(1));

        engine
            .call(|state, _| state.registry.remove_chart("chart-1"))
            .await
            .unwrap();
        assert!(stream.next().await.is_none());
    }
}
