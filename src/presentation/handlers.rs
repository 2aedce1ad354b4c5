// HTTP request handlers
use crate::application::chart_registry::ChartRegistry;
use crate::application::engine::EngineError;
use crate::application::workspace_service::WorkspaceError;
use crate::domain::chart::{AxisBound, Chart, TagNode, XUnit};
use crate::domain::sample::Sample;
use crate::domain::workspace::{ExportBundle, Workspace};
use crate::infrastructure::chunked_json::{chunked_json_stream, window_stream};
use crate::infrastructure::http_response::{accepts_brotli, encoded_json_response, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("chart {0} not found")]
    ChartNotFound(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::ChartNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Engine(EngineError::Encode(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Engine(_) | ApiError::Workspace(WorkspaceError::Engine(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Workspace(WorkspaceError::UnsupportedBundle(_)) => StatusCode::BAD_REQUEST,
            ApiError::Workspace(WorkspaceError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {:#}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

type ApiResult = Result<Response, ApiError>;

async fn respond<T: Serialize>(headers: &HeaderMap, value: &T) -> ApiResult {
    Ok(json_response(value, accepts_brotli(headers))
        .await
        .unwrap_or_else(|status| status.into_response()))
}

/// Run `f` against the registry if `chart_id` exists and return the chart
/// list afterwards. Rejections inside `f` are silent.
async fn mutate_chart<F>(state: &AppState, chart_id: String, f: F) -> Result<Vec<Chart>, ApiError>
where
    F: FnOnce(&mut ChartRegistry, &str, i64) + Send + 'static,
{
    let id = chart_id.clone();
    state
        .engine
        .call(move |engine, now| {
            engine.registry.chart(&id)?;
            f(&mut engine.registry, &id, now);
            Some(engine.registry.charts().to_vec())
        })
        .await?
        .ok_or(ApiError::ChartNotFound(chart_id))
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn list_nodes(headers: HeaderMap, State(state): State<Arc<AppState>>) -> ApiResult {
    respond(&headers, &state.nodes).await
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SamplesBody {
    Many(Vec<Sample>),
    One(Sample),
}

impl SamplesBody {
    fn into_samples(self) -> Vec<Sample> {
        match self {
            SamplesBody::Many(samples) => samples,
            SamplesBody::One(sample) => vec![sample],
        }
    }
}

pub async fn ingest_samples(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SamplesBody>,
) -> Result<StatusCode, ApiError> {
    state.engine.ingest(body.into_samples()).await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn list_charts(headers: HeaderMap, State(state): State<Arc<AppState>>) -> ApiResult {
    let charts = state.engine.charts().await?;
    respond(&headers, &charts).await
}

#[derive(Debug, Serialize)]
pub struct CreatedChart {
    pub id: String,
    pub charts: Vec<Chart>,
}

pub async fn create_chart(headers: HeaderMap, State(state): State<Arc<AppState>>) -> ApiResult {
    let created = state
        .engine
        .call(|engine, now| {
            let id = engine.registry.add_chart(now);
            CreatedChart {
                id,
                charts: engine.registry.charts().to_vec(),
            }
        })
        .await?;
    tracing::info!(chart = %created.id, "Chart added");
    respond(&headers, &created).await
}

pub async fn delete_chart(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult {
    let charts = mutate_chart(&state, id, |registry, id, _| {
        registry.remove_chart(id);
    })
    .await?;
    respond(&headers, &charts).await
}

pub async fn add_series(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(node): Json<TagNode>,
) -> ApiResult {
    let charts = mutate_chart(&state, id, move |registry, id, _| {
        registry.add_series_to_chart(id, &node);
    })
    .await?;
    respond(&headers, &charts).await
}

/// Adds to whichever chart is currently last in the list.
pub async fn add_series_to_active(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(node): Json<TagNode>,
) -> ApiResult {
    let charts = state
        .engine
        .call(move |engine, _| {
            engine.registry.add_series_to_active_chart(&node);
            engine.registry.charts().to_vec()
        })
        .await?;
    respond(&headers, &charts).await
}

pub async fn remove_series(
    Path((id, tag)): Path<(String, String)>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult {
    let charts = mutate_chart(&state, id, move |registry, id, _| {
        registry.remove_series(id, &tag);
    })
    .await?;
    respond(&headers, &charts).await
}

pub async fn toggle_series(
    Path((id, tag)): Path<(String, String)>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult {
    let charts = mutate_chart(&state, id, move |registry, id, _| {
        registry.toggle_series(id, &tag);
    })
    .await?;
    respond(&headers, &charts).await
}

#[derive(Debug, Deserialize)]
pub struct LabelBody {
    pub label: Option<String>,
}

pub async fn set_series_label(
    Path((id, tag)): Path<(String, String)>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(body): Json<LabelBody>,
) -> ApiResult {
    let label = body.label.filter(|l| !l.trim().is_empty());
    let charts = mutate_chart(&state, id, move |registry, id, _| {
        registry.set_series_label(id, &tag, label);
    })
    .await?;
    respond(&headers, &charts).await
}

#[derive(Debug, Deserialize)]
pub struct ColorBody {
    pub color: Option<String>,
}

pub async fn set_series_color(
    Path((id, tag)): Path<(String, String)>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(body): Json<ColorBody>,
) -> ApiResult {
    let charts = mutate_chart(&state, id, move |registry, id, _| {
        registry.set_series_color(id, &tag, body.color);
    })
    .await?;
    respond(&headers, &charts).await
}

#[derive(Debug, Deserialize)]
pub struct TitleBody {
    pub title: String,
}

pub async fn set_title(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(body): Json<TitleBody>,
) -> ApiResult {
    let charts = mutate_chart(&state, id, move |registry, id, _| {
        registry.set_title(id, body.title);
    })
    .await?;
    respond(&headers, &charts).await
}

#[derive(Debug, Deserialize)]
pub struct PauseBody {
    pub paused: bool,
}

pub async fn pause_chart(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(body): Json<PauseBody>,
) -> ApiResult {
    let charts = mutate_chart(&state, id, move |registry, id, now| {
        registry.pause_chart(id, body.paused, now);
    })
    .await?;
    respond(&headers, &charts).await
}

#[derive(Debug, Deserialize)]
pub struct YScaleBody {
    #[serde(default)]
    pub y_min: Option<AxisBound>,
    #[serde(default)]
    pub y_max: Option<AxisBound>,
}

pub async fn set_y_scale(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(body): Json<YScaleBody>,
) -> ApiResult {
    let charts = mutate_chart(&state, id, move |registry, id, _| {
        registry.set_y_scale(id, body.y_min, body.y_max);
    })
    .await?;
    respond(&headers, &charts).await
}

/// `seconds` switches the unit to seconds; an explicit `unit` is applied last.
#[derive(Debug, Deserialize)]
pub struct XRangeBody {
    #[serde(default)]
    pub unit: Option<XUnit>,
    #[serde(default)]
    pub minutes: Option<u32>,
    #[serde(default)]
    pub seconds: Option<u32>,
}

pub async fn set_x_range(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(body): Json<XRangeBody>,
) -> ApiResult {
    let charts = mutate_chart(&state, id, move |registry, id, _| {
        if let Some(minutes) = body.minutes {
            registry.set_x_range_minutes(id, minutes);
        }
        if let Some(seconds) = body.seconds {
            registry.set_x_range_seconds(id, seconds);
        }
        if let Some(unit) = body.unit {
            registry.set_x_unit(id, unit);
        }
    })
    .await?;
    respond(&headers, &charts).await
}

#[derive(Debug, Deserialize)]
pub struct ZoomBody {
    #[serde(default)]
    pub range: Option<(i64, i64)>,
}

pub async fn set_zoom(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(body): Json<ZoomBody>,
) -> ApiResult {
    let charts = mutate_chart(&state, id, move |registry, id, _| {
        registry.set_zoom(id, body.range);
    })
    .await?;
    respond(&headers, &charts).await
}

#[derive(Debug, Deserialize)]
pub struct PanBody {
    pub delta_ms: i64,
}

pub async fn pan_chart(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(body): Json<PanBody>,
) -> ApiResult {
    let charts = mutate_chart(&state, id, move |registry, id, now| {
        registry.pan_chart(id, body.delta_ms, now);
    })
    .await?;
    respond(&headers, &charts).await
}

pub async fn chart_window(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult {
    let window = state
        .engine
        .window_json(id.clone())
        .await?
        .ok_or(ApiError::ChartNotFound(id))?;
    Ok(encoded_json_response(window, accepts_brotli(&headers))
        .await
        .unwrap_or_else(|status| status.into_response()))
}

/// Stream the chart's window until the chart is removed (progressive redraw)
pub async fn stream_chart(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult {
    let lookup = id.clone();
    let exists = state
        .engine
        .call(move |engine, _| engine.registry.chart(&lookup).is_some())
        .await?;
    if !exists {
        return Err(ApiError::ChartNotFound(id));
    }

    let stream = window_stream(state.engine.clone(), id, state.stream_interval);
    Ok(match chunked_json_stream(stream, accepts_brotli(&headers)) {
        Ok(response) => response,
        Err(status) => status.into_response(),
    })
}

pub async fn list_workspaces(headers: HeaderMap, State(state): State<Arc<AppState>>) -> ApiResult {
    let workspaces = state.workspaces.list().await?;
    respond(&headers, &workspaces).await
}

pub async fn save_workspace(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(workspace): Json<Workspace>,
) -> ApiResult {
    let workspaces = state.workspaces.save(Workspace { id, ..workspace }).await?;
    respond(&headers, &workspaces).await
}

pub async fn delete_workspace(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult {
    let workspaces = state.workspaces.remove(&id).await?;
    respond(&headers, &workspaces).await
}

pub async fn activate_workspace(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult {
    let charts = state.workspaces.activate(&id).await?;
    tracing::info!(workspace = %id, charts = charts.len(), "Workspace activated");
    respond(&headers, &charts).await
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub include_charts: bool,
}

pub async fn export_bundle(
    Query(query): Query<ExportQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> ApiResult {
    let bundle = state
        .workspaces
        .export(query.include_charts, chrono::Utc::now())
        .await?;
    respond(&headers, &bundle).await
}

pub async fn import_bundle(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(bundle): Json<ExportBundle>,
) -> ApiResult {
    let imported = state.workspaces.import(bundle).await?;
    respond(&headers, &serde_json::json!({ "imported": imported })).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::engine::tests::{spawn_engine, ManualClock};
    use crate::application::workspace_service::tests::{workspace, MemoryStore};
    use crate::application::workspace_service::WorkspaceService;
    use std::time::Duration;

    fn app_state() -> Arc<AppState> {
        let engine = spawn_engine(ManualClock::at(50_000));
        Arc::new(AppState {
            workspaces: WorkspaceService::new(Arc::new(MemoryStore::default()), engine.clone()),
            engine,
            stream_interval: Duration::from_millis(100),
            nodes: Vec::new(),
        })
    }

    fn api_err(result: ApiResult) -> ApiError {
        match result {
            Ok(_) => panic!("expected an error response"),
            Err(err) => err,
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_samples_body_accepts_one_or_many() {
        let one: SamplesBody =
            serde_json::from_str(r#"{"tag":"A","value":true,"timestamp":1}"#).unwrap();
        assert_eq!(one.into_samples().len(), 1);

        let many: SamplesBody = serde_json::from_str(
            r#"[{"tag":"A","value":1.5,"timestamp":1},{"tag":"B","value":2,"timestamp":1}]"#,
        )
        .unwrap();
        assert_eq!(many.into_samples().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_chart_is_404() {
        let state = app_state();
        let err = api_err(
            chart_window(Path("nope".into()), HeaderMap::new(), State(state.clone())).await,
        );
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = api_err(
            stream_chart(Path("nope".into()), HeaderMap::new(), State(state.clone())).await,
        );
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = api_err(
            pause_chart(
                Path("nope".into()),
                HeaderMap::new(),
                State(state),
                Json(PauseBody { paused: true }),
            )
            .await,
        );
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_samples_show_up_in_window() {
        let state = app_state();
        let status = ingest_samples(
            State(state.clone()),
            Json(SamplesBody::One(Sample::new("A", 4.0, 49_000))),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::ACCEPTED);

        let response = chart_window(Path("chart-1".into()), HeaderMap::new(), State(state))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["domain"]["to"], 50_000);
        assert_eq!(body["visible"][0]["values"]["A"], 4.0);
    }

    #[tokio::test]
    async fn test_add_series_and_pause() {
        let state = app_state();
        let node = TagNode::variable("ns=1;s=Sine1", "Sine1");
        add_series(
            Path("chart-1".into()),
            HeaderMap::new(),
            State(state.clone()),
            Json(node),
        )
        .await
        .unwrap();

        let response = pause_chart(
            Path("chart-1".into()),
            HeaderMap::new(),
            State(state),
            Json(PauseBody { paused: true }),
        )
        .await
        .unwrap();
        let body = body_json(response).await;
        assert_eq!(body[0]["series"][0]["tag"], "ns=1;s=Sine1");
        assert_eq!(body[0]["paused"], true);
        assert_eq!(body[0]["x_right"], 50_000);
    }

    #[tokio::test]
    async fn test_x_range_seconds_switches_unit() {
        let state = app_state();
        let response = set_x_range(
            Path("chart-1".into()),
            HeaderMap::new(),
            State(state),
            Json(XRangeBody {
                unit: None,
                minutes: None,
                seconds: Some(30),
            }),
        )
        .await
        .unwrap();
        let body = body_json(response).await;
        assert_eq!(body[0]["x_unit"], "seconds");
        assert_eq!(body[0]["x_range_seconds"], 30);
    }

    #[tokio::test]
    async fn test_create_chart_goes_first() {
        let state = app_state();
        let response = create_chart(HeaderMap::new(), State(state)).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["charts"].as_array().map(|c| c.len()), Some(2));
        assert_eq!(body["charts"][0]["id"], body["id"]);
        assert_eq!(body["charts"][0]["paused"], true);
    }

    #[tokio::test]
    async fn test_workspace_id_comes_from_path() {
        let state = app_state();
        let response = save_workspace(
            Path("from-path".into()),
            HeaderMap::new(),
            State(state),
            Json(workspace("from-body")),
        )
        .await
        .unwrap();
        let body = body_json(response).await;
        assert_eq!(body[0]["id"], "from-path");
        assert!(body[0].get("password").is_none());
    }

    #[tokio::test]
    async fn test_bad_bundle_version_is_400() {
        let state = app_state();
        let mut bundle = ExportBundle::new(Vec::new(), None, chrono::Utc::now());
        bundle.version = 7;
        let err = api_err(import_bundle(HeaderMap::new(), State(state), Json(bundle)).await);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
