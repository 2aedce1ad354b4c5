// Route table
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::*;
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Compression is done per response in the handlers, so there is no
/// CompressionLayer here.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/nodes", get(list_nodes))
        .route("/samples", post(ingest_samples))
        .route("/series", post(add_series_to_active))
        .route("/charts", get(list_charts).post(create_chart))
        .route("/charts/:id", axum::routing::delete(delete_chart))
        .route("/charts/:id/title", put(set_title))
        .route("/charts/:id/series", post(add_series))
        .route("/charts/:id/series/:tag", axum::routing::delete(remove_series))
        .route("/charts/:id/series/:tag/toggle", post(toggle_series))
        .route("/charts/:id/series/:tag/label", put(set_series_label))
        .route("/charts/:id/series/:tag/color", put(set_series_color))
        .route("/charts/:id/pause", post(pause_chart))
        .route("/charts/:id/y-scale", put(set_y_scale))
        .route("/charts/:id/x-range", put(set_x_range))
        .route("/charts/:id/zoom", put(set_zoom))
        .route("/charts/:id/pan", post(pan_chart))
        .route("/charts/:id/window", get(chart_window))
        .route("/charts/:id/stream", get(stream_chart))
        .route("/workspaces", get(list_workspaces))
        .route(
            "/workspaces/:id",
            put(save_workspace).delete(delete_workspace),
        )
        .route("/workspaces/:id/activate", post(activate_workspace))
        .route("/bundle", get(export_bundle).post(import_bundle))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
