mod api;
mod error;
mod state;
mod types;

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::OpenApi;

pub use self::error::AppError;
pub use self::state::*;
pub use self::types::*;

#[derive(OpenApi)]
#[openapi(
    paths(api::scenes_handler, api::scene_handler, api::frame_handler, api::image_handler),
    components(schemas(ScenesResponse, SceneResponse, FrameResponse))
)]
pub struct ApiDoc;

/// 构建只读浏览 API
pub fn create_app(state: Arc<ViewerState>) -> Router {
    Router::new()
        .route("/scenes", get(api::scenes_handler))
        .route("/scenes/{split}/{video_id}", get(api::scene_handler))
        .route("/scenes/{split}/{video_id}/frames/{index}", get(api::frame_handler))
        .route("/scenes/{split}/{video_id}/frames/{index}/{kind}", get(api::image_handler))
        .route("/metrics", get(api::metrics_handler))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        // 只读接口，不接受请求体
        .layer(RequestBodyLimitLayer::new(1024))
        .with_state(state)
}
