use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use log::debug;
use tokio::task::block_in_place;

use super::error::{AppError, Result};
use super::state::ViewerState;
use super::types::*;
use crate::dataset::{SceneId, Split};

/// 列出所有已下载的场景
#[utoipa::path(
    get,
    path = "/scenes",
    responses((status = 200, description = "场景列表", body = ScenesResponse))
)]
pub async fn scenes_handler(
    State(state): State<Arc<ViewerState>>,
) -> Result<Json<ScenesResponse>> {
    Ok(Json(block_in_place(|| state.scenes())?))
}

/// 场景完整性信息
#[utoipa::path(
    get,
    path = "/scenes/{split}/{video_id}",
    params(("split" = String, Path), ("video_id" = String, Path)),
    responses(
        (status = 200, description = "场景信息", body = SceneResponse),
        (status = 404, description = "场景不存在")
    )
)]
pub async fn scene_handler(
    State(state): State<Arc<ViewerState>>,
    Path((split, video_id)): Path<(Split, String)>,
) -> Result<Json<SceneResponse>> {
    let id = SceneId { split, video_id };
    debug!("加载场景 {id}");
    Ok(Json(block_in_place(|| state.scene(&id))?))
}

/// 获取指定帧的文件与内参
#[utoipa::path(
    get,
    path = "/scenes/{split}/{video_id}/frames/{index}",
    params(("split" = String, Path), ("video_id" = String, Path), ("index" = usize, Path)),
    responses(
        (status = 200, description = "帧信息", body = FrameResponse),
        (status = 404, description = "场景或帧不存在")
    )
)]
pub async fn frame_handler(
    State(state): State<Arc<ViewerState>>,
    Path((split, video_id, index)): Path<(Split, String, usize)>,
) -> Result<Json<FrameResponse>> {
    let id = SceneId { split, video_id };
    Ok(Json(block_in_place(|| state.frame(&id, index))?))
}

/// 获取指定帧的原始 PNG，`kind` 为 `rgb` 或 `depth`
#[utoipa::path(
    get,
    path = "/scenes/{split}/{video_id}/frames/{index}/{kind}",
    params(
        ("split" = String, Path),
        ("video_id" = String, Path),
        ("index" = usize, Path),
        ("kind" = String, Path)
    ),
    responses(
        (status = 200, description = "PNG 图片"),
        (status = 404, description = "场景或帧不存在")
    )
)]
pub async fn image_handler(
    State(state): State<Arc<ViewerState>>,
    Path((split, video_id, index, kind)): Path<(Split, String, usize, String)>,
) -> Result<impl IntoResponse> {
    let id = SceneId { split, video_id };
    let frame = block_in_place(|| state.frame(&id, index))?;
    let path = match kind.as_str() {
        "rgb" => frame.rgb,
        "depth" => frame.depth,
        _ => return Err(AppError::NotFound(format!("image kind {kind}"))),
    };
    let data = tokio::fs::read(&path).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], data))
}

/// prometheus 指标
pub async fn metrics_handler() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], crate::metrics::render())
}
