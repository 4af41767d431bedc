use std::path::PathBuf;

use serde::Serialize;
use utoipa::ToSchema;

use crate::intrinsics::CameraIntrinsics;
use crate::scene::{FrameTriplet, SceneInfo};

/// 每个划分下的场景列表
#[derive(Debug, Serialize, ToSchema)]
pub struct ScenesResponse {
    #[serde(rename = "Training")]
    pub training: Vec<String>,
    #[serde(rename = "Validation")]
    pub validation: Vec<String>,
}

/// 场景完整性与帧数
#[derive(Debug, Serialize, ToSchema)]
pub struct SceneResponse {
    pub split: String,
    pub video_id: String,
    pub valid: bool,
    /// 校验详情，见 `SceneInfo`
    #[schema(value_type = Object)]
    pub info: SceneInfo,
    pub total_frames: usize,
}

/// 单帧的文件与相机内参
#[derive(Debug, Serialize, ToSchema)]
pub struct FrameResponse {
    pub index: usize,
    pub total_frames: usize,
    pub timestamp: String,
    #[schema(value_type = String)]
    pub rgb: PathBuf,
    #[schema(value_type = String)]
    pub depth: PathBuf,
    #[schema(value_type = String)]
    pub intrinsics_file: PathBuf,
    /// 内参文件无法解析时为空
    #[schema(value_type = Object, nullable)]
    pub intrinsics: Option<CameraIntrinsics>,
}

impl FrameResponse {
    pub fn new(
        index: usize,
        total_frames: usize,
        triplet: FrameTriplet,
        intrinsics: Option<CameraIntrinsics>,
    ) -> Self {
        Self {
            index,
            total_frames,
            timestamp: triplet.timestamp.to_string(),
            rgb: triplet.rgb,
            depth: triplet.depth,
            intrinsics_file: triplet.intrinsics,
            intrinsics,
        }
    }
}
