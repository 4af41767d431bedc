use std::path::PathBuf;
use std::sync::Arc;

use log::warn;

use super::error::{AppError, Result};
use super::types::*;
use crate::dataset::{DataRoot, SceneId, Split};
use crate::intrinsics::CameraIntrinsics;
use crate::scene::Reconciler;

/// 应用状态
pub struct ViewerState {
    pub root: DataRoot,
    /// 只用于读取匹配结果，浏览器不会修改任何文件
    pub reconciler: Reconciler,
}

impl ViewerState {
    pub fn new(root: DataRoot, reconciler: Reconciler) -> Arc<Self> {
        Arc::new(Self { root, reconciler })
    }

    pub fn scenes(&self) -> Result<ScenesResponse> {
        let video_ids = |split| -> Result<Vec<String>> {
            Ok(self.root.discover(split)?.into_iter().map(|s| s.video_id).collect())
        };
        Ok(ScenesResponse {
            training: video_ids(Split::Training)?,
            validation: video_ids(Split::Validation)?,
        })
    }

    pub fn scene_dir(&self, id: &SceneId) -> Result<PathBuf> {
        let dir = self.root.scene_dir(id);
        if id.video_id.contains(['/', '\\']) || id.video_id.starts_with('.') || !dir.is_dir() {
            return Err(AppError::NotFound(format!("scene {id}")));
        }
        Ok(dir)
    }

    pub fn scene(&self, id: &SceneId) -> Result<SceneResponse> {
        let dir = self.scene_dir(id)?;
        let (valid, info) = self.reconciler.verify(&dir)?;
        Ok(SceneResponse {
            split: id.split.to_string(),
            video_id: id.video_id.clone(),
            valid,
            total_frames: info.matched_count,
            info,
        })
    }

    pub fn frame(&self, id: &SceneId, index: usize) -> Result<FrameResponse> {
        let dir = self.scene_dir(id)?;
        let mut triplets = self.reconciler.matched_triplets(&dir)?;
        let total = triplets.len();
        if index >= total {
            return Err(AppError::NotFound(format!("frame {index} of {id}")));
        }
        let triplet = triplets.swap_remove(index);
        let intrinsics = match CameraIntrinsics::load(&triplet.intrinsics) {
            Ok(k) => Some(k),
            Err(e) => {
                warn!("读取内参 {} 失败: {}", triplet.intrinsics.display(), e);
                None
            }
        };
        Ok(FrameResponse::new(index, total, triplet, intrinsics))
    }
}
