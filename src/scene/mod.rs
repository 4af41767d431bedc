//! 场景对账：跨模态匹配、孤立文件清理与等间隔采样

mod density;
mod error;
mod layout;
mod matcher;
mod reconcile;
mod scan;
mod subsample;
mod timestamp;
mod verify;

pub use density::Density;
pub use error::{Result, SceneError};
pub use layout::{ModalityDir, ModalityMap, SceneLayout};
pub use matcher::{MatchResult, MatchedFrame, OrphanMap, match_timestamps};
pub use reconcile::*;
pub use scan::{FileRecord, MalformedFile, ModalityScan, SceneScan, scan_modality, scan_scene};
pub use subsample::{SubsampleResult, subsample};
pub use timestamp::{Modality, Timestamp, extract, secs_to_ticks, ticks_to_secs};
pub use verify::{FrameTriplet, SceneInfo};
