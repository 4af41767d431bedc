use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Serialize;
use walkdir::WalkDir;

use super::error::{Result, SceneError};
use super::layout::{ModalityMap, SceneLayout};
use super::timestamp::{Modality, Timestamp, extract};

/// 单个数据文件，每次扫描时重新构建，不做持久化
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub modality: Modality,
    pub timestamp: Timestamp,
    pub path: PathBuf,
    pub size: u64,
}

/// 文件名无法解析的文件
#[derive(Debug, Clone, Serialize)]
pub struct MalformedFile {
    pub modality: Modality,
    pub path: PathBuf,
    pub reason: String,
}

/// 单个模态目录的扫描结果
#[derive(Debug, Clone, Default)]
pub struct ModalityScan {
    /// 时间戳 -> 文件，每个时间戳只保留文件名排序最靠前的一个
    pub records: BTreeMap<Timestamp, FileRecord>,
    /// 与 `records` 中时间戳重复的其余文件
    pub duplicates: Vec<FileRecord>,
    pub malformed: Vec<MalformedFile>,
    /// 目录不存在
    pub missing: bool,
}

impl ModalityScan {
    pub fn file_count(&self) -> usize {
        self.records.len() + self.duplicates.len() + self.malformed.len()
    }
}

/// 扫描场景的三个模态目录
#[derive(Debug, Clone, Default)]
pub struct SceneScan {
    pub modalities: ModalityMap<ModalityScan>,
}

impl SceneScan {
    pub fn missing_modalities(&self) -> Vec<Modality> {
        self.modalities.iter().filter(|(_, s)| s.missing).map(|(m, _)| m).collect()
    }

    pub fn malformed_count(&self) -> usize {
        self.modalities.iter().map(|(_, s)| s.malformed.len()).sum()
    }

    pub fn duplicate_count(&self) -> usize {
        self.modalities.iter().map(|(_, s)| s.duplicates.len()).sum()
    }
}

pub fn scan_scene(scene: &Path, layout: &SceneLayout, strict: bool) -> Result<SceneScan> {
    if !scene.is_dir() {
        return Err(SceneError::NotADirectory(scene.to_path_buf()));
    }
    let mut scan = SceneScan::default();
    for modality in Modality::ALL {
        let dir = layout.modality_dir(scene, modality);
        scan.modalities[modality] =
            scan_modality(&dir, modality, layout.extension(modality), strict)?;
    }
    Ok(scan)
}

/// 扫描单个模态目录
///
/// 隐藏文件和子目录会被忽略。`strict` 为 true 时，无法解析的文件名直接报错，
/// 否则记录到 `malformed` 中，按孤立文件处理。
pub fn scan_modality(
    dir: &Path,
    modality: Modality,
    extension: &str,
    strict: bool,
) -> Result<ModalityScan> {
    let mut scan = ModalityScan::default();

    if !dir.exists() {
        warn!("{} 目录不存在: {}", modality, dir.display());
        scan.missing = true;
        return Ok(scan);
    }
    if !dir.is_dir() {
        return Err(SceneError::NotADirectory(dir.to_path_buf()));
    }

    // 按文件名排序，保证重复时间戳的取舍是确定的
    let walker = WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            SceneError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            continue;
        }

        let timestamp = match extract(&name, extension) {
            Ok(ts) => ts,
            Err(err) if strict => return Err(err),
            Err(err) => {
                warn!("{}", err);
                scan.malformed.push(MalformedFile {
                    modality,
                    path: entry.path().to_path_buf(),
                    reason: err.to_string(),
                });
                continue;
            }
        };

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        let record = FileRecord { modality, timestamp, path: entry.path().to_path_buf(), size };
        if scan.records.contains_key(&record.timestamp) {
            debug!("重复的时间戳 {}: {}", record.timestamp, record.path.display());
            scan.duplicates.push(record);
        } else {
            scan.records.insert(record.timestamp.clone(), record);
        }
    }

    Ok(scan)
}
