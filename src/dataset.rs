use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::ValueEnum;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::WalkDir;

use crate::scene::SceneLayout;

pub type Result<T> = std::result::Result<T, DatasetError>;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("读取 CSV 失败: {0}")]
    Csv(#[from] csv::Error),

    #[error("遍历目录失败: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("未知的数据集划分: {0}")]
    UnknownSplit(String),
}

/// 数据集划分
#[derive(
    ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Split {
    #[value(name = "Training")]
    Training,
    #[value(name = "Validation")]
    Validation,
}

impl Split {
    pub const ALL: [Split; 2] = [Split::Training, Split::Validation];

    pub fn as_str(self) -> &'static str {
        match self {
            Split::Training => "Training",
            Split::Validation => "Validation",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Training" => Ok(Split::Training),
            "Validation" => Ok(Split::Validation),
            _ => Err(DatasetError::UnknownSplit(s.to_owned())),
        }
    }
}

/// 场景标识：(划分, 视频 ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SceneId {
    pub split: Split,
    pub video_id: String,
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.split, self.video_id)
    }
}

/// 下载目录，场景位于 `<root>/raw/<split>/<video_id>`
#[derive(Debug, Clone)]
pub struct DataRoot {
    path: PathBuf,
}

impl DataRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn raw(&self) -> PathBuf {
        self.path.join("raw")
    }

    pub fn split_dir(&self, split: Split) -> PathBuf {
        self.raw().join(split.as_str())
    }

    pub fn scene_dir(&self, id: &SceneId) -> PathBuf {
        self.split_dir(id.split).join(&id.video_id)
    }

    /// 返回场景元数据文件的路径
    pub fn metadata_csv(&self) -> PathBuf {
        self.raw().join("metadata.csv")
    }

    /// 列出某个划分下所有已下载的场景，按视频 ID 排序
    ///
    /// 场景目录名必须是纯数字。
    pub fn discover(&self, split: Split) -> Result<Vec<SceneId>> {
        let dir = self.split_dir(split);
        if !dir.is_dir() {
            debug!("划分目录不存在: {}", dir.display());
            return Ok(vec![]);
        }
        let mut scenes = vec![];
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
                scenes.push(SceneId { split, video_id: name.into_owned() });
            }
        }
        scenes.sort_by(|a, b| natural_cmp(&a.video_id, &b.video_id));
        Ok(scenes)
    }

    pub fn discover_all(&self, split: Option<Split>) -> Result<Vec<SceneId>> {
        let splits = match split {
            Some(s) => vec![s],
            None => Split::ALL.to_vec(),
        };
        let mut scenes = vec![];
        for split in splits {
            scenes.extend(self.discover(split)?);
        }
        Ok(scenes)
    }
}

fn natural_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[derive(Debug, Deserialize)]
struct SceneRow {
    video_id: String,
    fold: String,
}

/// 从场景列表 CSV（包含 `video_id` 与 `fold` 列）读取场景
pub fn load_scene_list(path: &Path, split: Option<Split>) -> Result<Vec<SceneId>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut scenes = vec![];
    for row in reader.deserialize() {
        let row: SceneRow = row?;
        let Ok(row_split) = row.fold.parse::<Split>() else {
            warn!("跳过未知划分 {} 的场景 {}", row.fold, row.video_id);
            continue;
        };
        if split.is_none_or(|s| s == row_split) {
            scenes.push(SceneId { split: row_split, video_id: row.video_id });
        }
    }
    Ok(scenes)
}

#[derive(Debug, Deserialize)]
struct MetadataRow {
    video_id: String,
    is_in_upsampling: String,
}

/// 记录哪些场景提供高分辨率深度
#[derive(Debug, Clone, Default)]
pub struct HighresIndex {
    entries: Option<HashMap<String, bool>>,
}

impl HighresIndex {
    /// 元数据文件不存在时，所有场景都视为可用
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("元数据文件不存在: {}", path.display());
            return Ok(Self { entries: None });
        }
        let mut reader = csv::Reader::from_path(path)?;
        let mut entries = HashMap::new();
        for row in reader.deserialize() {
            let row: MetadataRow = row?;
            entries.insert(row.video_id, row.is_in_upsampling.eq_ignore_ascii_case("true"));
        }
        Ok(Self { entries: Some(entries) })
    }

    pub fn has_highres(&self, video_id: &str) -> bool {
        match &self.entries {
            None => true,
            Some(entries) => entries.get(video_id).copied().unwrap_or(false),
        }
    }
}

/// 给定路径可能是单个场景，也可能是包含多个场景的目录
pub fn expand_scene_paths(path: &Path, layout: &SceneLayout) -> Result<Vec<PathBuf>> {
    if layout.looks_like_scene(path) {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut scenes = vec![];
    for entry in WalkDir::new(path).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_dir() && layout.looks_like_scene(entry.path()) {
            scenes.push(entry.into_path());
        }
    }
    Ok(scenes)
}

/// 按起始位置与数量截取场景
pub fn select_range<T>(items: Vec<T>, start: usize, count: Option<usize>) -> Vec<T> {
    let iter = items.into_iter().skip(start);
    match count {
        Some(n) => iter.take(n).collect(),
        None => iter.collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_discover() {
        let dir = TempDir::new().unwrap();
        let root = DataRoot::new(dir.path());
        for id in ["47333462", "100", "abc", "9"] {
            fs::create_dir_all(root.split_dir(Split::Training).join(id)).unwrap();
        }
        let scenes = root.discover(Split::Training).unwrap();
        let ids: Vec<_> = scenes.iter().map(|s| s.video_id.as_str()).collect();
        assert_eq!(ids, vec!["9", "100", "47333462"]);
        assert!(root.discover(Split::Validation).unwrap().is_empty());
    }

    #[test]
    fn test_load_scene_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scenes.csv");
        fs::write(&path, "video_id,fold\n1,Training\n2,Validation\n3,Test\n").unwrap();
        assert_eq!(load_scene_list(&path, None).unwrap().len(), 2);
        let scenes = load_scene_list(&path, Some(Split::Validation)).unwrap();
        assert_eq!(scenes, vec![SceneId { split: Split::Validation, video_id: "2".into() }]);
    }

    #[test]
    fn test_highres_index() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metadata.csv");
        assert!(HighresIndex::load(&path).unwrap().has_highres("1"));

        let csv = "video_id,sky_direction,is_in_upsampling\n1,Up,True\n2,Up,False\n";
        fs::write(&path, csv).unwrap();
        let index = HighresIndex::load(&path).unwrap();
        assert!(index.has_highres("1"));
        assert!(!index.has_highres("2"));
        assert!(!index.has_highres("3"));
    }

    #[test]
    fn test_select_range() {
        let v: Vec<u32> = (0..10).collect();
        assert_eq!(select_range(v.clone(), 8, None), vec![8, 9]);
        assert_eq!(select_range(v, 2, Some(3)), vec![2, 3, 4]);
    }
}
