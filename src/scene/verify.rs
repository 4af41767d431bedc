use std::path::{Path, PathBuf};

use serde::Serialize;

use super::density::Density;
use super::error::Result;
use super::layout::ModalityMap;
use super::reconcile::Reconciler;
use super::timestamp::{Modality, Timestamp};

/// 场景完整性信息
#[derive(Debug, Clone, Serialize)]
pub struct SceneInfo {
    pub file_counts: ModalityMap<usize>,
    pub matched_count: usize,
    pub orphan_counts: ModalityMap<usize>,
    pub duplicate_count: usize,
    pub malformed_count: usize,
    pub missing_dirs: Vec<Modality>,
    pub density: Density,
    /// 所有未完全匹配的时间戳，升序
    pub unmatched_timestamps: Vec<Timestamp>,
}

impl SceneInfo {
    pub fn orphan_total(&self) -> usize {
        self.orphan_counts.iter().map(|(_, c)| *c).sum()
    }

    /// 三个目录都存在但没有任何文件
    pub fn is_empty(&self) -> bool {
        self.missing_dirs.is_empty() && self.file_counts.iter().all(|(_, c)| *c == 0)
    }
}

/// 一组匹配的文件，供浏览器等只读消费者使用
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameTriplet {
    pub timestamp: Timestamp,
    pub rgb: PathBuf,
    pub depth: PathBuf,
    pub intrinsics: PathBuf,
}

impl Reconciler {
    /// 只读校验场景的三个模态是否一一对应
    ///
    /// 缺少模态目录的场景无效；三个目录都存在但为空的场景视为有效。
    pub fn verify(&self, scene: &Path) -> Result<(bool, SceneInfo)> {
        let (scan, matched) = self.scan(scene)?;

        let mut unmatched: Vec<Timestamp> =
            matched.orphans.iter().flat_map(|(_, set)| set.iter().cloned()).collect();
        unmatched.sort();
        unmatched.dedup();

        let info = SceneInfo {
            file_counts: scan.modalities.map(|_, s| s.file_count()),
            matched_count: matched.matched.len(),
            orphan_counts: matched.orphans.map(|_, set| set.len()),
            duplicate_count: scan.duplicate_count(),
            malformed_count: scan.malformed_count(),
            missing_dirs: scan.missing_modalities(),
            density: Density::measure(&matched.matched),
            unmatched_timestamps: unmatched,
        };

        let is_valid = info.missing_dirs.is_empty()
            && info.orphan_total() == 0
            && info.file_counts.iter().all(|(_, c)| *c == info.matched_count);
        Ok((is_valid, info))
    }

    /// 按时间戳升序返回所有匹配的文件三元组
    pub fn matched_triplets(&self, scene: &Path) -> Result<Vec<FrameTriplet>> {
        let (scan, matched) = self.scan(scene)?;
        let triplets = matched
            .matched
            .into_iter()
            .map(|frame| {
                let path =
                    |m: Modality| scan.modalities[m].records[&frame.timestamps[m]].path.clone();
                FrameTriplet {
                    rgb: path(Modality::Rgb),
                    depth: path(Modality::Depth),
                    intrinsics: path(Modality::Intrinsics),
                    timestamp: frame.key,
                }
            })
            .collect();
        Ok(triplets)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::scene::layout::SceneLayout;

    fn make_scene(rgb: &[&str], depth: &[&str], intrinsics: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        let layout = SceneLayout::highres();
        let modalities =
            [(Modality::Rgb, rgb), (Modality::Depth, depth), (Modality::Intrinsics, intrinsics)];
        for (modality, names) in modalities {
            let sub = layout.modality_dir(dir.path(), modality);
            fs::create_dir_all(&sub).unwrap();
            for t in names {
                fs::write(sub.join(format!("7_{t}.{}", layout.extension(modality))), b"").unwrap();
            }
        }
        dir
    }

    #[test]
    fn test_verify_valid() {
        let dir = make_scene(&["1", "2"], &["1", "2"], &["1", "2"]);
        let (valid, info) = Reconciler::default().verify(dir.path()).unwrap();
        assert!(valid);
        assert_eq!(info.matched_count, 2);
        assert!(info.unmatched_timestamps.is_empty());
    }

    #[test]
    fn test_verify_reports_orphans() {
        let dir = make_scene(&["1", "2", "3"], &["1", "2"], &["2", "4"]);
        let (valid, info) = Reconciler::default().verify(dir.path()).unwrap();
        assert!(!valid);
        assert_eq!(info.matched_count, 1);
        assert_eq!(info.orphan_counts, ModalityMap { rgb: 2, depth: 1, intrinsics: 1 });
        let unmatched: Vec<String> =
            info.unmatched_timestamps.iter().map(|t| t.to_string()).collect();
        assert_eq!(unmatched, vec!["1", "3", "4"]);
    }

    #[test]
    fn test_verify_empty_scene_is_valid() {
        let dir = make_scene(&[], &[], &[]);
        let (valid, info) = Reconciler::default().verify(dir.path()).unwrap();
        assert!(valid);
        assert!(info.is_empty());
    }

    #[test]
    fn test_verify_missing_dir_is_invalid() {
        let dir = make_scene(&["1"], &["1"], &["1"]);
        fs::remove_dir_all(dir.path().join("ultrawide_intrinsics")).unwrap();
        let (valid, info) = Reconciler::default().verify(dir.path()).unwrap();
        assert!(!valid);
        assert_eq!(info.missing_dirs, vec![Modality::Intrinsics]);
    }

    #[test]
    fn test_verify_duplicate_is_invalid() {
        let dir = make_scene(&["1"], &["1", "1.0"], &["1"]);
        let (valid, info) = Reconciler::default().verify(dir.path()).unwrap();
        assert!(!valid);
        assert_eq!(info.duplicate_count, 1);
    }

    #[test]
    fn test_matched_triplets_sorted() {
        let dir = make_scene(&["10", "9", "11"], &["9", "10", "11"], &["11", "10", "9"]);
        let triplets = Reconciler::default().matched_triplets(dir.path()).unwrap();
        let times: Vec<String> = triplets.iter().map(|t| t.timestamp.to_string()).collect();
        assert_eq!(times, vec!["9", "10", "11"]);
        assert_eq!(triplets[0].rgb, dir.path().join("ultrawide/7_9.png"));
        assert_eq!(triplets[0].intrinsics, dir.path().join("ultrawide_intrinsics/7_9.pincam"));
    }
}
