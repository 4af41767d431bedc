use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info, warn};
use serde::Serialize;
use walkdir::WalkDir;

use super::density::Density;
use super::error::{Result, SceneError};
use super::layout::{ModalityMap, SceneLayout};
use super::matcher::{MatchResult, match_timestamps};
use super::scan::{SceneScan, scan_scene};
use super::subsample::subsample;
use super::timestamp::{Modality, Timestamp};

/// 匹配参数，对账与校验共用
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MatchConfig {
    /// 时间戳容差，单位 tick
    pub epsilon: u64,
    /// 文件名无法解析时直接报错，而不是按孤立文件删除
    pub strict: bool,
}

/// 单次对账的参数
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOptions {
    pub stride: usize,
    /// 除三个模态目录外需要保留的资源目录
    pub assets: Vec<String>,
    /// 删除既不是模态目录也不是 `assets` 的子目录
    pub prune: bool,
    pub dry_run: bool,
    /// 忽略密度检测，总是对当前匹配集合重新采样
    pub force: bool,
    /// 标称采集帧率，用于判断场景是否已采样
    pub capture_fps: f64,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            stride: 1,
            assets: vec![],
            prune: false,
            dry_run: true,
            force: false,
            capture_fps: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// 时间戳不是在所有模态中都存在
    Orphan,
    /// 同一模态中时间戳重复
    Duplicate,
    /// 文件名无法解析
    Malformed,
    /// 匹配但未被采样保留
    Subsampled,
}

impl RemovalReason {
    pub fn is_orphan_class(self) -> bool {
        !matches!(self, RemovalReason::Subsampled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Removal {
    pub modality: Modality,
    pub path: PathBuf,
    pub reason: RemovalReason,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedRemoval {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconcileWarning {
    /// 三个模态没有任何公共时间戳
    NoMatches,
    MissingModalityDirectory { modality: Modality, path: PathBuf },
    MalformedFilename { path: PathBuf, reason: String },
    /// 匹配帧比 `capture_fps` 下的 `stride` 倍采样还稀疏，密度检测不可信
    UnexpectedDensity { median_gap_secs: f64, capture_fps: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsampleStatus {
    /// 采样间隔为 1
    NotRequested,
    Applied,
    /// 密度表明场景已按该间隔采样过
    AlreadySubsampled,
    /// 时间戳不是数值，无法判断密度，需要 `force`
    DensityUnknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub scene: PathBuf,
    pub dry_run: bool,
    pub stride: usize,
    /// 每个模态目录中参与扫描的文件数
    pub file_counts: ModalityMap<usize>,
    pub matched_count: usize,
    pub kept_count: usize,
    pub subsample: SubsampleStatus,
    pub density: Density,
    /// dry run 时为计划删除的文件，否则为实际删除成功的文件
    pub removals: Vec<Removal>,
    pub failed: Vec<FailedRemoval>,
    /// 既不是模态目录也不在 `assets` 中的子目录
    pub extra_dirs: Vec<PathBuf>,
    pub pruned: bool,
    pub warnings: Vec<ReconcileWarning>,
    pub elapsed_ms: u64,
}

impl ReconcileReport {
    pub fn orphan_removed(&self) -> usize {
        self.removals.iter().filter(|r| r.reason.is_orphan_class()).count()
    }

    pub fn subsample_removed(&self) -> usize {
        self.removals.iter().filter(|r| r.reason == RemovalReason::Subsampled).count()
    }

    pub fn removed_count(&self) -> usize {
        self.removals.len()
    }

    pub fn has_no_matches(&self) -> bool {
        self.warnings.contains(&ReconcileWarning::NoMatches)
    }
}

/// 对账器：扫描 -> 匹配 -> 采样 -> 删除
///
/// 不保存任何元数据，结果只取决于当前目录内容，因此可以安全地重复执行。
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    pub layout: SceneLayout,
    pub matching: MatchConfig,
}

impl Reconciler {
    pub fn new(layout: SceneLayout, matching: MatchConfig) -> Self {
        Self { layout, matching }
    }

    pub fn scan(&self, scene: &Path) -> Result<(SceneScan, MatchResult)> {
        let scan = scan_scene(scene, &self.layout, self.matching.strict)?;
        let keys: ModalityMap<BTreeSet<Timestamp>> =
            scan.modalities.map(|_, s| s.records.keys().cloned().collect());
        let result =
            match_timestamps(&keys.rgb, &keys.depth, &keys.intrinsics, self.matching.epsilon);
        Ok((scan, result))
    }

    pub fn reconcile(&self, scene: &Path, opts: &ReconcileOptions) -> Result<ReconcileReport> {
        // 在访问文件系统之前校验参数
        if opts.stride < 1 {
            return Err(SceneError::InvalidStride(opts.stride));
        }
        let start = Instant::now();

        let (scan, matched) = self.scan(scene)?;
        let mut warnings = vec![];
        for modality in scan.missing_modalities() {
            warnings.push(ReconcileWarning::MissingModalityDirectory {
                modality,
                path: self.layout.modality_dir(scene, modality),
            });
        }

        let mut plan = vec![];
        for (modality, s) in scan.modalities.iter() {
            let removal = |path: &Path, reason| Removal { modality, path: path.to_owned(), reason };
            for ts in &matched.orphans[modality] {
                plan.push(removal(&s.records[ts].path, RemovalReason::Orphan));
            }
            for dup in &s.duplicates {
                plan.push(removal(&dup.path, RemovalReason::Duplicate));
            }
            for bad in &s.malformed {
                warnings.push(ReconcileWarning::MalformedFilename {
                    path: bad.path.clone(),
                    reason: bad.reason.clone(),
                });
                plan.push(removal(&bad.path, RemovalReason::Malformed));
            }
        }

        let density = Density::measure(&matched.matched);
        let status = if opts.stride == 1 {
            SubsampleStatus::NotRequested
        } else if opts.force {
            SubsampleStatus::Applied
        } else {
            match density {
                Density::Unknown => SubsampleStatus::DensityUnknown,
                d if d.is_subsampled(opts.stride, opts.capture_fps) => {
                    SubsampleStatus::AlreadySubsampled
                }
                d => {
                    if let Some(secs) = d.median_gap_secs()
                        && d.is_sparser_than(opts.stride, opts.capture_fps)
                    {
                        warn!(
                            "{} 的中位帧间隔 {:.3}s 与 {} fps 不符，无法判断是否已采样，按当前匹配集合采样",
                            scene.display(),
                            secs,
                            opts.capture_fps
                        );
                        warnings.push(ReconcileWarning::UnexpectedDensity {
                            median_gap_secs: secs,
                            capture_fps: opts.capture_fps,
                        });
                    }
                    SubsampleStatus::Applied
                }
            }
        };

        let kept = if status == SubsampleStatus::Applied {
            let result = subsample(&matched.matched, opts.stride)?;
            for frame in &result.dropped {
                for (modality, s) in scan.modalities.iter() {
                    let record = &s.records[&frame.timestamps[modality]];
                    plan.push(Removal {
                        modality,
                        path: record.path.clone(),
                        reason: RemovalReason::Subsampled,
                    });
                }
            }
            result.kept
        } else {
            if status == SubsampleStatus::AlreadySubsampled {
                info!("{} 已按 1/{} 采样，跳过采样", scene.display(), opts.stride);
            } else if status == SubsampleStatus::DensityUnknown {
                warn!("{} 的时间戳无法判断采样密度，使用 --force 强制采样", scene.display());
            }
            matched.matched.clone()
        };

        if matched.matched.is_empty() {
            warn!("{} 没有跨模态匹配的文件", scene.display());
            warnings.push(ReconcileWarning::NoMatches);
        }

        let kept_paths: HashSet<&Path> = kept
            .iter()
            .flat_map(|frame| {
                scan.modalities
                    .iter()
                    .map(move |(m, s)| s.records[&frame.timestamps[m]].path.as_path())
            })
            .collect();
        debug_assert!(plan.iter().all(|r| !kept_paths.contains(r.path.as_path())));

        let extra_dirs = self.extra_dirs(scene, &opts.assets)?;

        let mut report = ReconcileReport {
            scene: scene.to_path_buf(),
            dry_run: opts.dry_run,
            stride: opts.stride,
            file_counts: scan.modalities.map(|_, s| s.file_count()),
            matched_count: matched.matched.len(),
            kept_count: kept.len(),
            subsample: status,
            density,
            removals: vec![],
            failed: vec![],
            extra_dirs,
            pruned: false,
            warnings,
            elapsed_ms: 0,
        };

        if opts.dry_run {
            for removal in &plan {
                info!(
                    "[DRY] 将删除 {} ({:?}): {}",
                    removal.modality,
                    removal.reason,
                    removal.path.display()
                );
            }
            report.removals = plan;
        } else {
            for removal in plan {
                match fs::remove_file(&removal.path) {
                    Ok(()) => {
                        debug!("已删除 {}: {}", removal.modality, removal.path.display());
                        report.removals.push(removal);
                    }
                    Err(e) => {
                        warn!("删除 {} 失败: {}", removal.path.display(), e);
                        report
                            .failed
                            .push(FailedRemoval { path: removal.path, error: e.to_string() });
                    }
                }
            }
            if opts.prune {
                for dir in &report.extra_dirs {
                    if let Err(e) = fs::remove_dir_all(dir) {
                        warn!("删除目录 {} 失败: {}", dir.display(), e);
                        report
                            .failed
                            .push(FailedRemoval { path: dir.clone(), error: e.to_string() });
                    }
                }
                report.pruned = true;
            }
        }

        report.elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            "{}: 匹配 {} 组，保留 {} 组，{}删除 {} 个孤立文件、{} 个采样文件",
            scene.display(),
            report.matched_count,
            report.kept_count,
            if opts.dry_run { "将" } else { "已" },
            report.orphan_removed(),
            report.subsample_removed(),
        );
        Ok(report)
    }

    fn extra_dirs(&self, scene: &Path, assets: &[String]) -> Result<Vec<PathBuf>> {
        let mut dirs = vec![];
        for entry in WalkDir::new(scene).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| SceneError::io(scene, e.into()))?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if self.layout.is_modality_dir(&name) || assets.iter().any(|a| *a == name) {
                continue;
            }
            dirs.push(entry.path().to_path_buf());
        }
        Ok(dirs)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn touch(scene: &Path, dir: &str, name: &str) {
        fs::create_dir_all(scene.join(dir)).unwrap();
        fs::write(scene.join(dir).join(name), b"").unwrap();
    }

    fn populate(scene: &Path, times: impl IntoIterator<Item = String>) {
        for t in times {
            touch(scene, "ultrawide", &format!("42_{t}.png"));
            touch(scene, "highres_depth", &format!("42_{t}.png"));
            touch(scene, "ultrawide_intrinsics", &format!("42_{t}.pincam"));
        }
    }

    #[test]
    fn test_invalid_stride_touches_nothing() {
        let reconciler = Reconciler::default();
        let opts = ReconcileOptions { stride: 0, ..Default::default() };
        // 场景目录不存在，但参数错误应当先被发现
        let err = reconciler.reconcile(Path::new("/nonexistent/scene"), &opts).unwrap_err();
        assert!(matches!(err, SceneError::InvalidStride(0)));
    }

    #[test]
    fn test_dry_run_keeps_files() {
        let dir = TempDir::new().unwrap();
        populate(dir.path(), (1..=5).map(|i| i.to_string()));
        touch(dir.path(), "ultrawide", "42_6.png");

        let report =
            Reconciler::default().reconcile(dir.path(), &ReconcileOptions::default()).unwrap();
        assert_eq!(report.removals.len(), 1);
        assert_eq!(report.orphan_removed(), 1);
        assert!(dir.path().join("ultrawide/42_6.png").exists());
    }

    #[test]
    fn test_duplicates_and_malformed_are_orphans() {
        let dir = TempDir::new().unwrap();
        populate(dir.path(), ["1.0".to_string()]);
        touch(dir.path(), "highres_depth", "42_1.00.png");
        touch(dir.path(), "ultrawide_intrinsics", "garbage.pincam");

        let opts = ReconcileOptions { dry_run: false, ..Default::default() };
        let report = Reconciler::default().reconcile(dir.path(), &opts).unwrap();
        let reasons: Vec<_> = report.removals.iter().map(|r| r.reason).collect();
        assert_eq!(reasons, vec![RemovalReason::Duplicate, RemovalReason::Malformed]);
        assert!(dir.path().join("highres_depth/42_1.0.png").exists());
        assert!(!dir.path().join("highres_depth/42_1.00.png").exists());
        assert_eq!(report.kept_count, 1);
    }

    #[test]
    fn test_extra_dirs_pruned_only_when_asked() {
        let dir = TempDir::new().unwrap();
        populate(dir.path(), ["1".to_string()]);
        fs::create_dir(dir.path().join("confidence")).unwrap();
        fs::create_dir(dir.path().join("mesh")).unwrap();

        let reconciler = Reconciler::default();
        let opts = ReconcileOptions {
            dry_run: false,
            assets: vec!["confidence".into()],
            ..Default::default()
        };
        let report = reconciler.reconcile(dir.path(), &opts).unwrap();
        assert_eq!(report.extra_dirs, vec![dir.path().join("mesh")]);
        assert!(dir.path().join("mesh").exists());

        let opts = ReconcileOptions { prune: true, ..opts };
        let report = reconciler.reconcile(dir.path(), &opts).unwrap();
        assert!(report.pruned);
        assert!(!dir.path().join("mesh").exists());
        assert!(dir.path().join("confidence").exists());
    }

    #[test]
    fn test_opaque_timestamps_need_force() {
        let dir = TempDir::new().unwrap();
        populate(dir.path(), ["a", "b", "c"].map(String::from));

        let reconciler = Reconciler::default();
        let opts = ReconcileOptions { stride: 2, dry_run: false, ..Default::default() };
        let report = reconciler.reconcile(dir.path(), &opts).unwrap();
        assert_eq!(report.subsample, SubsampleStatus::DensityUnknown);
        assert_eq!(report.removed_count(), 0);

        let forced = ReconcileOptions { force: true, ..opts };
        let report = reconciler.reconcile(dir.path(), &forced).unwrap();
        assert_eq!(report.subsample, SubsampleStatus::Applied);
        assert_eq!(report.kept_count, 2);
        assert_eq!(report.subsample_removed(), 3);
    }
}
