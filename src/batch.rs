use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use indicatif::{ParallelProgressIterator, ProgressBar};
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::dataset::{DataRoot, HighresIndex, SceneId};
use crate::scene::{Modality, ReconcileOptions, ReconcileReport, Reconciler};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub reconcile: ReconcileOptions,
    /// 只保留提供高分辨率深度的场景，其余已下载的场景会被整体删除
    pub require_highres: bool,
    /// 并行处理的场景数
    pub jobs: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SceneOutcome {
    Reconciled { report: ReconcileReport },
    Skipped { reason: String },
    /// 整个场景目录被删除；`dry_run` 时只是计划删除
    Removed { reason: String, dry_run: bool },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneResult {
    pub scene: SceneId,
    #[serde(flatten)]
    pub outcome: SceneOutcome,
}

/// 批量处理的汇总，由每个场景的结果依次折叠得到
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    /// 删除（或计划删除）的整个场景
    pub removed: Vec<SceneId>,
    pub failed: Vec<SceneId>,
    pub no_matches: Vec<SceneId>,
    pub matched: usize,
    pub kept: usize,
    pub orphan_removed: usize,
    pub subsample_removed: usize,
    pub failed_deletions: usize,
    pub elapsed_ms: u64,
}

impl BatchSummary {
    pub fn add(&mut self, result: &SceneResult) {
        self.total += 1;
        match &result.outcome {
            SceneOutcome::Reconciled { report } => {
                self.succeeded += 1;
                self.matched += report.matched_count;
                self.kept += report.kept_count;
                self.orphan_removed += report.orphan_removed();
                self.subsample_removed += report.subsample_removed();
                self.failed_deletions += report.failed.len();
                if report.has_no_matches() {
                    self.no_matches.push(result.scene.clone());
                }
            }
            SceneOutcome::Skipped { .. } => self.skipped += 1,
            SceneOutcome::Removed { .. } => self.removed.push(result.scene.clone()),
            SceneOutcome::Failed { .. } => self.failed.push(result.scene.clone()),
        }
    }
}

/// 批量对账驱动
///
/// 场景之间没有共享的可变状态，可以放心地并行处理；每个场景返回自己的结果，
/// 最后再汇总为 [`BatchSummary`]。
pub struct BatchDriver<'a> {
    pub root: &'a DataRoot,
    pub reconciler: &'a Reconciler,
    pub highres: HighresIndex,
    pub options: BatchOptions,
}

impl BatchDriver<'_> {
    pub fn run(
        &self,
        scenes: &[SceneId],
        pb: &ProgressBar,
    ) -> Result<(Vec<SceneResult>, BatchSummary)> {
        let start = Instant::now();
        pb.set_length(scenes.len() as u64);

        let pool =
            rayon::ThreadPoolBuilder::new().num_threads(self.options.jobs.max(1)).build()?;
        let results: Vec<SceneResult> = pool.install(|| {
            scenes
                .par_iter()
                .progress_with(pb.clone())
                .map(|id| {
                    let outcome = self.process(id);
                    match &outcome {
                        SceneOutcome::Failed { error } => {
                            pb.println(format!("[ERR] {id}: {error}"))
                        }
                        SceneOutcome::Skipped { reason } => {
                            pb.set_message(format!("跳过 {id}: {reason}"))
                        }
                        SceneOutcome::Removed { reason, .. } => {
                            pb.println(format!("[DEL] {id}: {reason}"))
                        }
                        SceneOutcome::Reconciled { report } => pb.set_message(format!(
                            "{id}: 保留 {}/{}",
                            report.kept_count, report.matched_count
                        )),
                    }
                    SceneResult { scene: id.clone(), outcome }
                })
                .collect()
        });

        let mut summary = results.iter().fold(BatchSummary::default(), |mut summary, result| {
            summary.add(result);
            summary
        });
        summary.elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            "处理完成: 成功 {}，跳过 {}，删除 {}，失败 {}",
            summary.succeeded,
            summary.skipped,
            summary.removed.len(),
            summary.failed.len()
        );
        Ok((results, summary))
    }

    fn process(&self, id: &SceneId) -> SceneOutcome {
        let opts = &self.options.reconcile;
        let dir = self.root.scene_dir(id);

        if self.options.require_highres {
            if !self.highres.has_highres(&id.video_id) {
                if dir.is_dir() {
                    return self.remove_scene(id, &dir, "元数据中没有高分辨率深度");
                }
                return SceneOutcome::Skipped { reason: "没有高分辨率深度".into() };
            }
            let depth = self.reconciler.layout.modality_dir(&dir, Modality::Depth);
            if dir.is_dir() && !depth.is_dir() {
                return self.remove_scene(id, &dir, "缺少高分辨率深度目录");
            }
        }

        if !dir.is_dir() {
            return SceneOutcome::Failed { error: format!("场景目录不存在: {}", dir.display()) };
        }

        // 需要清理额外目录时不能跳过
        if !opts.force && !opts.prune {
            match self.reconciler.verify(&dir) {
                Ok((true, info))
                    if opts.stride == 1
                        || info.density.is_subsampled(opts.stride, opts.capture_fps) =>
                {
                    return SceneOutcome::Skipped { reason: "场景已完成".into() };
                }
                Ok(_) => {}
                Err(e) => warn!("{id}: 校验失败: {e}"),
            }
        }

        match self.reconciler.reconcile(&dir, opts) {
            Ok(report) => {
                crate::metrics::observe_report(&report);
                SceneOutcome::Reconciled { report }
            }
            Err(e) => SceneOutcome::Failed { error: e.to_string() },
        }
    }

    fn remove_scene(&self, id: &SceneId, dir: &Path, reason: &str) -> SceneOutcome {
        if self.options.reconcile.dry_run {
            info!("[DRY] 将删除场景 {id}: {reason}");
            return SceneOutcome::Removed { reason: reason.into(), dry_run: true };
        }
        match fs::remove_dir_all(dir) {
            Ok(()) => {
                info!("已删除场景 {id}: {reason}");
                SceneOutcome::Removed { reason: reason.into(), dry_run: false }
            }
            Err(e) => SceneOutcome::Failed { error: format!("删除 {} 失败: {e}", dir.display()) },
        }
    }
}
