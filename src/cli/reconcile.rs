use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use indicatif::ProgressBar;
use log::{error, info};
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::{LayoutOptions, MatchOptions, Opts, OutputFormat, ReconcileArgs};
use crate::dataset::expand_scene_paths;
use crate::scene::{ReconcileReport, ReconcileWarning, Reconciler, SceneError};
use crate::utils::{abbreviate, pb_style};

#[derive(Parser, Debug, Clone)]
pub struct ReconcileCommand {
    #[command(flatten)]
    pub layout: LayoutOptions,
    #[command(flatten)]
    pub matching: MatchOptions,
    #[command(flatten)]
    pub reconcile: ReconcileArgs,
    /// 场景目录，或包含多个场景的目录
    pub path: PathBuf,
    /// 输出格式
    #[arg(long, value_enum, value_name = "FORMAT", default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for ReconcileCommand {
    async fn run(&self, _opts: &Opts) -> Result<()> {
        let layout = self.layout.scene_layout();
        let options = self.reconcile.reconcile_options();
        let reconciler = Reconciler::new(layout.clone(), self.matching.match_config());

        let scenes = if self.path.is_dir() {
            expand_scene_paths(&self.path, &layout)?
        } else {
            vec![self.path.clone()]
        };
        if scenes.is_empty() {
            bail!("{} 下没有找到场景", self.path.display());
        }
        if options.dry_run {
            info!("dry run 模式，不会删除任何文件，使用 --execute 执行删除");
        }

        let pb = match scenes.len() {
            1 => ProgressBar::hidden(),
            n => ProgressBar::new(n as u64).with_style(pb_style()),
        };

        let mut reports = vec![];
        let mut failed = vec![];
        for scene in &scenes {
            match block_in_place(|| reconciler.reconcile(scene, &options)) {
                Ok(report) => {
                    crate::metrics::observe_report(&report);
                    reports.push(report);
                }
                // 参数错误对所有场景都一样
                Err(e @ SceneError::InvalidStride(_)) => return Err(e.into()),
                Err(e) => {
                    pb.suspend(|| error!("[ERR] {}: {e}", scene.display()));
                    failed.push(scene.clone());
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        print_reports(&reports, self.output_format)?;

        if !failed.is_empty() {
            let names: Vec<_> = failed.iter().map(|p| p.display()).collect();
            bail!("{} 个场景处理失败: {}", failed.len(), abbreviate(&names));
        }
        Ok(())
    }
}

fn print_reports(reports: &[ReconcileReport], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(reports)?)
        }
        OutputFormat::Table => {
            for report in reports {
                print_report(report);
            }
        }
    }
    Ok(())
}

fn print_report(report: &ReconcileReport) {
    let mode = if report.dry_run { "[DRY] " } else { "" };
    println!("{mode}{}", report.scene.display());
    println!(
        "  文件数    rgb={} depth={} intrinsics={}",
        report.file_counts.rgb, report.file_counts.depth, report.file_counts.intrinsics
    );
    println!("  匹配      {}", report.matched_count);
    println!("  保留      {} (1/{}, {:?})", report.kept_count, report.stride, report.subsample);
    println!("  孤立删除  {}", report.orphan_removed());
    println!("  采样删除  {}", report.subsample_removed());
    if !report.failed.is_empty() {
        println!("  删除失败  {}", report.failed.len());
        for failed in &report.failed {
            println!("    {}: {}", failed.path.display(), failed.error);
        }
    }
    if !report.extra_dirs.is_empty() {
        let action = if report.pruned { "已删除" } else { "未处理" };
        println!("  额外目录  {} ({action})", report.extra_dirs.len());
        for dir in &report.extra_dirs {
            println!("    {}", dir.display());
        }
    }
    for warning in &report.warnings {
        match warning {
            ReconcileWarning::NoMatches => println!("  警告      没有跨模态匹配的文件"),
            ReconcileWarning::MissingModalityDirectory { modality, path } => {
                println!("  警告      缺少 {modality} 目录: {}", path.display())
            }
            ReconcileWarning::MalformedFilename { path, reason } => {
                println!("  警告      无法解析文件名 {}: {reason}", path.display())
            }
            ReconcileWarning::UnexpectedDensity { median_gap_secs, capture_fps } => println!(
                "  警告      中位帧间隔 {median_gap_secs:.3}s 与 {capture_fps} fps 不符，未能确认是否已采样"
            ),
        }
    }
}
