use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use indicatif::{ParallelProgressIterator, ProgressBar};
use log::{error, info, warn};
use prometheus::labels;
use rayon::prelude::*;
use tokio::task::{block_in_place, spawn_blocking};

use crate::batch::{BatchDriver, BatchOptions, BatchSummary, SceneOutcome, SceneResult};
use crate::cli::SubCommandExtend;
use crate::config::{LayoutOptions, MatchOptions, Opts, OutputFormat, ReconcileArgs};
use crate::dataset::{DataRoot, HighresIndex, SceneId, Split, load_scene_list, select_range};
use crate::scene::Reconciler;
use crate::utils::{abbreviate, pb_style};

#[derive(Parser, Debug, Clone)]
pub struct BatchCommand {
    #[command(flatten)]
    pub layout: LayoutOptions,
    #[command(flatten)]
    pub matching: MatchOptions,
    #[command(flatten)]
    pub reconcile: ReconcileArgs,
    /// 只处理指定划分，默认处理全部
    #[arg(long, value_enum)]
    pub split: Option<Split>,
    /// 从第几个场景开始处理
    #[arg(long, default_value_t = 0)]
    pub start: usize,
    /// 最多处理多少个场景
    #[arg(long)]
    pub count: Option<usize>,
    /// 场景列表 CSV（video_id,fold），不指定时扫描数据目录
    #[arg(long, value_name = "CSV")]
    pub scenes: Option<PathBuf>,
    /// 删除 metadata.csv 中没有高分辨率深度或缺少深度目录的已下载场景
    #[arg(long)]
    pub require_highres: bool,
    /// 只校验，不修改任何文件
    #[arg(long)]
    pub validate_only: bool,
    /// 并行处理的场景数
    #[arg(short, long, default_value_t = num_cpus::get())]
    pub jobs: usize,
    /// 处理结束后推送指标的 prometheus pushgateway 地址
    #[arg(long, value_name = "URL")]
    pub prometheus_push: Option<String>,
    /// 输出格式
    #[arg(long, value_enum, value_name = "FORMAT", default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for BatchCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let root = &opts.data_dir;
        let scenes = match &self.scenes {
            Some(csv) => load_scene_list(csv, self.split)?,
            None => root.discover_all(self.split)?,
        };
        let scenes = select_range(scenes, self.start, self.count);
        if scenes.is_empty() {
            bail!("{} 下没有找到场景", root.raw().display());
        }
        info!("共 {} 个场景", scenes.len());

        let reconciler = Reconciler::new(self.layout.scene_layout(), self.matching.match_config());
        let pb = ProgressBar::new(scenes.len() as u64).with_style(pb_style());

        if self.validate_only {
            return block_in_place(|| self.validate(root, &reconciler, &scenes, &pb));
        }

        let options = BatchOptions {
            reconcile: self.reconcile.reconcile_options(),
            require_highres: self.require_highres,
            jobs: self.jobs,
        };
        if options.reconcile.dry_run {
            info!("dry run 模式，不会删除任何文件，使用 --execute 执行删除");
        }
        let highres = if self.require_highres {
            HighresIndex::load(&root.metadata_csv())?
        } else {
            HighresIndex::default()
        };
        let driver = BatchDriver { root, reconciler: &reconciler, highres, options };

        let (results, summary) = block_in_place(|| driver.run(&scenes, &pb))?;
        pb.finish_and_clear();

        print_summary(&results, &summary, self.output_format)?;

        if let Some(url) = self.prometheus_push.clone() {
            push_metrics(url).await;
        }

        if !summary.failed.is_empty() {
            bail!("{} 个场景处理失败", summary.failed.len());
        }
        Ok(())
    }
}

impl BatchCommand {
    fn validate(
        &self,
        root: &DataRoot,
        reconciler: &Reconciler,
        scenes: &[SceneId],
        pb: &ProgressBar,
    ) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(self.jobs.max(1)).build()?;
        let invalid: Vec<SceneId> = pool.install(|| {
            scenes
                .par_iter()
                .progress_with(pb.clone())
                .filter(|id| match reconciler.verify(&root.scene_dir(id)) {
                    Ok((valid, _)) => !valid,
                    Err(e) => {
                        pb.println(format!("[ERR] {id}: {e}"));
                        true
                    }
                })
                .cloned()
                .collect()
        });
        pb.finish_and_clear();

        match self.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&invalid)?),
            OutputFormat::Table => {
                println!("有效场景  {}/{}", scenes.len() - invalid.len(), scenes.len());
                if !invalid.is_empty() {
                    println!("无效场景  {}", abbreviate(&invalid));
                }
            }
        }
        Ok(())
    }
}

fn print_summary(
    results: &[SceneResult],
    summary: &BatchSummary,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({ "scenes": results, "summary": summary });
            println!("{}", serde_json::to_string_pretty(&value)?)
        }
        OutputFormat::Table => {
            for result in results {
                if let SceneOutcome::Failed { error } = &result.outcome {
                    println!("[ERR] {}: {error}", result.scene);
                }
            }
            println!(
                "场景      {} (成功 {}，跳过 {}，删除 {}，失败 {})",
                summary.total,
                summary.succeeded,
                summary.skipped,
                summary.removed.len(),
                summary.failed.len()
            );
            println!("匹配      {}", summary.matched);
            println!("保留      {}", summary.kept);
            println!("孤立删除  {}", summary.orphan_removed);
            println!("采样删除  {}", summary.subsample_removed);
            println!("删除失败  {}", summary.failed_deletions);
            if !summary.no_matches.is_empty() {
                println!("无匹配    {}", abbreviate(&summary.no_matches));
            }
            println!("耗时      {:.1}s", summary.elapsed_ms as f64 / 1000.0);
        }
    }
    Ok(())
}

async fn push_metrics(url: String) {
    let metric_families = prometheus::gather();
    let r = spawn_blocking(move || {
        prometheus::push_metrics(
            "arkprep",
            labels! { "instance".to_string() => "batch".to_string() },
            &url,
            metric_families,
            None,
        )
    })
    .await;
    match r {
        Ok(Ok(())) => info!("已推送指标"),
        Ok(Err(e)) => error!("推送指标失败: {e}"),
        Err(e) => warn!("推送任务异常: {e}"),
    }
}
