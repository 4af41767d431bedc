use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use serde::Serialize;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::{LayoutOptions, MatchOptions, Opts, OutputFormat};
use crate::dataset::expand_scene_paths;
use crate::scene::{Density, Reconciler, SceneInfo};
use crate::utils::abbreviate;

#[derive(Parser, Debug, Clone)]
pub struct VerifyCommand {
    #[command(flatten)]
    pub layout: LayoutOptions,
    #[command(flatten)]
    pub matching: MatchOptions,
    /// 场景目录，或包含多个场景的目录
    pub path: PathBuf,
    /// 存在无效场景时以非零状态退出
    #[arg(long)]
    pub check: bool,
    /// 输出格式
    #[arg(long, value_enum, value_name = "FORMAT", default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct VerifyResult {
    scene: PathBuf,
    valid: bool,
    info: SceneInfo,
}

impl SubCommandExtend for VerifyCommand {
    async fn run(&self, _opts: &Opts) -> Result<()> {
        let layout = self.layout.scene_layout();
        let reconciler = Reconciler::new(layout.clone(), self.matching.match_config());

        let scenes = if self.path.is_dir() {
            expand_scene_paths(&self.path, &layout)?
        } else {
            vec![self.path.clone()]
        };
        if scenes.is_empty() {
            bail!("{} 下没有找到场景", self.path.display());
        }

        let mut results = vec![];
        for scene in scenes {
            let (valid, info) = block_in_place(|| reconciler.verify(&scene))?;
            results.push(VerifyResult { scene, valid, info });
        }

        match self.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
            OutputFormat::Table => results.iter().for_each(print_result),
        }

        let invalid = results.iter().filter(|r| !r.valid).count();
        if self.check && invalid > 0 {
            bail!("{invalid} 个场景校验失败");
        }
        Ok(())
    }
}

fn print_result(result: &VerifyResult) {
    let info = &result.info;
    println!("[{}] {}", if result.valid { "OK" } else { "INVALID" }, result.scene.display());
    println!(
        "  文件数    rgb={} depth={} intrinsics={}",
        info.file_counts.rgb, info.file_counts.depth, info.file_counts.intrinsics
    );
    println!("  匹配      {}", info.matched_count);
    if info.is_empty() {
        println!("  场景为空");
    }
    if !info.missing_dirs.is_empty() {
        let names: Vec<_> = info.missing_dirs.iter().map(|m| m.name()).collect();
        println!("  缺少目录  {}", names.join(", "));
    }
    if info.orphan_total() > 0 {
        println!(
            "  孤立文件  rgb={} depth={} intrinsics={}",
            info.orphan_counts.rgb, info.orphan_counts.depth, info.orphan_counts.intrinsics
        );
        println!("  未匹配    {}", abbreviate(&info.unmatched_timestamps));
    }
    if info.duplicate_count > 0 {
        println!("  重复时间戳 {}", info.duplicate_count);
    }
    if info.malformed_count > 0 {
        println!("  无法解析  {}", info.malformed_count);
    }
    match info.density {
        Density::MedianGap { secs } if secs > 0.0 => println!("  帧率      {:.1} fps", 1.0 / secs),
        Density::Unknown => println!("  帧率      未知"),
        _ => {}
    }
}
