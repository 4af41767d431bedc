use std::convert::Infallible;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand, ValueEnum};
use directories::ProjectDirs;

use crate::cli::*;
use crate::dataset::DataRoot;
use crate::scene::{MatchConfig, ReconcileOptions, SceneLayout, secs_to_ticks};

static DATA_DIR: LazyLock<String> =
    LazyLock::new(|| match ProjectDirs::from("", "arkprep", "arkprep") {
        Some(dirs) => dirs.data_dir().to_string_lossy().into_owned(),
        None => "./data".to_owned(),
    });

fn default_data_dir() -> &'static str {
    DATA_DIR.as_str()
}

#[derive(Parser, Debug, Clone)]
#[command(name = "arkprep", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// 数据下载目录，场景位于 `<DATA_DIR>/raw/<split>/<video_id>`
    #[arg(short, long, global = true, default_value = default_data_dir())]
    pub data_dir: DataRoot,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 清理单个场景（或一个目录下所有场景）中不匹配的文件，并按间隔采样
    Reconcile(ReconcileCommand),
    /// 只读校验场景的三个模态是否一一对应
    Verify(VerifyCommand),
    /// 按划分批量处理数据目录下的场景
    Batch(BatchCommand),
    /// 列出数据目录下的场景
    List(ListCommand),
    /// 启动只读浏览 HTTP 服务
    Serve(ServeCommand),
}

impl FromStr for DataRoot {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(DataRoot::new(PathBuf::from(s)))
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutPreset {
    /// ultrawide / highres_depth / ultrawide_intrinsics
    Highres,
    /// lowres_wide / lowres_depth / lowres_wide_intrinsics
    Lowres,
}

#[derive(Parser, Debug, Clone)]
pub struct LayoutOptions {
    /// 模态目录结构预设
    #[arg(long, value_enum, default_value_t = LayoutPreset::Highres)]
    pub layout: LayoutPreset,
    /// 覆盖 RGB 目录名
    #[arg(long, value_name = "DIR")]
    pub rgb_dir: Option<String>,
    /// 覆盖深度目录名
    #[arg(long, value_name = "DIR")]
    pub depth_dir: Option<String>,
    /// 覆盖内参目录名
    #[arg(long, value_name = "DIR")]
    pub intrinsics_dir: Option<String>,
}

impl LayoutOptions {
    pub fn scene_layout(&self) -> SceneLayout {
        let mut layout = match self.layout {
            LayoutPreset::Highres => SceneLayout::highres(),
            LayoutPreset::Lowres => SceneLayout::lowres(),
        };
        if let Some(dir) = &self.rgb_dir {
            layout.dirs.rgb.dir = dir.clone();
        }
        if let Some(dir) = &self.depth_dir {
            layout.dirs.depth.dir = dir.clone();
        }
        if let Some(dir) = &self.intrinsics_dir {
            layout.dirs.intrinsics.dir = dir.clone();
        }
        layout
    }
}

#[derive(Parser, Debug, Clone)]
pub struct MatchOptions {
    /// 跨模态时间戳的匹配容差，单位秒；为 0 时要求完全相等
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0)]
    pub epsilon: f64,
    /// 文件名无法解析时报错退出，而不是当作孤立文件删除
    #[arg(long)]
    pub strict: bool,
}

impl MatchOptions {
    pub fn match_config(&self) -> MatchConfig {
        MatchConfig { epsilon: secs_to_ticks(self.epsilon), strict: self.strict }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct ReconcileArgs {
    /// 采样间隔：每 N 组匹配文件保留一组
    #[arg(short = 'n', long, value_name = "N", default_value_t = 1)]
    pub subsample: usize,
    /// 真正删除文件，默认只输出将要删除的文件
    #[arg(long)]
    pub execute: bool,
    /// 忽略密度检测，总是对当前匹配集合重新采样
    #[arg(long)]
    pub force: bool,
    /// 标称采集帧率，用于判断场景是否已经采样过
    #[arg(long, value_name = "FPS", default_value_t = 60.0)]
    pub capture_fps: f64,
    /// 除模态目录外需要保留的资源目录，可多次指定
    #[arg(long = "keep-asset", value_name = "NAME")]
    pub keep_assets: Vec<String>,
    /// 删除既不是模态目录也不是 --keep-asset 的子目录
    #[arg(long)]
    pub prune: bool,
}

impl ReconcileArgs {
    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            stride: self.subsample,
            assets: self.keep_assets.clone(),
            prune: self.prune,
            dry_run: !self.execute,
            force: self.force,
            capture_fps: self.capture_fps,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Table,
}
