use clap::Parser;
use log::info;
use tokio::net::TcpListener;

use crate::cli::SubCommandExtend;
use crate::config::{LayoutOptions, MatchOptions};
use crate::scene::Reconciler;
use crate::{Opts, viewer};

#[derive(Parser, Debug, Clone)]
pub struct ServeCommand {
    #[command(flatten)]
    pub layout: LayoutOptions,
    #[command(flatten)]
    pub matching: MatchOptions,
    /// 监听地址
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub addr: String,
}

impl SubCommandExtend for ServeCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let reconciler = Reconciler::new(self.layout.scene_layout(), self.matching.match_config());

        // 创建应用状态
        let state = viewer::ViewerState::new(opts.data_dir.clone(), reconciler);

        // 创建应用
        let app = viewer::create_app(state);

        // 启动服务器
        info!("服务器启动：http://{}", &self.addr);
        info!("数据目录：{}", opts.data_dir.path().display());
        let listener = TcpListener::bind(&self.addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
