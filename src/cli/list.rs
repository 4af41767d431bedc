use anyhow::Result;
use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::config::{Opts, OutputFormat};
use crate::dataset::{Split, select_range};

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    /// 只列出指定划分
    #[arg(long, value_enum)]
    pub split: Option<Split>,
    #[arg(long, default_value_t = 0)]
    pub start: usize,
    #[arg(long)]
    pub count: Option<usize>,
    /// 输出格式
    #[arg(long, value_enum, value_name = "FORMAT", default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for ListCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let scenes = select_range(opts.data_dir.discover_all(self.split)?, self.start, self.count);
        match self.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&scenes)?),
            OutputFormat::Table => {
                for scene in &scenes {
                    println!("{}\t{}", scene.split, scene.video_id);
                }
            }
        }
        Ok(())
    }
}
