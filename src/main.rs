use clap::Parser;
use env_logger::Env;

use arkprep::Opts;
use arkprep::cli::SubCommandExtend;
use arkprep::config::SubCommand;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();

    match &opts.subcmd {
        SubCommand::Reconcile(config) => config.run(&opts).await,
        SubCommand::Verify(config) => config.run(&opts).await,
        SubCommand::Batch(config) => config.run(&opts).await,
        SubCommand::List(config) => config.run(&opts).await,
        SubCommand::Serve(config) => config.run(&opts).await,
    }
}
