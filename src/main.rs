use anyhow::Context;
use clap::Parser;

use truffle_showcase::{cli::Cli, ShowcaseApp};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.scene_config().context("invalid command line")?;
    log::info!("Showing {} model {}", config.model.format, config.model.path.display());

    ShowcaseApp::new(config)?.run()
}
