use anyhow::Context;
use bazaar_client::App;
use bazaar_client::args::Cli;
use bazaar_kernel::config::load_config;
use bazaar_kernel::domain::config::{ClientConfig, LoggingConfig};
use bazaar_logger::{FileOutput, Logger, parse_level, parse_rotation};
use bazaar_realtime::WebSocketTransport;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg: ClientConfig = load_config(Some(&cli.config)).context("Critical: Configuration is malformed")?;
    let _log = init_logger(&cfg.logging)?;

    let app = App::start(cfg, WebSocketTransport).await?;
    app.queue(&cli.say)?;
    app.login(&cli.user_id, cli.token.as_deref()).await?;

    app.run_until(bazaar_client::shutdown_signal()).await
}

fn init_logger(cfg: &LoggingConfig) -> anyhow::Result<Logger> {
    let level = parse_level(&cfg.level).context("Invalid logging.level")?;
    let mut builder = Logger::builder().name(env!("CARGO_PKG_NAME")).console(true).level(level);

    if let Some(filter) = &cfg.filter {
        builder = builder.env_filter(filter.as_str());
    }
    if let Some(dir) = &cfg.directory {
        let rotation = parse_rotation(&cfg.rotation).context("Invalid logging.rotation")?;
        builder = builder.file(FileOutput::new(dir).rotation(rotation).max_files(cfg.max_files).json(cfg.json));
    }

    Ok(builder.init()?)
}
