mod app;
mod commands;
mod config;
mod editor;
mod event;
mod gateway;
mod query;
mod session;
mod stash;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "snipstash")]
#[command(about = "A terminal UI for SnipStash code snippets, offline-first")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/snipstash/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = config::Config::load(args.config.as_deref())?;

  // The terminal belongs to the TUI; logs go to a file
  let _log_guard = init_logging()?;

  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}

fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard> {
  let log_dir = config::data_dir()?;
  std::fs::create_dir_all(&log_dir)?;

  let appender = tracing_appender::rolling::never(log_dir, "snipstash.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("snipstash=info"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}
