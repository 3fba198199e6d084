mod cli;
mod config;
mod error;
mod output;

use std::process;

use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};
use ytdl_monitor::{DownloadRequest, YoutubeDl};

use crate::{
    cli::Args,
    config::AppConfig,
    error::{AppError, Result},
    output::EventRenderer,
};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("Application error: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    init_logging(args.verbose, args.quiet)?;

    let config = AppConfig::load(args.config.as_deref())?.merge_args(&args);

    let mut client = YoutubeDl::with_config(config.downloader.clone());
    if let Some(username) = &config.username {
        client = client.with_credentials(username, config.password.clone().unwrap_or_default());
    }

    if args.simulate {
        return match &args.audio {
            Some(format) => client.download_audio_simulate(&args.url, format).await,
            None => client.download_simulate(&args.url).await,
        }
        .map_err(AppError::from);
    }

    let request = match &args.audio {
        Some(format) => DownloadRequest::audio(&args.url, format),
        None => DownloadRequest::video(&args.url),
    };

    let renderer = if args.json {
        EventRenderer::json()
    } else {
        EventRenderer::pretty()
    };

    let mut session = client.spawn(request);
    let cancellation_token = session.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping download");
            cancellation_token.cancel();
        }
    });

    while let Some(event) = session.next_event().await {
        renderer.render(&event)?;
    }
    renderer.finish();

    session.wait().await?;
    info!("Download finished");
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(verbose),
        )
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))
}
