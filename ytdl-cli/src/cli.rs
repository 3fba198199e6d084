use std::path::PathBuf;

use clap::Parser;

/// Download a video or its audio track with youtube-dl, showing live progress.
#[derive(Parser, Debug)]
#[command(name = "ytdl", version, about)]
pub struct Args {
    /// Video URL
    pub url: String,

    /// Extract the audio track in this format (e.g. mp3, m4a) instead of downloading the video
    #[arg(short, long, value_name = "FORMAT")]
    pub audio: Option<String>,

    /// Resolve the download without fetching anything
    #[arg(short, long)]
    pub simulate: bool,

    /// Print one JSON object per event instead of a progress bar
    #[arg(long)]
    pub json: bool,

    /// Path to the youtube-dl binary
    #[arg(long, value_name = "PATH", env = "YTDL_BINARY")]
    pub binary: Option<String>,

    /// Account username
    #[arg(short, long, env = "YTDL_USERNAME")]
    pub username: Option<String>,

    /// Account password
    #[arg(short, long, env = "YTDL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Configuration file (defaults to <config dir>/ytdl/config.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}
