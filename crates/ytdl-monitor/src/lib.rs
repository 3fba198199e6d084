//! Supervise youtube-dl and turn its progress output into typed events.
//!
//! The tool redraws a single progress line with carriage returns. This crate
//! launches it with a structured argument vector, splits its stdout on `\r`,
//! matches the destination and progress lines, and delivers them as
//! [`DownloadEvent`]s on a Tokio channel while the process keeps running.
//!
//! ```no_run
//! use ytdl_monitor::{DownloadEvent, DownloadRequest, YoutubeDl};
//!
//! # async fn demo() -> ytdl_monitor::Result<()> {
//! let mut session = YoutubeDl::new().spawn(DownloadRequest::video("https://example.com/v"));
//! while let Some(event) = session.next_event().await {
//!     match event {
//!         DownloadEvent::Destination(name) => println!("saving to {name}"),
//!         DownloadEvent::Progress(p) => println!("{} of {}", p.progress(), p.file_size()),
//!         DownloadEvent::Failed(e) => eprintln!("{e}"),
//!     }
//! }
//! session.wait().await
//! # }
//! ```

pub mod command;
pub mod config;
pub mod downloader;
pub mod error;
pub mod event;
pub mod matcher;
pub mod monitor;
pub mod session;
pub mod supervisor;
pub mod tokenizer;

pub use command::{CommandLine, Credentials, DownloadRequest, MediaKind};
pub use config::YoutubeDlConfig;
pub use downloader::YoutubeDl;
pub use error::{Error, ExecutionError, Result};
pub use event::{DownloadEvent, DownloadProgress};
pub use monitor::{MonitorSummary, monitor_output, scan_output};
pub use session::DownloadSession;
pub use supervisor::{OutputSink, ProcessSupervisor};
pub use tokio_util::sync::CancellationToken;
