//! Rendering of download events.

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Value, json};
use ytdl_monitor::DownloadEvent;

use crate::error::Result;

/// Consumes events and shows them to the user.
pub enum EventRenderer {
    Pretty(ProgressBar),
    Json,
}

impl EventRenderer {
    pub fn pretty() -> Self {
        let bar = ProgressBar::new(1000);
        bar.set_style(
            ProgressStyle::with_template("{prefix:.bold} [{bar:40.cyan/blue}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self::Pretty(bar)
    }

    pub fn json() -> Self {
        Self::Json
    }

    pub fn render(&self, event: &DownloadEvent) -> Result<()> {
        match self {
            Self::Pretty(bar) => {
                render_pretty(bar, event);
                Ok(())
            }
            Self::Json => {
                println!("{}", serde_json::to_string(&event_json(event))?);
                Ok(())
            }
        }
    }

    pub fn finish(&self) {
        if let Self::Pretty(bar) = self {
            bar.finish();
        }
    }
}

fn render_pretty(bar: &ProgressBar, event: &DownloadEvent) {
    match event {
        DownloadEvent::Destination(name) => bar.set_prefix(name.clone()),
        DownloadEvent::Progress(p) => {
            if let Some(percent) = p.percent() {
                bar.set_position((percent * 10.0).round() as u64);
            }
            bar.set_message(format!(
                "{} of {} at {}, ETA {}",
                p.progress(),
                p.file_size(),
                p.download_speed(),
                p.remaining_time()
            ));
        }
        DownloadEvent::Failed(e) => bar.abandon_with_message(e.to_string()),
    }
}

/// JSON shape of one event.
pub fn event_json(event: &DownloadEvent) -> Value {
    match event {
        DownloadEvent::Destination(name) => json!({
            "event": "destination",
            "filename": name,
        }),
        DownloadEvent::Progress(p) => json!({
            "event": "progress",
            "progress": p.progress(),
            "file_size": p.file_size(),
            "download_speed": p.download_speed(),
            "remaining_time": p.remaining_time(),
            "percent": p.percent(),
        }),
        DownloadEvent::Failed(e) => json!({
            "event": "failed",
            "message": e.to_string(),
            "exit_code": e.code(),
        }),
    }
}
