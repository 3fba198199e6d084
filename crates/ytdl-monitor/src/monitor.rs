//! Output monitor: tokenizes the tool's stdout and emits typed events.
//!
//! # Flow control
//!
//! Events are delivered with `Sender::send().await` on a bounded channel. A
//! slow consumer therefore stalls token consumption, which in turn stops
//! reads from the process pipe; the tool then blocks on its own writes
//! until the consumer catches up. Nothing is buffered without bound.

use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tracing::{debug, warn};

use crate::event::DownloadEvent;
use crate::matcher::ProgressMatcher;
use crate::tokenizer::{CarriageReturnCodec, Split, split_carriage_return};

/// Counters collected over one monitored stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorSummary {
    /// Tokens read from the stream.
    pub tokens: usize,
    /// Events handed to the channel.
    pub events: usize,
}

/// Read `reader` until end-of-stream, sending every recognised token as a
/// [`DownloadEvent`] on `events`.
///
/// Returns once the stream is exhausted. If the receiving side goes away,
/// matching stops but the stream is still drained so the writer never
/// blocks on a full pipe. A read error ends monitoring early.
pub async fn monitor_output<R>(reader: R, events: mpsc::Sender<DownloadEvent>) -> MonitorSummary
where
    R: AsyncRead + Unpin,
{
    let mut tokens = FramedRead::new(reader, CarriageReturnCodec::new());
    let mut matcher = ProgressMatcher::new();
    let mut summary = MonitorSummary::default();
    let mut consumer_gone = false;

    while let Some(token) = tokens.next().await {
        let token = match token {
            Ok(token) => token,
            Err(e) => {
                warn!("Error reading download output: {}", e);
                break;
            }
        };
        summary.tokens += 1;

        if consumer_gone {
            continue;
        }

        let Some(event) = matcher.feed(&token) else {
            continue;
        };

        if events.send(event).await.is_err() {
            debug!("Event receiver dropped, draining remaining output");
            consumer_gone = true;
            continue;
        }
        summary.events += 1;
    }

    debug!(
        "Output monitor finished: {} tokens, {} events",
        summary.tokens, summary.events
    );
    summary
}

/// Run the tokenizer and matcher over a captured byte stream.
///
/// Same event sequence [`monitor_output`] would deliver for this input.
pub fn scan_output(bytes: &[u8]) -> Vec<DownloadEvent> {
    let mut matcher = ProgressMatcher::new();
    let mut events = Vec::new();
    let mut rest = bytes;

    while let Split::Token { advance, token } = split_carriage_return(rest, true) {
        if let Some(event) = matcher.feed(&String::from_utf8_lossy(token)) {
            events.push(event);
        }
        rest = &rest[advance..];
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    const SAMPLE: &[u8] = b"[youtube] abc: Downloading webpage\n\
        [download] Destination: movie.mp4\n\
        [download]   0.0% of 10.5MiB at 50.00KiB/s ETA 03:34\r\
        [download]  45.2% of 10.5MiB at 1.2MiB/s ETA 00:12\r\
        [ffmpeg] Merging formats into \"movie.mp4\"\r\
        [download] 100.0% of 10.5MiB at 2.1MiB/s ETA 00:00\r\
        [download] 100% of 10.50MiB in 00:05\n";

    fn describe(events: &[DownloadEvent]) -> Vec<String> {
        events
            .iter()
            .map(|event| match event {
                DownloadEvent::Destination(name) => format!("dest:{name}"),
                DownloadEvent::Progress(p) => format!(
                    "{}|{}|{}|{}",
                    p.progress(),
                    p.file_size(),
                    p.download_speed(),
                    p.remaining_time()
                ),
                DownloadEvent::Failed(e) => format!("failed:{e}"),
            })
            .collect()
    }

    async fn collect(input: &'static [u8], capacity: usize) -> (Vec<DownloadEvent>, MonitorSummary) {
        let (mut writer, reader) = tokio::io::duplex(64);
        let (tx, mut rx) = mpsc::channel(capacity);

        tokio::spawn(async move {
            writer.write_all(input).await.unwrap();
        });
        let monitor = tokio::spawn(monitor_output(reader, tx));

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (events, monitor.await.unwrap())
    }

    #[tokio::test]
    async fn test_destination_precedes_progress() {
        let (events, summary) = collect(SAMPLE, 1).await;

        assert_eq!(
            describe(&events),
            vec![
                "dest:movie.mp4",
                "45.2%|10.5MiB|1.2MiB/s|00:12",
                "100.0%|10.5MiB|2.1MiB/s|00:00",
            ]
        );
        assert_eq!(summary.tokens, 5);
        assert_eq!(summary.events, 3);
    }

    #[tokio::test]
    async fn test_missing_destination_still_tracks_progress() {
        let input: &'static [u8] = b"[download] movie.mp4 has already been downloaded\r\
            [download]  45.2% of 10.5MiB at 1.2MiB/s ETA 00:12\r";
        let (events, _) = collect(input, 8).await;

        assert_eq!(describe(&events), vec!["45.2%|10.5MiB|1.2MiB/s|00:12"]);
    }

    #[tokio::test]
    async fn test_empty_stream_yields_nothing() {
        let (events, summary) = collect(b"", 8).await;
        assert!(events.is_empty());
        assert_eq!(summary, MonitorSummary::default());
    }

    #[tokio::test]
    async fn test_dropped_receiver_still_drains_stream() {
        let (mut writer, reader) = tokio::io::duplex(16);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let writer_task = tokio::spawn(async move {
            for _ in 0..50 {
                writer
                    .write_all(b"[download]   1.0% of 1.00MiB at 1.00KiB/s ETA 01:00\r")
                    .await
                    .unwrap();
            }
        });

        let summary = monitor_output(reader, tx).await;
        writer_task.await.unwrap();
        assert_eq!(summary.tokens, 50);
        assert_eq!(summary.events, 0);
    }

    #[tokio::test]
    async fn test_async_monitor_matches_scan() {
        let (events, _) = collect(SAMPLE, 4).await;
        assert_eq!(describe(&events), describe(&scan_output(SAMPLE)));
    }

    #[test]
    fn test_scan_is_repeatable() {
        let first = describe(&scan_output(SAMPLE));
        let second = describe(&scan_output(SAMPLE));
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }
}
