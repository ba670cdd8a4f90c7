//! Byte-stream to line-scanner bridge.
//!
//! A [`LineScanner`] turns a followed container log stream into a sequence
//! of text lines. A relay task copies raw bytes from the stream into the
//! write half of an in-process duplex pipe; the scanner reads lines from
//! the buffered read half. The bounded pipe provides back-pressure: when
//! the scanner falls behind, the relay stops polling the source.
//!
//! Each yielded item is either a line of text or a carried error; carried
//! errors are signalled distinctly from end-of-stream.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use futures_util::StreamExt;

use crate::docker::LogStream;
use crate::error::WatchError;

/// Capacity of the in-process pipe between relay and scanner.
const BRIDGE_CAPACITY: usize = 64 * 1024;

/// Lines longer than this are truncated before matching.
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Line scanner over a followed log stream.
///
/// Construct once per acquired stream; a scanner is not restartable
/// mid-stream. Call [`LineScanner::stop`] on every exit path to release
/// the bridge deterministically.
pub struct LineScanner {
    target: String,
    reader: BufReader<DuplexStream>,
    relay_stop: CancellationToken,
    relay: Option<JoinHandle<()>>,
    stream_error: Arc<Mutex<Option<WatchError>>>,
    finished: bool,
}

impl LineScanner {
    /// Wires `stream` through the relay task and returns the scanner.
    pub fn spawn(target: &str, stream: LogStream) -> Self {
        let (writer, reader) = tokio::io::duplex(BRIDGE_CAPACITY);
        let relay_stop = CancellationToken::new();
        let stream_error = Arc::new(Mutex::new(None));

        let relay = tokio::spawn(relay(
            stream,
            writer,
            relay_stop.clone(),
            Arc::clone(&stream_error),
            target.to_owned(),
        ));

        Self {
            target: target.to_owned(),
            reader: BufReader::new(reader),
            relay_stop,
            relay: Some(relay),
            stream_error,
            finished: false,
        }
    }

    /// Yields the next line, a carried error, or `None` at end of stream.
    ///
    /// Blocks while the underlying stream is open but quiet (follow
    /// semantics); callers race this against their own deadlines.
    pub async fn next_line(&mut self) -> Option<Result<String, WatchError>> {
        if self.finished {
            return None;
        }

        let mut buf = Vec::new();
        match self.reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                self.finished = true;
                // EOF on the pipe either means the stream genuinely ended or
                // the relay stopped after recording a carried error.
                match self.stream_error.lock().await.take() {
                    Some(err) => Some(Err(err)),
                    None => None,
                }
            }
            Ok(_) => {
                while matches!(buf.last(), Some(b'\n' | b'\r')) {
                    buf.pop();
                }
                if buf.len() > MAX_LINE_BYTES {
                    warn!(
                        target = self.target.as_str(),
                        len = buf.len(),
                        "truncating overlong log line"
                    );
                    buf.truncate(MAX_LINE_BYTES);
                }
                Some(Ok(String::from_utf8_lossy(&buf).into_owned()))
            }
            Err(e) => {
                self.finished = true;
                Some(Err(WatchError::LineRead {
                    target: self.target.clone(),
                    reason: e.to_string(),
                }))
            }
        }
    }

    /// Tears the bridge down in a fixed order: signal the relay to stop,
    /// wait for it to exit (which closes the write side), then drop the
    /// read side.
    pub async fn stop(mut self) {
        self.relay_stop.cancel();
        if let Some(handle) = self.relay.take()
            && handle.await.is_err()
        {
            warn!(
                target = self.target.as_str(),
                "relay task panicked during shutdown"
            );
        }
        // read half is dropped with self
    }
}

/// Copies bytes from the source stream into the pipe until the stream ends,
/// an error is carried, the scanner side closes, or the stop token fires.
///
/// The writer is owned here, so the write side closes exactly when this
/// task exits.
async fn relay(
    mut stream: LogStream,
    mut writer: DuplexStream,
    stop: CancellationToken,
    error_slot: Arc<Mutex<Option<WatchError>>>,
    target: String,
) {
    loop {
        tokio::select! {
            _ = stop.cancelled() => {
                debug!(target = target.as_str(), "relay received stop signal");
                break;
            }
            chunk = stream.next() => match chunk {
                Some(Ok(bytes)) => {
                    // A full pipe with a stalled scanner must not wedge
                    // shutdown, so the write itself races the stop token.
                    tokio::select! {
                        result = writer.write_all(&bytes) => {
                            if result.is_err() {
                                debug!(target = target.as_str(), "scanner side closed, relay exiting");
                                break;
                            }
                        }
                        _ = stop.cancelled() => break,
                    }
                }
                Some(Err(err)) => {
                    *error_slot.lock().await = Some(err);
                    break;
                }
                None => {
                    debug!(target = target.as_str(), "log stream ended");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use bytes::Bytes;
    use futures_util::stream;

    fn stream_of(chunks: Vec<Result<Bytes, WatchError>>) -> LogStream {
        stream::iter(chunks).boxed()
    }

    fn held_open(chunks: Vec<Result<Bytes, WatchError>>) -> LogStream {
        stream::iter(chunks).chain(stream::pending()).boxed()
    }

    #[tokio::test]
    async fn yields_whole_lines() {
        let chunks = vec![Ok(Bytes::from("first line\nsecond line\n"))];
        let mut scanner = LineScanner::spawn("web", stream_of(chunks));

        assert_eq!(scanner.next_line().await.unwrap().unwrap(), "first line");
        assert_eq!(scanner.next_line().await.unwrap().unwrap(), "second line");
        assert!(scanner.next_line().await.is_none());
        scanner.stop().await;
    }

    #[tokio::test]
    async fn reassembles_lines_split_across_chunks() {
        let chunks = vec![
            Ok(Bytes::from("par")),
            Ok(Bytes::from("tial line\nnext")),
            Ok(Bytes::from(" one\n")),
        ];
        let mut scanner = LineScanner::spawn("web", stream_of(chunks));

        assert_eq!(scanner.next_line().await.unwrap().unwrap(), "partial line");
        assert_eq!(scanner.next_line().await.unwrap().unwrap(), "next one");
        assert!(scanner.next_line().await.is_none());
        scanner.stop().await;
    }

    #[tokio::test]
    async fn trims_carriage_returns() {
        let chunks = vec![Ok(Bytes::from("crlf line\r\n"))];
        let mut scanner = LineScanner::spawn("web", stream_of(chunks));

        assert_eq!(scanner.next_line().await.unwrap().unwrap(), "crlf line");
        scanner.stop().await;
    }

    #[tokio::test]
    async fn final_line_without_newline_is_yielded() {
        let chunks = vec![Ok(Bytes::from("no trailing newline"))];
        let mut scanner = LineScanner::spawn("web", stream_of(chunks));

        assert_eq!(
            scanner.next_line().await.unwrap().unwrap(),
            "no trailing newline"
        );
        assert!(scanner.next_line().await.is_none());
        scanner.stop().await;
    }

    #[tokio::test]
    async fn carried_error_surfaces_after_buffered_lines() {
        let chunks = vec![
            Ok(Bytes::from("good line\n")),
            Err(WatchError::DockerApi("connection reset".to_owned())),
        ];
        let mut scanner = LineScanner::spawn("web", stream_of(chunks));

        assert_eq!(scanner.next_line().await.unwrap().unwrap(), "good line");
        let err = scanner.next_line().await.unwrap().unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        // Error is terminal: subsequent calls report end of stream.
        assert!(scanner.next_line().await.is_none());
        scanner.stop().await;
    }

    #[tokio::test]
    async fn end_of_stream_is_distinct_from_error() {
        let mut scanner = LineScanner::spawn("web", stream_of(Vec::new()));
        assert!(scanner.next_line().await.is_none());
        scanner.stop().await;
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced_not_fatal() {
        let chunks = vec![Ok(Bytes::from(vec![0x68, 0x69, 0xFF, 0x0A]))];
        let mut scanner = LineScanner::spawn("web", stream_of(chunks));

        let line = scanner.next_line().await.unwrap().unwrap();
        assert!(line.starts_with("hi"));
        scanner.stop().await;
    }

    #[tokio::test]
    async fn stop_releases_a_held_open_stream() {
        let chunks = vec![Ok(Bytes::from("only line\n"))];
        let mut scanner = LineScanner::spawn("web", held_open(chunks));

        assert_eq!(scanner.next_line().await.unwrap().unwrap(), "only line");
        // The stream stays open with no further data; stop must still
        // return promptly.
        tokio::time::timeout(std::time::Duration::from_secs(1), scanner.stop())
            .await
            .expect("stop should not hang on an open stream");
    }

    #[tokio::test]
    async fn relay_backpressure_does_not_block_stop() {
        // More data than the bridge can hold, never consumed by the reader.
        let big = "x".repeat(32 * 1024);
        let chunks: Vec<Result<Bytes, WatchError>> = (0..8)
            .map(|_| Ok(Bytes::from(format!("{big}\n"))))
            .collect();
        let scanner = LineScanner::spawn("web", held_open(chunks));

        tokio::time::timeout(std::time::Duration::from_secs(1), scanner.stop())
            .await
            .expect("stop should interrupt a blocked relay write");
    }
}
