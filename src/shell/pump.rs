//! Output pump for a shell session.
//!
//! Two tasks per session: the pump reads the child's stdout and stderr,
//! decodes them and queues the text on a bounded channel; the delivery task
//! drains that channel into the output callback. Both watch the session's
//! cancellation flag and neither touches session state.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, trace};

use super::decode::Utf8Decoder;

/// Receives decoded output chunks. Chunk boundaries are arbitrary.
pub type OutputCallback = Box<dyn FnMut(String) + Send + 'static>;

// How long output already in the pipes is still read once the shell is gone.
const EXIT_DRAIN: Duration = Duration::from_millis(100);

enum Step {
    Forward(String),
    Idle,
    Failed(io::Error),
}

/// One side of the child's combined output.
struct Pipe<R> {
    name: &'static str,
    reader: Option<R>,
    buf: Vec<u8>,
    decoder: Utf8Decoder,
}

impl<R: AsyncRead + Unpin> Pipe<R> {
    fn new(name: &'static str, reader: R, chunk_size: usize) -> Self {
        Self {
            name,
            reader: Some(reader),
            buf: vec![0u8; chunk_size],
            decoder: Utf8Decoder::default(),
        }
    }

    fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Waits for the next read. A closed pipe never completes.
    async fn read(&mut self) -> io::Result<usize> {
        match self.reader.as_mut() {
            Some(reader) => reader.read(&mut self.buf).await,
            None => std::future::pending().await,
        }
    }

    fn settle(&mut self, read: io::Result<usize>) -> Step {
        match read {
            Ok(0) => {
                trace!(stream = self.name, "end of stream");
                self.reader = None;
                self.decoder.finish().map_or(Step::Idle, Step::Forward)
            }
            Ok(n) => {
                let text = self.decoder.decode(&self.buf[..n]);
                if text.is_empty() {
                    Step::Idle
                } else {
                    Step::Forward(text)
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Step::Idle,
            Err(e) => {
                self.reader = None;
                Step::Failed(e)
            }
        }
    }
}

/// Completes when the shell exits or, once it has, when the drain window
/// closes.
async fn exit_or_drained(exited: &mut watch::Receiver<bool>, drain_until: Option<Instant>) {
    match drain_until {
        Some(deadline) => sleep_until(deadline).await,
        None => {
            let closed = exited.wait_for(|done| *done).await.is_err();
            if closed {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Reads both output streams until cancelled, the shell exits, a read fails,
/// or the delivery side goes away.
///
/// After the exit a descendant may still hold the pipes open, so only what
/// arrives within a short drain window is forwarded.
pub(crate) async fn pump_output<O, E>(
    stdout: O,
    stderr: E,
    mut cancel: watch::Receiver<bool>,
    mut exited: watch::Receiver<bool>,
    output_tx: mpsc::Sender<String>,
    chunk_size: usize,
) where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut out = Pipe::new("stdout", stdout, chunk_size);
    let mut err = Pipe::new("stderr", stderr, chunk_size);
    let mut drain_until: Option<Instant> = None;

    while out.is_open() || err.is_open() {
        if *cancel.borrow() {
            break;
        }
        if drain_until.is_some_and(|deadline| Instant::now() >= deadline) {
            debug!("shell exited; leaving remaining output unread");
            break;
        }

        let step = tokio::select! {
            biased;
            _ = cancel.changed() => break,
            read = out.read() => out.settle(read),
            read = err.read() => err.settle(read),
            _ = exit_or_drained(&mut exited, drain_until) => {
                if drain_until.is_none() {
                    trace!("shell exited; draining buffered output");
                    drain_until = Some(Instant::now() + EXIT_DRAIN);
                }
                Step::Idle
            }
        };

        match step {
            Step::Forward(text) => {
                let delivered = tokio::select! {
                    biased;
                    _ = cancel.changed() => false,
                    sent = output_tx.send(text) => sent.is_ok(),
                };
                if !delivered {
                    break;
                }
            }
            Step::Idle => {}
            Step::Failed(e) => {
                if *cancel.borrow() || *exited.borrow() {
                    debug!(error = %e, "read failed after shutdown began");
                } else {
                    error!(error = %e, "Unexpected read failure from shell output");
                }
                break;
            }
        }
    }
    debug!("output pump finished");
}

/// Hands queued chunks to the callback in order, dropping anything that
/// arrives after cancellation.
pub(crate) async fn deliver_output(
    mut output_rx: mpsc::Receiver<String>,
    mut on_output: OutputCallback,
    cancel: watch::Receiver<bool>,
) {
    while let Some(chunk) = output_rx.recv().await {
        if *cancel.borrow() {
            break;
        }
        on_output(chunk);
    }
    trace!("output delivery finished");
}
