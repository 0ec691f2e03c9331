//! ZeroMQ subscriber for one inbound channel.
//!
//! Connects a SUB socket to the producer's publisher, decodes each message
//! and posts it to a single-slot mailbox for the fusion thread. The socket
//! conflates (keeps only the newest unread message) and has a receive
//! high-water mark of 1, so a burst from the producer never queues up.
//! One subscriber (and one thread) per channel; each owns its socket.
//!
//! # Example
//!
//! ```ignore
//! use drishti::io::{ChannelReceiver, decode_scan};
//! use std::sync::Arc;
//! use std::sync::atomic::AtomicBool;
//!
//! let context = zmq::Context::new();
//! let running = Arc::new(AtomicBool::new(true));
//! let (receiver, scan_rx) =
//!     ChannelReceiver::connect(&context, "scan", "tcp://localhost:5556", decode_scan, running)?;
//! let handle = receiver.spawn()?;
//!
//! if let Some(scan) = scan_rx.take() {
//!     println!("{} points", scan.len());
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::io::mailbox::{MailboxReceiver, MailboxSender, Posted, mailbox};

/// Receive timeout (ms); bounds how long shutdown waits on an idle channel.
const RECV_TIMEOUT_MS: i32 = 100;

/// Pause after a receive error that is not a timeout.
const ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Consecutive receive errors between repeated log lines.
const ERROR_LOG_EVERY: u64 = 50;

/// Payload decoder for a channel.
pub type Decoder<T> = fn(&[u8], Instant) -> Result<T>;

/// Per-channel counters, shared with the stats logger.
#[derive(Debug, Default)]
pub struct ChannelStats {
    received: AtomicU64,
    decode_errors: AtomicU64,
    replaced: AtomicU64,
}

/// Point-in-time copy of [`ChannelStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelCounts {
    /// Messages received
    pub received: u64,
    /// Messages dropped because they failed to decode
    pub decode_errors: u64,
    /// Decoded messages discarded unread because a newer one arrived
    pub replaced: u64,
}

impl ChannelStats {
    /// Read all counters
    pub fn counts(&self) -> ChannelCounts {
        ChannelCounts {
            received: self.received.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            replaced: self.replaced.load(Ordering::Relaxed),
        }
    }
}

/// Throttle for a persistently failing socket.
///
/// The first error of a run is logged, then one in every
/// [`ERROR_LOG_EVERY`]; every error is followed by [`ERROR_BACKOFF`].
#[derive(Debug, Default)]
pub(crate) struct ErrorBackoff {
    consecutive: u64,
}

impl ErrorBackoff {
    /// Record an error; returns true if it should be logged.
    pub(crate) fn record(&mut self) -> bool {
        self.consecutive += 1;
        self.consecutive == 1 || self.consecutive % ERROR_LOG_EVERY == 0
    }

    /// A receive succeeded or timed out normally.
    pub(crate) fn reset(&mut self) {
        self.consecutive = 0;
    }

    pub(crate) fn consecutive(&self) -> u64 {
        self.consecutive
    }
}

/// Subscriber for one inbound channel.
pub struct ChannelReceiver<T> {
    name: &'static str,
    socket: zmq::Socket,
    decode: Decoder<T>,
    tx: MailboxSender<T>,
    running: Arc<AtomicBool>,
    stats: Arc<ChannelStats>,
}

impl<T: Send + 'static> ChannelReceiver<T> {
    /// Connect a conflating SUB socket to `endpoint`.
    ///
    /// Returns the receiver and the mailbox it posts decoded messages to.
    /// Connecting succeeds before the publisher exists; ZeroMQ reconnects
    /// in the background. A malformed endpoint is transport-fatal.
    pub fn connect(
        context: &zmq::Context,
        name: &'static str,
        endpoint: &str,
        decode: Decoder<T>,
        running: Arc<AtomicBool>,
    ) -> Result<(Self, MailboxReceiver<T>)> {
        let channel_err = |source| Error::Channel {
            channel: name,
            endpoint: endpoint.to_string(),
            source,
        };

        let socket = context.socket(zmq::SUB).map_err(channel_err)?;
        // Options must be set before connect to take effect
        socket.set_conflate(true).map_err(channel_err)?;
        socket.set_rcvhwm(1).map_err(channel_err)?;
        socket.set_linger(0).map_err(channel_err)?;
        // Short timeout so the loop notices shutdown
        socket.set_rcvtimeo(RECV_TIMEOUT_MS).map_err(channel_err)?;
        socket.connect(endpoint).map_err(channel_err)?;
        socket.set_subscribe(b"").map_err(channel_err)?;

        log::info!("{} channel subscribed to {}", name, endpoint);

        let (tx, rx) = mailbox();
        Ok((
            Self {
                name,
                socket,
                decode,
                tx,
                running,
                stats: Arc::new(ChannelStats::default()),
            },
            rx,
        ))
    }

    /// Shared counters for this channel
    pub fn stats(&self) -> Arc<ChannelStats> {
        Arc::clone(&self.stats)
    }

    /// Run the receiver on a dedicated named thread.
    pub fn spawn(self) -> Result<JoinHandle<()>> {
        let name = self.name;
        thread::Builder::new()
            .name(format!("{}-rx", name))
            .spawn(move || self.run())
            .map_err(|source| Error::Spawn { name, source })
    }

    /// Run the receiver loop (blocking) until the running flag clears.
    pub fn run(self) {
        log::info!("{} receiver started", self.name);

        let mut backoff = ErrorBackoff::default();

        while self.running.load(Ordering::Relaxed) {
            let payload = match self.socket.recv_bytes(0) {
                Ok(payload) => {
                    backoff.reset();
                    payload
                }
                Err(zmq::Error::EAGAIN) | Err(zmq::Error::EINTR) => {
                    backoff.reset();
                    continue;
                }
                Err(zmq::Error::ETERM) => {
                    log::info!("{}: context terminated", self.name);
                    break;
                }
                Err(e) => {
                    if backoff.record() {
                        log::error!(
                            "{} recv error ({} in a row): {}",
                            self.name,
                            backoff.consecutive(),
                            e
                        );
                    }
                    thread::sleep(ERROR_BACKOFF);
                    continue;
                }
            };
            self.stats.received.fetch_add(1, Ordering::Relaxed);

            let message = match (self.decode)(&payload, Instant::now()) {
                Ok(m) => m,
                Err(e) => {
                    self.stats.decode_errors.fetch_add(1, Ordering::Relaxed);
                    log::warn!(
                        "Dropping {} message ({} bytes): {}",
                        self.name,
                        payload.len(),
                        e
                    );
                    continue;
                }
            };

            // Never blocks: an unread older message is discarded
            if self.tx.post(message) == Posted::Replaced {
                self.stats.replaced.fetch_add(1, Ordering::Relaxed);
                log::trace!("{}: replaced unread message", self.name);
            }
        }

        log::info!("{} receiver stopped", self.name);
    }
}
