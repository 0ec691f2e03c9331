//! ZeroMQ publisher for the tracked-objects channel
//!
//! Drains the output mailbox and publishes each message as one JSON frame on
//! a bound PUB socket. Any number of consumers (HUD, loggers, diagnostics)
//! may subscribe. The send high-water mark is 1 and sends never block: a
//! subscriber that is not keeping up simply misses intermediate tables.
//!
//! The fusion thread only ever posts into the mailbox, so the publisher can
//! never stall a fusion cycle; if it falls behind, the unsent message is
//! replaced by the newer one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::io::mailbox::{MailboxReceiver, Waited};
use crate::io::messages::ObjectsMessage;

/// Bounded wait on the output mailbox; bounds shutdown latency.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Outbound counters.
#[derive(Debug, Default)]
pub struct PublisherStats {
    sent: AtomicU64,
    dropped: AtomicU64,
    send_errors: AtomicU64,
}

impl PublisherStats {
    /// Messages handed to the socket
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Messages the socket refused because its queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Messages that failed to encode or send
    pub fn send_errors(&self) -> u64 {
        self.send_errors.load(Ordering::Relaxed)
    }
}

/// Publisher for the tracked-objects channel.
pub struct ObjectPublisher {
    socket: zmq::Socket,
    endpoint: String,
    rx: MailboxReceiver<ObjectsMessage>,
    running: Arc<AtomicBool>,
    stats: Arc<PublisherStats>,
}

impl ObjectPublisher {
    /// Bind the PUB socket on `endpoint`. Failure is transport-fatal.
    ///
    /// A wildcard port (`tcp://127.0.0.1:*`) is resolved; see
    /// [`ObjectPublisher::endpoint`].
    pub fn bind(
        context: &zmq::Context,
        endpoint: &str,
        rx: MailboxReceiver<ObjectsMessage>,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let channel_err = |source| Error::Channel {
            channel: "tracked-objects",
            endpoint: endpoint.to_string(),
            source,
        };

        let socket = context.socket(zmq::PUB).map_err(channel_err)?;
        socket.set_sndhwm(1).map_err(channel_err)?;
        socket.set_linger(0).map_err(channel_err)?;
        socket.bind(endpoint).map_err(channel_err)?;

        let endpoint = match socket.get_last_endpoint()? {
            Ok(resolved) => resolved,
            Err(_) => endpoint.to_string(),
        };
        log::info!("tracked-objects channel publishing on {}", endpoint);

        Ok(Self {
            socket,
            endpoint,
            rx,
            running,
            stats: Arc::new(PublisherStats::default()),
        })
    }

    /// Endpoint the socket is bound to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Shared counters
    pub fn stats(&self) -> Arc<PublisherStats> {
        Arc::clone(&self.stats)
    }

    /// Run the publisher on a dedicated named thread.
    pub fn spawn(self) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("objects-tx".to_string())
            .spawn(move || self.run())
            .map_err(|source| Error::Spawn {
                name: "objects-tx",
                source,
            })
    }

    /// Run the publisher loop until the running flag clears or the fusion
    /// side drops its sender.
    pub fn run(self) {
        log::info!("Object publisher started");

        // Reused across messages to avoid an allocation per send
        let mut buffer = Vec::with_capacity(4096);

        while self.running.load(Ordering::Relaxed) {
            let message = match self.rx.wait(POLL_INTERVAL) {
                Waited::Value(m) => m,
                Waited::Timeout => continue,
                Waited::Closed => {
                    log::debug!("Output mailbox closed");
                    break;
                }
            };

            buffer.clear();
            if let Err(e) = serde_json::to_writer(&mut buffer, &message) {
                self.stats.send_errors.fetch_add(1, Ordering::Relaxed);
                log::error!("Failed to encode objects message: {}", e);
                continue;
            }

            match self.socket.send(buffer.as_slice(), zmq::DONTWAIT) {
                Ok(()) => {
                    self.stats.sent.fetch_add(1, Ordering::Relaxed);
                    log::trace!("Published {} objects", message.objects.len());
                }
                Err(zmq::Error::EAGAIN) => {
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                    log::trace!("Publisher queue full, table dropped");
                }
                Err(zmq::Error::ETERM) => {
                    log::info!("Publisher context terminated");
                    break;
                }
                Err(e) => {
                    self.stats.send_errors.fetch_add(1, Ordering::Relaxed);
                    log::warn!("Failed to publish objects: {}", e);
                }
            }
        }

        log::info!("Object publisher stopped");
    }
}
