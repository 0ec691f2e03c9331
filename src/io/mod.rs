//! I/O infrastructure.
//!
//! - [`messages`]: Decode/encode of the detections, scan and tracked-objects contracts
//! - [`mailbox`]: Single-slot, overwrite-on-full handoff between threads
//! - [`subscriber`]: One ZeroMQ SUB reader thread per inbound channel
//! - [`publisher`]: ZeroMQ PUB thread for the tracked-objects channel

pub mod mailbox;
pub mod messages;
pub mod publisher;
pub mod subscriber;

pub use mailbox::{MailboxReceiver, MailboxSender, Posted, Waited, mailbox};
pub use messages::{
    DetectionEntry, DetectionsMessage, ObjectEntry, ObjectsMessage, decode_detections,
    decode_scan, encode_scan,
};
pub use publisher::{ObjectPublisher, PublisherStats};
pub use subscriber::{ChannelCounts, ChannelReceiver, ChannelStats, Decoder};
