//! Single-slot, overwrite-on-full handoff between threads.
//!
//! The application-level equivalent of a conflating subscriber: a writer
//! never blocks and never queues more than one value; a new value replaces
//! any value the reader has not taken yet. Built on a bounded(1) crossbeam
//! channel so readers can still `select!` over several mailboxes.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use std::time::Duration;

/// Result of [`MailboxSender::post`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Posted {
    /// Slot was empty
    Stored,
    /// An unread value was discarded in favor of the new one
    Replaced,
}

/// Result of [`MailboxReceiver::wait`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Waited<T> {
    /// A value arrived
    Value(T),
    /// Nothing arrived before the timeout
    Timeout,
    /// Every sender has been dropped
    Closed,
}

/// Writing half of a mailbox.
#[derive(Debug, Clone)]
pub struct MailboxSender<T> {
    tx: Sender<T>,
    /// Used to discard the unread value when the slot is full
    evict: Receiver<T>,
}

/// Reading half of a mailbox.
#[derive(Debug, Clone)]
pub struct MailboxReceiver<T> {
    rx: Receiver<T>,
}

/// Create a mailbox.
pub fn mailbox<T>() -> (MailboxSender<T>, MailboxReceiver<T>) {
    let (tx, rx) = bounded(1);
    (
        MailboxSender {
            tx,
            evict: rx.clone(),
        },
        MailboxReceiver { rx },
    )
}

impl<T> MailboxSender<T> {
    /// Store `value`, discarding any unread predecessor. Never blocks.
    pub fn post(&self, mut value: T) -> Posted {
        let mut replaced = false;
        loop {
            match self.tx.try_send(value) {
                Ok(()) => {
                    return if replaced {
                        Posted::Replaced
                    } else {
                        Posted::Stored
                    };
                }
                Err(TrySendError::Full(v)) => {
                    // Reader may take the old value first; either way the slot frees up
                    if self.evict.try_recv().is_ok() {
                        replaced = true;
                    }
                    value = v;
                }
                // Unreachable while `evict` keeps a receiver alive
                Err(TrySendError::Disconnected(_)) => return Posted::Replaced,
            }
        }
    }
}

impl<T> MailboxReceiver<T> {
    /// Take the pending value, if any, without waiting.
    pub fn take(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for a value.
    pub fn wait(&self, timeout: Duration) -> Waited<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(v) => Waited::Value(v),
            Err(RecvTimeoutError::Timeout) => Waited::Timeout,
            Err(RecvTimeoutError::Disconnected) => Waited::Closed,
        }
    }

    /// Underlying channel, for use in `crossbeam_channel::select!`
    pub fn as_receiver(&self) -> &Receiver<T> {
        &self.rx
    }
}
