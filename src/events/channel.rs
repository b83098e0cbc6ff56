//! Crossbeam-backed event channels.
//!
//! Workers only ever hold an [`EventSender`]; whether anyone listens is the
//! front end's business.

use crossbeam_channel::{Receiver, Sender};

use super::Event;

/// Sending half, cloned into every worker that reports progress
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Queue an event. Events sent after the receiver is gone are dropped.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Receiving half, owned by whatever renders progress
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Wait for the next event; `None` once every sender is dropped
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Next queued event, if any
    pub fn try_recv(&self) -> Option<Event> {
        self.inner.try_recv().ok()
    }

    /// Events until every sender is dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Constructors for sender/receiver pairs
pub struct EventChannel;

impl EventChannel {
    /// An unbounded channel; sending never blocks
    pub fn new() -> (EventSender, EventReceiver) {
        wrap(crossbeam_channel::unbounded())
    }

    /// A channel holding at most `capacity` queued events.
    ///
    /// Senders block while it is full.
    pub fn bounded(capacity: usize) -> (EventSender, EventReceiver) {
        wrap(crossbeam_channel::bounded(capacity))
    }
}

fn wrap((sender, receiver): (Sender<Event>, Receiver<Event>)) -> (EventSender, EventReceiver) {
    (EventSender { inner: sender }, EventReceiver { inner: receiver })
}

/// A sender for runs nobody is watching
pub fn null_sender() -> EventSender {
    EventChannel::new().0
}
