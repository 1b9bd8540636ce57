//! TestUpstream: an upstream peer that records the events sent to it.

use crate::element::UpstreamPeer;
use crate::event::Event;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

type Reaction = Box<dyn Fn(&Event) + Send + Sync>;

/// An [`UpstreamPeer`] for tests.
///
/// Records every event, replies with a configurable acceptance flag and can
/// run a reaction for each accepted event, e.g. to answer a seek with
/// flush-start and flush-stop on the pad it feeds.
///
/// # Example
///
/// ```rust
/// use parallax_aggregator::element::UpstreamPeer;
/// use parallax_aggregator::elements::TestUpstream;
/// use parallax_aggregator::event::SeekEvent;
/// use parallax_aggregator::{ClockTime, Event};
///
/// let upstream = TestUpstream::new();
/// assert!(upstream.event(Event::Seek(SeekEvent::new_time(ClockTime::ZERO))));
/// assert_eq!(upstream.seek_count(), 1);
/// ```
pub struct TestUpstream {
    accept: AtomicBool,
    events: Mutex<Vec<Event>>,
    reaction: Option<Reaction>,
}

impl TestUpstream {
    /// Create a peer that accepts every event.
    pub fn new() -> Self {
        Self {
            accept: AtomicBool::new(true),
            events: Mutex::new(Vec::new()),
            reaction: None,
        }
    }

    /// Create a peer that refuses every event.
    pub fn refusing() -> Self {
        let peer = Self::new();
        peer.set_accept(false);
        peer
    }

    /// Run `reaction` for every accepted event, before replying.
    pub fn with_reaction(mut self, reaction: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.reaction = Some(Box::new(reaction));
        self
    }

    /// Change whether events are accepted.
    pub fn set_accept(&self, accept: bool) {
        self.accept.store(accept, Ordering::SeqCst);
    }

    fn events_lock(&self) -> MutexGuard<'_, Vec<Event>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Events received so far.
    pub fn events(&self) -> Vec<Event> {
        self.events_lock().clone()
    }

    /// Number of seek events received.
    pub fn seek_count(&self) -> usize {
        self.events_lock()
            .iter()
            .filter(|event| matches!(event, Event::Seek(_)))
            .count()
    }
}

impl Default for TestUpstream {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TestUpstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestUpstream")
            .field("accept", &self.accept.load(Ordering::SeqCst))
            .field("events", &self.events_lock().len())
            .field("reaction", &self.reaction.is_some())
            .finish()
    }
}

impl UpstreamPeer for TestUpstream {
    fn event(&self, event: Event) -> bool {
        self.events_lock().push(event.clone());
        if !self.accept.load(Ordering::SeqCst) {
            return false;
        }
        if let Some(reaction) = &self.reaction {
            reaction(&event);
        }
        true
    }
}
