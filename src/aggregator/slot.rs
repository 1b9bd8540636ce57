//! Single-buffer rendezvous cell of a sink pad.

use crate::buffer::Buffer;

/// Holds at most one pending buffer plus the EOS and flushing flags.
///
/// A flushing slot never holds a buffer. `consumed` and `flush_epoch`
/// only ever grow; a waiting producer compares them against the values it
/// saw when depositing to learn whether its buffer was taken or flushed.
#[derive(Debug)]
pub(crate) struct Slot {
    pending: Option<Buffer>,
    eos: bool,
    flushing: bool,
    consumed: u64,
    flush_epoch: u64,
}

impl Slot {
    /// New slots start flushing until their pad is activated.
    pub(crate) fn new() -> Self {
        Self {
            pending: None,
            eos: false,
            flushing: true,
            consumed: 0,
            flush_epoch: 0,
        }
    }

    #[inline]
    pub(crate) fn is_ready(&self) -> bool {
        self.pending.is_some() || self.eos
    }

    #[inline]
    pub(crate) fn is_occupied(&self) -> bool {
        self.pending.is_some()
    }

    #[inline]
    pub(crate) fn is_eos(&self) -> bool {
        self.eos
    }

    #[inline]
    pub(crate) fn is_flushing(&self) -> bool {
        self.flushing
    }

    #[inline]
    pub(crate) fn consumed(&self) -> u64 {
        self.consumed
    }

    #[inline]
    pub(crate) fn flush_epoch(&self) -> u64 {
        self.flush_epoch
    }

    /// Store a buffer into an empty, non-flushing slot.
    pub(crate) fn store(&mut self, buffer: Buffer) {
        debug_assert!(!self.flushing, "storing into a flushing slot");
        debug_assert!(self.pending.is_none(), "slot already occupied");
        self.pending = Some(buffer);
    }

    /// Empty the slot, counting the consumption.
    pub(crate) fn take(&mut self) -> Option<Buffer> {
        let buffer = self.pending.take();
        if buffer.is_some() {
            self.consumed += 1;
        }
        buffer
    }

    pub(crate) fn set_eos(&mut self) {
        self.eos = true;
    }

    /// Enter flushing: discard the pending buffer and clear EOS.
    ///
    /// Returns the discarded buffer, if any.
    pub(crate) fn start_flush(&mut self) -> Option<Buffer> {
        self.flushing = true;
        self.eos = false;
        self.flush_epoch += 1;
        self.pending.take()
    }

    /// Leave flushing with a fresh stream state.
    pub(crate) fn stop_flush(&mut self) {
        self.flushing = false;
        self.eos = false;
    }
}
