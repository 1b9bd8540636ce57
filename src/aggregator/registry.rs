//! Dynamic sink pad registry.
//!
//! Request pads get monotonically increasing serials that are never reused,
//! so a stale [`PadHandle`] can never address a newer pad.

use super::coordinator::Inner;
use super::pad::{PadHandle, Port};
use crate::element::{PadId, PadTemplate};
use crate::error::{Error, Result};
use crate::observability::{record_buffer_flushed, record_pad_count};
use std::sync::Arc;
use tracing::debug;

/// Allocates pad serials and names from the sink template.
#[derive(Debug)]
pub(crate) struct PadRegistry {
    template: PadTemplate,
    next_serial: u32,
}

impl PadRegistry {
    pub(crate) fn new(template: PadTemplate) -> Self {
        Self {
            template,
            next_serial: 0,
        }
    }

    /// Allocate the next serial, or the one encoded in `requested`.
    ///
    /// A requested serial is honoured only if it was never issued; the
    /// counter then continues after it.
    pub(crate) fn allocate(&mut self, requested: Option<&str>) -> Result<(PadId, String)> {
        let serial = match requested {
            None => self.next_serial,
            Some(name) => {
                let serial = self.template.parse_serial(name).ok_or_else(|| {
                    Error::InvalidPadName(format!(
                        "'{}' does not match template '{}'",
                        name, self.template.name
                    ))
                })?;
                if serial < self.next_serial {
                    return Err(Error::InvalidPadName(format!(
                        "'{name}' was already issued"
                    )));
                }
                serial
            }
        };

        self.next_serial = serial.checked_add(1).ok_or_else(|| {
            Error::InvalidPadName(format!(
                "pad serials exhausted for template '{}'",
                self.template.name
            ))
        })?;
        Ok((PadId::new(serial), self.template.pad_name(serial)))
    }
}

impl Inner {
    /// Register a new sink pad.
    ///
    /// The pad is usable immediately if the aggregator is active, otherwise
    /// it stays flushing until activation.
    pub(crate) fn add_port(self: &Arc<Self>, requested: Option<&str>) -> Result<PadHandle> {
        let mut guard = self.lock();
        let core = &mut guard.core;
        let (id, name) = core.registry.allocate(requested)?;
        let name: Arc<str> = Arc::from(name);

        let mut port = Port::new(Arc::clone(&name));
        if core.active {
            port.slot.stop_flush();
        }
        core.ports.insert(id, port);
        core.bump();
        self.changed.notify_one();
        record_pad_count(&self.name, core.ports.len());
        debug!(aggregator = %self.name, pad = %name, active = core.active, "adding pad");

        Ok(PadHandle::new(id, name, Arc::downgrade(self)))
    }

    /// Unregister a sink pad, releasing any producer blocked on it.
    pub(crate) fn remove_port(self: &Arc<Self>, pad: PadId) -> Result<()> {
        let mut guard = self.lock();
        let core = &mut guard.core;
        let Some(mut port) = core.ports.remove(&pad) else {
            return Err(Error::PadNotFound(pad));
        };

        if port.slot.start_flush().is_some() {
            record_buffer_flushed(&self.name);
        }
        port.waiters.notify_all();
        core.bump();
        self.changed.notify_one();
        record_pad_count(&self.name, core.ports.len());
        debug!(aggregator = %self.name, pad = %port.name, "removing pad");

        self.maybe_close_barrier(guard);
        Ok(())
    }
}
