//! Pad and peer types shared by the aggregator and its neighbours.
//!
//! - [`PadTemplate`], [`PadDirection`], [`PadPresence`]: how pads are named
//! - [`PadId`]: stable identifier of a sink pad
//! - [`DownstreamPeer`], [`UpstreamPeer`]: the elements on either side

mod pad;
mod peer;

pub use pad::{PadDirection, PadId, PadPresence, PadTemplate};
pub use peer::{DownstreamPeer, UpstreamPeer};
