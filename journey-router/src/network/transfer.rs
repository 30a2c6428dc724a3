//! Pedestrian transfers between stops.

use crate::domain::{StopIdx, TransferIdx};

/// A walking connection from one stop to another.
///
/// Transfers come in symmetric pairs; each holds the index of its
/// counterpart so a backward search can walk the same edge in reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub from: StopIdx,
    pub to: StopIdx,
    /// Distance in meters.
    pub distance: u32,
    pub opposite: Option<TransferIdx>,
}
