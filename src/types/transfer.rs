//! Transport-side completion status of an isochronous transfer

use serde::{Deserialize, Serialize};

/// Status the transport reports for a retired transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    /// All packets arrived; payload is valid.
    Completed,
    /// The device went away.
    Disconnected,
    /// The transfer was killed by the host (capture stopped).
    Cancelled,
    /// The connection was reset.
    Reset,
    /// The host controller is shutting down.
    Shutdown,
    /// Any other transport error code.
    Failed(i32),
}

impl TransferStatus {
    /// Statuses that mean the stream is being torn down, not that data was lost.
    pub fn is_teardown(self) -> bool {
        matches!(
            self,
            TransferStatus::Disconnected
                | TransferStatus::Cancelled
                | TransferStatus::Reset
                | TransferStatus::Shutdown
        )
    }
}

/// What the transport should do with a transfer after the pipeline saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferAction {
    /// Hand the transfer back to the device for the next interval.
    Resubmit,
    /// Leave the transfer idle.
    Retire,
}
