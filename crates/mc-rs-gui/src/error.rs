//! GUI errors.

use mc_rs_plugin_api::HostError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuiError {
    #[error("slot {slot} is out of bounds for inventory size {size}")]
    SlotOutOfRange { slot: usize, size: usize },

    #[error("invalid row: {row} (gui has {rows} rows)")]
    RowOutOfRange { row: usize, rows: usize },

    #[error("rows must be between 1 and 6, got {0}")]
    InvalidRows(usize),

    #[error("navigation slots must be different (both {0})")]
    DuplicateNavigationSlot(usize),

    #[error("gui is closed and can no longer be configured")]
    Closed,

    #[error("cannot reopen a closed gui")]
    AlreadyClosed,

    #[error("host error: {0}")]
    Host(#[from] HostError),
}
