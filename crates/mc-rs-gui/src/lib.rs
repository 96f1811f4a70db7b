//! Paginated container menus ("GUIs") for plugins.
//!
//! A [`GuiSession`] is one menu owned by one player. Configure it with
//! permanent items, pages and navigation, then [`GuiSession::open`] it. The
//! session registers itself as an inventory listener on the host, handles
//! clicks and closes, and tears itself down exactly once.

pub mod color;
pub mod config;
pub mod error;
pub mod layout;
pub mod registry;
pub mod session;

#[cfg(test)]
mod test_host;

pub use config::GuiConfig;
pub use error::GuiError;
pub use layout::{standard_slots, Action, ActionResult, SlotAction};
pub use registry::SessionRegistry;
pub use session::{GuiContext, GuiSession, SessionState};

/// Cells per container row.
pub const ROW_WIDTH: usize = 9;

/// Largest supported row count (a double chest).
pub const MAX_ROWS: usize = 6;
