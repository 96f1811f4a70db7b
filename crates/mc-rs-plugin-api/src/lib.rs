//! Plugin API: host capabilities, inventory events, and shared types for plugin authors.
//!
//! This crate defines the interface a plugin host implements so that plugins
//! can build container menus. It has no dependency on any host crate.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ─── Types ───────────────────────────────────────────────────────────────────

/// Information about an online player, passed to plugins.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginPlayer {
    pub name: String,
    pub uuid: Uuid,
}

/// An item as plugins see it (decoupled from the wire `ItemStack`).
///
/// `identifier == "minecraft:air"` or `count == 0` means the cell is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginItem {
    /// Namespaced item identifier (e.g. "minecraft:diamond").
    pub identifier: String,
    #[serde(default = "default_count")]
    pub count: u8,
    /// Custom display name shown instead of the item's default name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub lore: Vec<String>,
}

fn default_count() -> u8 {
    1
}

impl PluginItem {
    /// Create a single item with no custom name or lore.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            count: 1,
            name: None,
            lore: Vec::new(),
        }
    }

    /// Set the display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the stack size.
    pub fn with_count(mut self, count: u8) -> Self {
        self.count = count;
        self
    }

    /// Append a lore line.
    pub fn with_lore(mut self, line: impl Into<String>) -> Self {
        self.lore.push(line.into());
        self
    }

    /// Whether this item renders as an empty cell.
    pub fn is_air(&self) -> bool {
        self.count == 0 || self.identifier == "minecraft:air" || self.identifier == "air"
    }
}

/// Handle to a host-side container. Two handles are the same container iff equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(pub u64);

/// Handle to a registered inventory listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Handle to a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u32);

/// A callback run by the host scheduler on the main execution context.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Result of dispatching an event to a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Continue normal handling.
    Continue,
    /// Event was cancelled by this listener; the host skips its default behavior.
    Cancelled,
}

/// Host-side failures surfaced to plugins.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("unknown container: {0:?}")]
    UnknownContainer(ContainerId),

    #[error("slot {slot} is out of bounds for container size {size}")]
    SlotOutOfBounds { slot: usize, size: usize },

    #[error("unknown player: {0}")]
    UnknownPlayer(Uuid),

    #[error("invalid container size: {0}")]
    InvalidSize(usize),
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// Inventory and presence events delivered to registered listeners.
#[derive(Debug, Clone)]
pub enum InventoryEvent {
    /// A player clicked a cell while viewing a container.
    Click {
        player: Uuid,
        /// The container shown at the top of the player's view.
        view_top: Option<ContainerId>,
        /// The container that owns the clicked cell (`None` = outside any container).
        clicked: Option<ContainerId>,
        /// Raw slot index within `clicked`.
        slot: i32,
        /// The item currently in the clicked cell.
        current_item: Option<PluginItem>,
    },
    /// A player dragged an item across one or more cells.
    Drag {
        player: Uuid,
        view_top: Option<ContainerId>,
        slots: Vec<usize>,
    },
    /// A player's view of a container closed (ESC, swap, or forced).
    Close { player: Uuid, container: ContainerId },
    /// A player disconnected.
    PlayerQuit { player: Uuid },
}

impl InventoryEvent {
    /// The player this event concerns.
    pub fn player(&self) -> Uuid {
        match self {
            InventoryEvent::Click { player, .. }
            | InventoryEvent::Drag { player, .. }
            | InventoryEvent::Close { player, .. }
            | InventoryEvent::PlayerQuit { player } => *player,
        }
    }

    /// Whether a listener can cancel this event.
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            InventoryEvent::Click { .. } | InventoryEvent::Drag { .. }
        )
    }
}

/// Receives inventory events from the host. Return `Cancelled` to suppress
/// the host's default handling of cancellable events.
pub trait InventoryListener: Send + Sync {
    fn on_inventory_event(&self, event: &InventoryEvent) -> EventResult;
}

// ─── Server API ──────────────────────────────────────────────────────────────

/// Access to the host's containers, player views, scheduler and listeners.
///
/// Every method must be called from the host's main execution context.
/// `open_container` and `close_container` may dispatch `Close` events
/// synchronously before returning, so callers must not hold locks that their
/// own listeners need.
pub trait ServerApi: Send + Sync {
    // --- Players ---
    fn is_online(&self, player: Uuid) -> bool;

    // --- Containers ---
    fn create_container(&self, size: usize, title: &str) -> Result<ContainerId, HostError>;
    fn set_slot(
        &self,
        container: ContainerId,
        slot: usize,
        item: Option<PluginItem>,
    ) -> Result<(), HostError>;
    fn get_slot(&self, container: ContainerId, slot: usize) -> Option<PluginItem>;
    fn clear_container(&self, container: ContainerId);
    /// The owner is done with `container`. The host may drop it once no
    /// player is viewing it.
    fn release_container(&self, container: ContainerId);

    // --- Views ---
    fn open_container(&self, player: Uuid, container: ContainerId) -> Result<(), HostError>;
    /// The container at the top of the player's current view, if any.
    fn top_container(&self, player: Uuid) -> Option<ContainerId>;
    fn close_container(&self, player: Uuid);
    /// Resend the player's view contents.
    fn update_inventory(&self, player: Uuid);

    // --- Feedback ---
    fn play_sound(&self, player: Uuid, sound: &str, volume: f32, pitch: f32);

    // --- Scheduler ---
    /// Run `task` on the next tick.
    fn run_task(&self, task: Task) -> TaskId {
        self.run_task_later(0, task)
    }
    fn run_task_later(&self, delay_ticks: u64, task: Task) -> TaskId;
    fn cancel_task(&self, task: TaskId);

    // --- Listeners ---
    fn register_listener(&self, listener: Arc<dyn InventoryListener>) -> ListenerId;
    fn unregister_listener(&self, listener: ListenerId);
}

// ─── Tests ───────────────────────────────────────────────────────────────────
