//! GUI sessions: one menu, one player, one teardown.
//!
//! A session moves `Unopened → Open → Closed`. `Closed` is terminal and can be
//! reached from any state through cleanup, which runs at most once no matter
//! which trigger fires first (explicit close, the player closing the view,
//! disconnect, or a newer session for the same player).

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use mc_rs_plugin_api::{
    ContainerId, EventResult, InventoryEvent, InventoryListener, ListenerId, PluginItem, ServerApi,
    TaskId,
};
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::color::translate_color_codes;
use crate::config::GuiConfig;
use crate::error::GuiError;
use crate::layout::{Action, ActionResult, Layout, SlotAction};
use crate::registry::SessionRegistry;
use crate::MAX_ROWS;

// ─── Context ─────────────────────────────────────────────────────────────────

/// What every session needs from its plugin: the host, the shared registry,
/// and configuration.
#[derive(Clone)]
pub struct GuiContext {
    pub host: Arc<dyn ServerApi>,
    pub registry: SessionRegistry,
    pub config: Arc<GuiConfig>,
}

impl GuiContext {
    /// Create a context with a fresh, empty registry.
    pub fn new(host: Arc<dyn ServerApi>, config: GuiConfig) -> Self {
        Self {
            host,
            registry: SessionRegistry::new(),
            config: Arc::new(config),
        }
    }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unopened,
    Open,
    Closed,
}

/// Shared handle to one player's menu. Cloning yields the same session.
#[derive(Clone)]
pub struct GuiSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    ctx: GuiContext,
    player: Uuid,
    title: String,
    rows: usize,
    data: Mutex<SessionData>,
}

struct SessionData {
    state: SessionState,
    layout: Layout,
    container: Option<ContainerId>,
    listener: Option<ListenerId>,
    close_task: Option<TaskId>,
}

impl fmt::Debug for GuiSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuiSession")
            .field("player", &self.inner.player)
            .field("title", &self.inner.title)
            .field("rows", &self.inner.rows)
            .field("state", &self.state())
            .finish()
    }
}

impl GuiSession {
    /// Create an unopened session for `player` with `rows` rows (1–6).
    ///
    /// `title` may use the configured alternate color code character.
    pub fn new(
        ctx: &GuiContext,
        player: Uuid,
        title: &str,
        rows: usize,
    ) -> Result<Self, GuiError> {
        if !(1..=MAX_ROWS).contains(&rows) {
            return Err(GuiError::InvalidRows(rows));
        }
        Ok(Self {
            inner: Arc::new(SessionInner {
                ctx: ctx.clone(),
                player,
                title: translate_color_codes(ctx.config.color_char, title),
                rows,
                data: Mutex::new(SessionData {
                    state: SessionState::Unopened,
                    layout: Layout::new(rows),
                    container: None,
                    listener: None,
                    close_task: None,
                }),
            }),
        })
    }

    fn data(&self) -> MutexGuard<'_, SessionData> {
        self.inner.data.lock()
    }

    fn host(&self) -> &Arc<dyn ServerApi> {
        &self.inner.ctx.host
    }

    fn downgrade(&self) -> Weak<SessionInner> {
        Arc::downgrade(&self.inner)
    }

    fn upgrade(weak: &Weak<SessionInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    // --- Accessors ---

    pub fn player(&self) -> Uuid {
        self.inner.player
    }

    /// Title with color codes already translated.
    pub fn title(&self) -> &str {
        &self.inner.title
    }

    pub fn rows(&self) -> usize {
        self.inner.rows
    }

    pub fn size(&self) -> usize {
        self.inner.rows * crate::ROW_WIDTH
    }

    pub fn state(&self) -> SessionState {
        self.data().state
    }

    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed
    }

    /// The live host container, while open.
    pub fn container(&self) -> Option<ContainerId> {
        self.data().container
    }

    pub fn current_page(&self) -> usize {
        self.data().layout.current_page()
    }

    pub fn total_pages(&self) -> usize {
        self.data().layout.total_pages()
    }

    /// Whether both handles refer to the same session.
    pub fn same_session(&self, other: &GuiSession) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // --- Configuration ---

    fn configure(
        &self,
        f: impl FnOnce(&mut Layout) -> Result<(), GuiError>,
    ) -> Result<&Self, GuiError> {
        let mut data = self.data();
        if data.state == SessionState::Closed {
            return Err(GuiError::Closed);
        }
        f(&mut data.layout)?;
        Ok(self)
    }

    /// Set a permanent item. Any click action at the slot is kept; `None`
    /// clears both item and action.
    pub fn set_item(
        &self,
        slot: usize,
        item: impl Into<Option<PluginItem>>,
    ) -> Result<&Self, GuiError> {
        let item = item.into();
        self.configure(|layout| layout.set_item(slot, item))
    }

    /// Set a permanent item that runs `action` when clicked.
    pub fn set_item_with_action<F>(
        &self,
        slot: usize,
        item: impl Into<Option<PluginItem>>,
        action: F,
    ) -> Result<&Self, GuiError>
    where
        F: Fn() -> ActionResult + Send + Sync + 'static,
    {
        let item = item.into();
        let action = SlotAction::Run(Arc::new(action));
        self.configure(|layout| layout.set_item_with_action(slot, item, Some(action)))
    }

    /// Put `item` on every border slot. `None` does nothing.
    pub fn fill_border(&self, item: impl Into<Option<PluginItem>>) -> Result<&Self, GuiError> {
        let item = item.into();
        self.configure(|layout| {
            if let Some(item) = &item {
                layout.fill_border(item);
            }
            Ok(())
        })
    }

    /// Put `item` on every slot of `row`.
    pub fn fill_row(
        &self,
        row: usize,
        item: impl Into<Option<PluginItem>>,
    ) -> Result<&Self, GuiError> {
        let item = item.into();
        self.configure(|layout| layout.fill_row(row, item.as_ref()))
    }

    /// Append an empty page.
    pub fn add_page(&self) -> Result<&Self, GuiError> {
        self.configure(|layout| {
            layout.add_page();
            Ok(())
        })
    }

    /// Set an item shown only on `page`, creating pages up to it as needed.
    pub fn set_page_item(
        &self,
        page: usize,
        slot: usize,
        item: impl Into<Option<PluginItem>>,
    ) -> Result<&Self, GuiError> {
        let item = item.into();
        self.configure(|layout| layout.set_page_item(page, slot, item))
    }

    /// Set an item shown only on `page` that runs `action` when clicked.
    pub fn set_page_item_with_action<F>(
        &self,
        page: usize,
        slot: usize,
        item: impl Into<Option<PluginItem>>,
        action: F,
    ) -> Result<&Self, GuiError>
    where
        F: Fn() -> ActionResult + Send + Sync + 'static,
    {
        let item = item.into();
        let action = SlotAction::Run(Arc::new(action));
        self.configure(|layout| layout.set_page_item_with_action(page, slot, item, Some(action)))
    }

    /// Install previous/next page buttons.
    ///
    /// A button is shown only when there is a page in its direction; otherwise
    /// the permanent item at that slot (if any) shows through.
    pub fn set_navigation(
        &self,
        prev_slot: usize,
        prev_item: impl Into<Option<PluginItem>>,
        next_slot: usize,
        next_item: impl Into<Option<PluginItem>>,
    ) -> Result<&Self, GuiError> {
        let (prev_item, next_item) = (prev_item.into(), next_item.into());
        self.configure(|layout| layout.set_navigation(prev_slot, prev_item, next_slot, next_item))
    }

    /// A permanent button that closes the GUI, then runs `follow_up` on the
    /// next tick (for example to open a parent menu).
    pub fn set_back_button(
        &self,
        slot: usize,
        item: impl Into<Option<PluginItem>>,
        follow_up: Option<Action>,
    ) -> Result<&Self, GuiError> {
        let item = item.into();
        self.configure(|layout| {
            layout.set_item_with_action(slot, item, Some(SlotAction::Back(follow_up)))
        })
    }

    // --- Lifecycle ---

    /// Build the container and show it to the player on the next tick.
    ///
    /// Any other session open for the same player is force-closed once the new
    /// container is built, so a host failure leaves the old one in place. Does
    /// nothing if the player is offline.
    pub fn open(&self) -> Result<(), GuiError> {
        if self.is_closed() {
            return Err(GuiError::AlreadyClosed);
        }
        let host = Arc::clone(self.host());
        let player = self.player();
        if !host.is_online(player) {
            debug!("Not opening GUI '{}': player {player} is offline", self.title());
            return Ok(());
        }

        let cells = {
            let mut data = self.data();
            data.layout.ensure_first_page();
            data.layout.compose()
        };
        let container = host.create_container(self.size(), self.title())?;
        if let Err(e) = self.write_cells(container, cells) {
            host.release_container(container);
            return Err(e);
        }

        if let Some(existing) = self.inner.ctx.registry.get(player) {
            if !existing.same_session(self) {
                debug!("Replacing GUI '{}' for {player}", existing.title());
                existing.force_close();
            }
        }

        let needs_listener = self.data().listener.is_none();
        if needs_listener {
            let listener = host.register_listener(Arc::new(SessionListener {
                session: self.downgrade(),
            }));
            self.data().listener = Some(listener);
        }

        let replaced = {
            let mut data = self.data();
            data.state = SessionState::Open;
            data.container.replace(container)
        };
        if let Some(replaced) = replaced {
            host.release_container(replaced);
        }
        self.inner.ctx.registry.insert(self.clone());
        self.play_sound(&self.inner.ctx.config.sounds.open);

        let weak = self.downgrade();
        host.run_task(Box::new(move || {
            if let Some(session) = Self::upgrade(&weak) {
                session.show(container);
            }
        }));
        Ok(())
    }

    fn show(&self, container: ContainerId) {
        if self.is_closed() || self.container() != Some(container) {
            return;
        }
        let player = self.player();
        if !self.host().is_online(player) {
            return;
        }
        if let Err(e) = self.host().open_container(player, container) {
            error!("Failed to show GUI '{}' to {player}: {e}", self.title());
        }
    }

    /// Close the player's view on the next tick and tear the session down now.
    pub fn close(&self) {
        let container = {
            let data = self.data();
            if data.state == SessionState::Closed {
                return;
            }
            data.container
        };
        let player = self.player();
        if let Some(container) = container {
            if self.host().is_online(player) {
                let host = Arc::clone(self.host());
                self.host().run_task(Box::new(move || {
                    if host.top_container(player) == Some(container) {
                        host.close_container(player);
                    }
                }));
            }
        }
        self.cleanup();
    }

    /// Close the player's view immediately (if it shows this GUI) and tear down.
    pub(crate) fn force_close(&self) {
        let player = self.player();
        if let Some(container) = self.container() {
            let host = self.host();
            if host.is_online(player) && host.top_container(player) == Some(container) {
                host.close_container(player);
            }
        }
        self.cleanup();
    }

    /// Re-render if the player is looking at this GUI; tear down if they left.
    pub fn refresh(&self) -> Result<(), GuiError> {
        if self.is_closed() || self.container().is_none() {
            return Ok(());
        }
        if !self.host().is_online(self.player()) {
            self.cleanup();
            return Ok(());
        }
        self.render()
    }

    /// Redraw the current page. Skipped when the player is viewing something else.
    pub fn render(&self) -> Result<(), GuiError> {
        let (container, cells) = {
            let data = self.data();
            if data.state != SessionState::Open {
                return Ok(());
            }
            let Some(container) = data.container else {
                return Ok(());
            };
            (container, data.layout.compose())
        };
        let player = self.player();
        if self.host().top_container(player) != Some(container) {
            debug!("Skipping render of '{}': {player} is not viewing it", self.title());
            return Ok(());
        }
        self.write_cells(container, cells)?;
        self.host().update_inventory(player);
        Ok(())
    }

    fn write_cells(
        &self,
        container: ContainerId,
        cells: Vec<Option<PluginItem>>,
    ) -> Result<(), GuiError> {
        let host = self.host();
        host.clear_container(container);
        for (slot, cell) in cells.into_iter().enumerate() {
            if let Some(item) = cell {
                host.set_slot(container, slot, Some(item))?;
            }
        }
        Ok(())
    }

    /// Tear down: unregister, cancel the pending close task, leave the registry.
    ///
    /// Only the first call has any effect.
    fn cleanup(&self) {
        let (container, listener, close_task, actions) = {
            let mut data = self.data();
            if data.state == SessionState::Closed {
                return;
            }
            data.state = SessionState::Closed;
            (
                data.container.take(),
                data.listener.take(),
                data.close_task.take(),
                data.layout.take_actions(),
            )
        };
        self.inner.ctx.registry.remove(self);
        let host = self.host();
        if let Some(task) = close_task {
            host.cancel_task(task);
        }
        if let Some(listener) = listener {
            host.unregister_listener(listener);
        }
        if let Some(container) = container {
            host.release_container(container);
        }
        drop(actions);
        debug!("GUI '{}' for {} cleaned up", self.title(), self.player());
    }

    // --- Event handling ---

    fn handle_click(
        &self,
        view_top: Option<ContainerId>,
        clicked: Option<ContainerId>,
        slot: i32,
        current_item: Option<&PluginItem>,
    ) -> EventResult {
        let (slot, action) = {
            let data = self.data();
            let Some(container) = data.container else {
                return EventResult::Continue;
            };
            if data.state != SessionState::Open || view_top != Some(container) {
                return EventResult::Continue;
            }
            // From here on the host must not move items in our container.
            if clicked != Some(container) {
                return EventResult::Cancelled;
            }
            if current_item.map_or(true, PluginItem::is_air) {
                return EventResult::Cancelled;
            }
            let slot = match usize::try_from(slot) {
                Ok(slot) if slot < data.layout.size() => slot,
                _ => return EventResult::Cancelled,
            };
            (slot, data.layout.resolve_action(slot))
        };

        self.play_sound(&self.inner.ctx.config.sounds.click);
        if let Some(action) = action {
            self.run_action(slot, action);
        }
        EventResult::Cancelled
    }

    fn run_action(&self, slot: usize, action: SlotAction) {
        match action {
            SlotAction::Run(action) => invoke_guarded(self.player(), slot, &action),
            SlotAction::PreviousPage => self.turn_page(Layout::previous_page),
            SlotAction::NextPage => self.turn_page(Layout::next_page),
            SlotAction::Back(follow_up) => {
                self.close();
                if let Some(follow_up) = follow_up {
                    let player = self.player();
                    self.host().run_task(Box::new(move || {
                        invoke_guarded(player, slot, &follow_up);
                    }));
                }
            }
        }
    }

    fn turn_page(&self, step: fn(&mut Layout) -> bool) {
        let moved = {
            let mut data = self.data();
            data.state == SessionState::Open && step(&mut data.layout)
        };
        if moved {
            self.play_sound(&self.inner.ctx.config.sounds.page_turn);
            if let Err(e) = self.render() {
                error!("Failed to render GUI '{}': {e}", self.title());
            }
        }
    }

    fn handle_drag(&self, view_top: Option<ContainerId>) -> EventResult {
        let data = self.data();
        match data.container {
            Some(container)
                if data.state == SessionState::Open && view_top == Some(container) =>
            {
                EventResult::Cancelled
            }
            _ => EventResult::Continue,
        }
    }

    /// The player's view of `container` closed: clean up after the configured delay.
    fn handle_close(&self, container: ContainerId) {
        {
            let data = self.data();
            if data.state == SessionState::Closed
                || data.container != Some(container)
                || data.close_task.is_some()
            {
                return;
            }
        }
        let weak = self.downgrade();
        let task = self.host().run_task_later(
            self.inner.ctx.config.close_delay_ticks,
            Box::new(move || {
                if let Some(session) = Self::upgrade(&weak) {
                    session.data().close_task = None;
                    session.cleanup();
                }
            }),
        );
        let mut data = self.data();
        if data.state != SessionState::Closed {
            data.close_task = Some(task);
        }
    }

    fn play_sound(&self, sound: &str) {
        let sounds = &self.inner.ctx.config.sounds;
        let player = self.player();
        if !sounds.enabled || !self.host().is_online(player) {
            return;
        }
        self.host()
            .play_sound(player, sound, sounds.volume, sounds.pitch);
    }
}

/// Run a caller action, logging instead of propagating failures and panics.
fn invoke_guarded(player: Uuid, slot: usize, action: &Action) {
    match panic::catch_unwind(AssertUnwindSafe(|| action())) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Error executing GUI action (player {player}, slot {slot}): {e}"),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            warn!("GUI action panicked (player {player}, slot {slot}): {message}");
        }
    }
}

// ─── Listener ────────────────────────────────────────────────────────────────

/// Host-facing listener. Holds the session weakly so the host never keeps a
/// finished session alive.
struct SessionListener {
    session: Weak<SessionInner>,
}

impl InventoryListener for SessionListener {
    fn on_inventory_event(&self, event: &InventoryEvent) -> EventResult {
        let Some(session) = GuiSession::upgrade(&self.session) else {
            return EventResult::Continue;
        };
        if event.player() != session.player() {
            return EventResult::Continue;
        }
        match event {
            InventoryEvent::Click {
                view_top,
                clicked,
                slot,
                current_item,
                ..
            } => session.handle_click(*view_top, *clicked, *slot, current_item.as_ref()),
            InventoryEvent::Drag { view_top, .. } => session.handle_drag(*view_top),
            InventoryEvent::Close { container, .. } => {
                session.handle_close(*container);
                EventResult::Continue
            }
            InventoryEvent::PlayerQuit { .. } => {
                session.cleanup();
                EventResult::Continue
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
