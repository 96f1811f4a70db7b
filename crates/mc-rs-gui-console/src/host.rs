//! In-memory host: players, containers, a tick scheduler, and listener dispatch.
//!
//! Stands in for the game server so menus can be driven from the console.
//! Every method runs on the console's main loop, which plays the role of the
//! server's main thread.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use mc_rs_gui::color::strip_color;
use mc_rs_plugin_api::{
    ContainerId, EventResult, HostError, InventoryEvent, InventoryListener, ListenerId,
    PluginItem, PluginPlayer, ServerApi, Task, TaskId,
};
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

// ─── Types ───────────────────────────────────────────────────────────────────

/// A one-shot task waiting for its tick.
struct ScheduledTask {
    id: TaskId,
    remaining_ticks: u64,
    task: Task,
}

struct Container {
    title: String,
    cells: Vec<Option<PluginItem>>,
}

struct PlayerState {
    name: String,
    online: bool,
    /// Container at the top of the player's view.
    top: Option<ContainerId>,
    /// Item picked up by an uncancelled click.
    cursor: Option<PluginItem>,
}

#[derive(Default)]
struct HostState {
    current_tick: u64,
    next_container_id: u64,
    next_listener_id: u64,
    next_task_id: u32,
    players: HashMap<Uuid, PlayerState>,
    containers: HashMap<ContainerId, Container>,
    /// Released by their owner but still on someone's screen.
    released: HashSet<ContainerId>,
    listeners: Vec<(ListenerId, Arc<dyn InventoryListener>)>,
    tasks: Vec<ScheduledTask>,
}

impl HostState {
    /// Drop `container` if its owner released it and nobody views it anymore.
    fn evict_if_released(&mut self, container: ContainerId) {
        let viewed = self.players.values().any(|p| p.top == Some(container));
        if !viewed && self.released.remove(&container) {
            self.containers.remove(&container);
            debug!("Dropped released container {container:?}");
        }
    }
}

// ─── MemoryHost ──────────────────────────────────────────────────────────────

/// A `ServerApi` backed by plain maps.
#[derive(Default)]
pub struct MemoryHost {
    state: Mutex<HostState>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock()
    }

    // --- Players ---

    /// Bring a player online, reusing their UUID if they were seen before.
    pub fn join(&self, name: &str) -> PluginPlayer {
        let mut state = self.state();
        let existing = state
            .players
            .iter()
            .find(|(_, p)| p.name.eq_ignore_ascii_case(name))
            .map(|(uuid, _)| *uuid);
        let uuid = match existing {
            Some(uuid) => {
                if let Some(player) = state.players.get_mut(&uuid) {
                    player.online = true;
                }
                uuid
            }
            None => {
                let uuid = Uuid::new_v4();
                state.players.insert(
                    uuid,
                    PlayerState {
                        name: name.to_string(),
                        online: true,
                        top: None,
                        cursor: None,
                    },
                );
                uuid
            }
        };
        info!("{name} joined ({uuid})");
        PluginPlayer {
            name: name.to_string(),
            uuid,
        }
    }

    /// Disconnect a player and notify listeners.
    pub fn quit(&self, player: Uuid) {
        {
            let mut state = self.state();
            let Some(p) = state.players.get_mut(&player) else {
                return;
            };
            if !p.online {
                return;
            }
            p.online = false;
            p.cursor = None;
            info!("{} left", p.name);
            if let Some(top) = p.top.take() {
                state.evict_if_released(top);
            }
        }
        self.dispatch(&InventoryEvent::PlayerQuit { player });
    }

    pub fn find_player(&self, name: &str) -> Option<PluginPlayer> {
        self.state()
            .players
            .iter()
            .find(|(_, p)| p.name.eq_ignore_ascii_case(name))
            .map(|(uuid, p)| PluginPlayer {
                name: p.name.clone(),
                uuid: *uuid,
            })
    }

    pub fn online_players(&self) -> Vec<PluginPlayer> {
        let mut players: Vec<PluginPlayer> = self
            .state()
            .players
            .iter()
            .filter(|(_, p)| p.online)
            .map(|(uuid, p)| PluginPlayer {
                name: p.name.clone(),
                uuid: *uuid,
            })
            .collect();
        players.sort_by(|a, b| a.name.cmp(&b.name));
        players
    }

    pub fn cursor(&self, player: Uuid) -> Option<PluginItem> {
        self.state()
            .players
            .get(&player)
            .and_then(|p| p.cursor.clone())
    }

    // --- Input ---

    /// Click `slot` of the player's top container.
    ///
    /// If no listener cancels the click the item is picked up, which is what a
    /// real client would do.
    pub fn click(&self, player: Uuid, slot: usize) -> EventResult {
        let (top, current_item) = {
            let state = self.state();
            let top = state.players.get(&player).and_then(|p| p.top);
            let item = top
                .and_then(|c| state.containers.get(&c))
                .and_then(|c| c.cells.get(slot).cloned().flatten());
            (top, item)
        };
        let clicked = top.filter(|c| {
            self.state()
                .containers
                .get(c)
                .is_some_and(|c| slot < c.cells.len())
        });
        let result = self.dispatch(&InventoryEvent::Click {
            player,
            view_top: top,
            clicked,
            slot: slot as i32,
            current_item,
        });

        if result == EventResult::Continue {
            if let Some(container) = clicked {
                let mut state = self.state();
                let taken = state
                    .containers
                    .get_mut(&container)
                    .and_then(|c| c.cells.get_mut(slot))
                    .and_then(Option::take);
                if let (Some(item), Some(p)) = (taken, state.players.get_mut(&player)) {
                    debug!("{} picked up {}", p.name, item.identifier);
                    p.cursor = Some(item);
                }
            }
        }
        result
    }

    pub fn drag(&self, player: Uuid, slots: Vec<usize>) -> EventResult {
        let top = self.top_container(player);
        self.dispatch(&InventoryEvent::Drag {
            player,
            view_top: top,
            slots,
        })
    }

    /// The player presses ESC.
    pub fn escape(&self, player: Uuid) {
        self.close_container(player);
    }

    // --- Dispatch ---

    /// Deliver an event to every listener. A cancellable event stops at the
    /// first listener that cancels it.
    pub fn dispatch(&self, event: &InventoryEvent) -> EventResult {
        // Listeners may (un)register while handling, so iterate over a snapshot.
        let listeners: Vec<Arc<dyn InventoryListener>> = self
            .state()
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        let cancellable = event.is_cancellable();
        for listener in listeners {
            if listener.on_inventory_event(event) == EventResult::Cancelled && cancellable {
                return EventResult::Cancelled;
            }
        }
        EventResult::Continue
    }

    // --- Scheduler ---

    /// Advance one tick. Returns how many tasks fired.
    pub fn tick(&self) -> usize {
        let fired: Vec<Task> = {
            let mut state = self.state();
            state.current_tick += 1;

            let mut fired = Vec::new();
            let mut waiting = Vec::with_capacity(state.tasks.len());
            for mut task in state.tasks.drain(..) {
                if task.remaining_ticks > 0 {
                    task.remaining_ticks -= 1;
                }
                if task.remaining_ticks == 0 {
                    fired.push(task.task);
                } else {
                    waiting.push(task);
                }
            }
            state.tasks = waiting;
            fired
        };

        // Run outside the lock: tasks call back into the host.
        let count = fired.len();
        for task in fired {
            task();
        }
        count
    }

    pub fn current_tick(&self) -> u64 {
        self.state().current_tick
    }

    pub fn pending_tasks(&self) -> usize {
        self.state().tasks.len()
    }

    pub fn listener_count(&self) -> usize {
        self.state().listeners.len()
    }

    pub fn container_count(&self) -> usize {
        self.state().containers.len()
    }

    // --- Display ---

    /// Text rendering of what the player currently sees.
    pub fn render_view(&self, player: Uuid) -> Option<String> {
        let state = self.state();
        let container = state.players.get(&player)?.top?;
        let c = state.containers.get(&container)?;
        let mut out = format!("[{}]\n", strip_color(&c.title));
        for row in c.cells.chunks(9) {
            let line: Vec<String> = row.iter().map(cell_label).collect();
            out.push_str(&line.join(" "));
            out.push('\n');
        }
        Some(out)
    }
}

fn cell_label(cell: &Option<PluginItem>) -> String {
    let label = match cell {
        None => ".".to_string(),
        Some(item) => {
            let name = item.name.as_deref().map(strip_color).unwrap_or_else(|| {
                item.identifier
                    .trim_start_matches("minecraft:")
                    .to_string()
            });
            if item.count > 1 {
                format!("{name}x{}", item.count)
            } else {
                name
            }
        }
    };
    format!("{:<12.12}", label)
}

// ─── ServerApi ───────────────────────────────────────────────────────────────

impl ServerApi for MemoryHost {
    fn is_online(&self, player: Uuid) -> bool {
        self.state().players.get(&player).is_some_and(|p| p.online)
    }

    fn create_container(&self, size: usize, title: &str) -> Result<ContainerId, HostError> {
        if size == 0 || size % 9 != 0 {
            return Err(HostError::InvalidSize(size));
        }
        let mut state = self.state();
        state.next_container_id += 1;
        let id = ContainerId(state.next_container_id);
        state.containers.insert(
            id,
            Container {
                title: title.to_string(),
                cells: vec![None; size],
            },
        );
        debug!("Created container {id:?} '{title}' ({size} slots)");
        Ok(id)
    }

    fn set_slot(
        &self,
        container: ContainerId,
        slot: usize,
        item: Option<PluginItem>,
    ) -> Result<(), HostError> {
        let mut state = self.state();
        let c = state
            .containers
            .get_mut(&container)
            .ok_or(HostError::UnknownContainer(container))?;
        let size = c.cells.len();
        let cell = c
            .cells
            .get_mut(slot)
            .ok_or(HostError::SlotOutOfBounds { slot, size })?;
        *cell = item;
        Ok(())
    }

    fn get_slot(&self, container: ContainerId, slot: usize) -> Option<PluginItem> {
        self.state()
            .containers
            .get(&container)
            .and_then(|c| c.cells.get(slot).cloned().flatten())
    }

    fn clear_container(&self, container: ContainerId) {
        if let Some(c) = self.state().containers.get_mut(&container) {
            c.cells.iter_mut().for_each(|cell| *cell = None);
        }
    }

    fn release_container(&self, container: ContainerId) {
        let mut state = self.state();
        if state.containers.contains_key(&container) {
            state.released.insert(container);
            state.evict_if_released(container);
        }
    }

    fn open_container(&self, player: Uuid, container: ContainerId) -> Result<(), HostError> {
        let previous = {
            let mut state = self.state();
            if !state.containers.contains_key(&container) {
                return Err(HostError::UnknownContainer(container));
            }
            let p = state
                .players
                .get_mut(&player)
                .ok_or(HostError::UnknownPlayer(player))?;
            p.top.take()
        };
        // Opening over another container closes it first, like the client does.
        if let Some(previous) = previous {
            self.dispatch(&InventoryEvent::Close {
                player,
                container: previous,
            });
        }
        let mut state = self.state();
        if let Some(p) = state.players.get_mut(&player) {
            p.top = Some(container);
        }
        if let Some(previous) = previous {
            state.evict_if_released(previous);
        }
        Ok(())
    }

    fn top_container(&self, player: Uuid) -> Option<ContainerId> {
        self.state().players.get(&player).and_then(|p| p.top)
    }

    fn close_container(&self, player: Uuid) {
        let closed = self
            .state()
            .players
            .get_mut(&player)
            .and_then(|p| p.top.take());
        if let Some(container) = closed {
            self.dispatch(&InventoryEvent::Close { player, container });
            self.state().evict_if_released(container);
        }
    }

    fn update_inventory(&self, player: Uuid) {
        debug!("Resent inventory view to {player}");
    }

    fn play_sound(&self, player: Uuid, sound: &str, volume: f32, pitch: f32) {
        let state = self.state();
        if let Some(p) = state.players.get(&player) {
            info!("♪ {} hears {sound} (volume {volume}, pitch {pitch})", p.name);
        }
    }

    fn run_task_later(&self, delay_ticks: u64, task: Task) -> TaskId {
        let mut state = self.state();
        state.next_task_id += 1;
        let id = TaskId(state.next_task_id);
        state.tasks.push(ScheduledTask {
            id,
            remaining_ticks: delay_ticks,
            task,
        });
        id
    }

    fn cancel_task(&self, task: TaskId) {
        self.state().tasks.retain(|t| t.id != task);
    }

    fn register_listener(&self, listener: Arc<dyn InventoryListener>) -> ListenerId {
        let mut state = self.state();
        state.next_listener_id += 1;
        let id = ListenerId(state.next_listener_id);
        state.listeners.push((id, listener));
        id
    }

    fn unregister_listener(&self, listener: ListenerId) {
        self.state().listeners.retain(|(id, _)| *id != listener);
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Cancels every click and counts closes.
    struct Recorder {
        closes: AtomicUsize,
    }

    impl InventoryListener for Recorder {
        fn on_inventory_event(&self, event: &InventoryEvent) -> EventResult {
            match event {
                InventoryEvent::Click { .. } => EventResult::Cancelled,
                InventoryEvent::Close { .. } => {
                    self.closes.fetch_add(1, Ordering::SeqCst);
                    EventResult::Continue
                }
                _ => EventResult::Continue,
            }
        }
    }

    fn recorder() -> Arc<Recorder> {
        Arc::new(Recorder {
            closes: AtomicUsize::new(0),
        })
    }

    #[test]
    fn join_reuses_uuid_by_name() {
        let host = MemoryHost::new();
        let first = host.join("Alice");
        host.quit(first.uuid);
        assert!(!host.is_online(first.uuid));
        let again = host.join("alice");
        assert_eq!(first.uuid, again.uuid);
        assert!(host.is_online(first.uuid));
    }

    #[test]
    fn delayed_task_fires_after_delay() {
        let host = MemoryHost::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        host.run_task_later(
            2,
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(host.tick(), 0);
        assert_eq!(host.pending_tasks(), 1);
        assert_eq!(host.tick(), 1);
        assert_eq!(host.pending_tasks(), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(host.current_tick(), 2);
    }

    #[test]
    fn run_task_fires_next_tick() {
        let host = MemoryHost::new();
        host.run_task(Box::new(|| {}));
        assert_eq!(host.tick(), 1);
    }

    #[test]
    fn cancelled_task_never_fires() {
        let host = MemoryHost::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let id = host.run_task_later(
            1,
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        host.cancel_task(id);
        host.tick();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn uncancelled_click_picks_up_item() {
        let host = MemoryHost::new();
        let alice = host.join("Alice");
        let c = host.create_container(9, "Chest").unwrap();
        host.set_slot(c, 2, Some(PluginItem::new("minecraft:apple")))
            .unwrap();
        host.open_container(alice.uuid, c).unwrap();

        assert_eq!(host.click(alice.uuid, 2), EventResult::Continue);
        assert!(host.get_slot(c, 2).is_none());
        assert_eq!(
            host.cursor(alice.uuid).map(|i| i.identifier).as_deref(),
            Some("minecraft:apple")
        );
    }

    #[test]
    fn cancelled_click_leaves_item() {
        let host = MemoryHost::new();
        let alice = host.join("Alice");
        host.register_listener(recorder());
        let c = host.create_container(9, "Chest").unwrap();
        host.set_slot(c, 2, Some(PluginItem::new("minecraft:apple")))
            .unwrap();
        host.open_container(alice.uuid, c).unwrap();

        assert_eq!(host.click(alice.uuid, 2), EventResult::Cancelled);
        assert!(host.get_slot(c, 2).is_some());
        assert!(host.cursor(alice.uuid).is_none());
    }

    #[test]
    fn opening_over_a_container_closes_it() {
        let host = MemoryHost::new();
        let alice = host.join("Alice");
        let rec = recorder();
        host.register_listener(rec.clone());
        let a = host.create_container(9, "A").unwrap();
        let b = host.create_container(9, "B").unwrap();
        host.open_container(alice.uuid, a).unwrap();
        host.open_container(alice.uuid, b).unwrap();
        assert_eq!(rec.closes.load(Ordering::SeqCst), 1);
        assert_eq!(host.top_container(alice.uuid), Some(b));

        host.escape(alice.uuid);
        assert_eq!(rec.closes.load(Ordering::SeqCst), 2);
        assert_eq!(host.top_container(alice.uuid), None);
    }

    #[test]
    fn unregistered_listener_gets_nothing() {
        let host = MemoryHost::new();
        let alice = host.join("Alice");
        let rec = recorder();
        let id = host.register_listener(rec.clone());
        host.unregister_listener(id);
        assert_eq!(host.listener_count(), 0);
        let c = host.create_container(9, "A").unwrap();
        host.open_container(alice.uuid, c).unwrap();
        host.escape(alice.uuid);
        assert_eq!(rec.closes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn released_container_dropped_once_unviewed() {
        let host = MemoryHost::new();
        let alice = host.join("Alice");
        let viewed = host.create_container(9, "Viewed").unwrap();
        let idle = host.create_container(9, "Idle").unwrap();
        host.open_container(alice.uuid, viewed).unwrap();

        host.release_container(idle);
        assert_eq!(host.container_count(), 1);

        host.release_container(viewed);
        assert_eq!(host.container_count(), 1);
        assert!(host.render_view(alice.uuid).is_some());

        host.escape(alice.uuid);
        assert_eq!(host.container_count(), 0);
    }

    #[test]
    fn quitting_drops_released_view() {
        let host = MemoryHost::new();
        let alice = host.join("Alice");
        let c = host.create_container(9, "Menu").unwrap();
        host.open_container(alice.uuid, c).unwrap();
        host.release_container(c);
        host.quit(alice.uuid);
        assert_eq!(host.container_count(), 0);
    }

    #[test]
    fn rejects_bad_sizes_and_slots() {
        let host = MemoryHost::new();
        assert!(matches!(
            host.create_container(10, "Odd"),
            Err(HostError::InvalidSize(10))
        ));
        let c = host.create_container(9, "Ok").unwrap();
        assert!(matches!(
            host.set_slot(c, 9, None),
            Err(HostError::SlotOutOfBounds { slot: 9, size: 9 })
        ));
        assert!(matches!(
            host.set_slot(ContainerId(999), 0, None),
            Err(HostError::UnknownContainer(_))
        ));
    }

    #[test]
    fn render_view_shows_grid() {
        let host = MemoryHost::new();
        let alice = host.join("Alice");
        let c = host.create_container(18, "§aMenu").unwrap();
        host.set_slot(c, 0, Some(PluginItem::new("minecraft:stone").with_count(4)))
            .unwrap();
        host.set_slot(c, 10, Some(PluginItem::new("minecraft:apple").named("§cSnack")))
            .unwrap();
        assert!(host.render_view(alice.uuid).is_none());

        host.open_container(alice.uuid, c).unwrap();
        let view = host.render_view(alice.uuid).unwrap();
        let lines: Vec<&str> = view.lines().collect();
        assert_eq!(lines[0], "[Menu]");
        assert!(lines[1].starts_with("stonex4"));
        assert!(lines[2].contains("Snack"));
        assert_eq!(lines.len(), 3);
    }
}
