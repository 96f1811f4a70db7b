//! Manual-tick `ServerApi` fake for session tests.

use std::collections::HashMap;
use std::sync::Arc;

use mc_rs_plugin_api::{
    ContainerId, EventResult, HostError, InventoryEvent, InventoryListener, ListenerId,
    PluginItem, ServerApi, Task, TaskId,
};
use parking_lot::{Mutex, MutexGuard};
use uuid::Uuid;

struct Container {
    title: String,
    cells: Vec<Option<PluginItem>>,
}

#[derive(Default)]
struct PlayerView {
    online: bool,
    top: Option<ContainerId>,
}

struct PendingTask {
    id: TaskId,
    remaining_ticks: u64,
    task: Task,
}

#[derive(Default)]
struct State {
    next_id: u64,
    containers: HashMap<ContainerId, Container>,
    players: HashMap<Uuid, PlayerView>,
    listeners: Vec<(ListenerId, Arc<dyn InventoryListener>)>,
    tasks: Vec<PendingTask>,
    sounds: Vec<(Uuid, String)>,
    opened: Vec<(Uuid, ContainerId)>,
    cancelled: Vec<TaskId>,
    unregistered: Vec<ListenerId>,
    released: Vec<ContainerId>,
    updates: usize,
    fail_create: bool,
    fail_writes: bool,
}

#[derive(Default)]
pub struct TestHost {
    state: Mutex<State>,
}

impl TestHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock()
    }

    fn next_id(&self) -> u64 {
        let mut state = self.state();
        state.next_id += 1;
        state.next_id
    }

    /// Bring a new player online.
    pub fn join(&self) -> Uuid {
        let player = Uuid::from_u128(u128::from(self.next_id()));
        self.state().players.insert(
            player,
            PlayerView {
                online: true,
                top: None,
            },
        );
        player
    }

    /// Advance one tick, running every task that became due.
    pub fn tick(&self) {
        let due: Vec<Task> = {
            let mut state = self.state();
            let mut due = Vec::new();
            let mut keep = Vec::new();
            for mut pending in state.tasks.drain(..) {
                pending.remaining_ticks = pending.remaining_ticks.saturating_sub(1);
                if pending.remaining_ticks == 0 {
                    due.push(pending.task);
                } else {
                    keep.push(pending);
                }
            }
            state.tasks = keep;
            due
        };
        for task in due {
            task();
        }
    }

    pub fn dispatch(&self, event: InventoryEvent) -> EventResult {
        let listeners: Vec<Arc<dyn InventoryListener>> = self
            .state()
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        let cancellable = event.is_cancellable();
        for listener in listeners {
            if listener.on_inventory_event(&event) == EventResult::Cancelled && cancellable {
                return EventResult::Cancelled;
            }
        }
        EventResult::Continue
    }

    /// Click a cell of the player's top container.
    pub fn click(&self, player: Uuid, slot: usize) -> EventResult {
        let (top, item) = {
            let state = self.state();
            let top = state.players.get(&player).and_then(|p| p.top);
            let item = top
                .and_then(|c| state.containers.get(&c))
                .and_then(|c| c.cells.get(slot).cloned().flatten());
            (top, item)
        };
        self.dispatch(InventoryEvent::Click {
            player,
            view_top: top,
            clicked: top,
            slot: slot as i32,
            current_item: item,
        })
    }

    /// Click a slot in the player's own inventory below the top container.
    pub fn click_own_inventory(&self, player: Uuid, slot: i32) -> EventResult {
        let top = self.top_container(player);
        self.dispatch(InventoryEvent::Click {
            player,
            view_top: top,
            clicked: None,
            slot,
            current_item: Some(PluginItem::new("minecraft:dirt")),
        })
    }

    pub fn drag(&self, player: Uuid, slots: Vec<usize>) -> EventResult {
        let top = self.top_container(player);
        self.dispatch(InventoryEvent::Drag {
            player,
            view_top: top,
            slots,
        })
    }

    /// The player closes their view (ESC).
    pub fn press_escape(&self, player: Uuid) {
        let closed = self
            .state()
            .players
            .get_mut(&player)
            .and_then(|p| p.top.take());
        if let Some(container) = closed {
            self.dispatch(InventoryEvent::Close { player, container });
        }
    }

    pub fn disconnect(&self, player: Uuid) {
        if let Some(view) = self.state().players.get_mut(&player) {
            view.online = false;
            view.top = None;
        }
        self.dispatch(InventoryEvent::PlayerQuit { player });
    }

    /// Mark the player offline without delivering a quit event.
    pub fn set_offline(&self, player: Uuid) {
        if let Some(view) = self.state().players.get_mut(&player) {
            view.online = false;
        }
    }

    pub fn cell(&self, container: ContainerId, slot: usize) -> Option<PluginItem> {
        self.get_slot(container, slot)
    }

    pub fn cell_id(&self, container: ContainerId, slot: usize) -> Option<String> {
        self.cell(container, slot).map(|item| item.identifier)
    }

    pub fn title(&self, container: ContainerId) -> Option<String> {
        self.state()
            .containers
            .get(&container)
            .map(|c| c.title.clone())
    }

    pub fn listener_count(&self) -> usize {
        self.state().listeners.len()
    }

    pub fn pending_tasks(&self) -> usize {
        self.state().tasks.len()
    }

    pub fn sounds(&self, player: Uuid) -> Vec<String> {
        self.state()
            .sounds
            .iter()
            .filter(|(p, _)| *p == player)
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn opened(&self) -> Vec<(Uuid, ContainerId)> {
        self.state().opened.clone()
    }

    pub fn cancelled(&self) -> Vec<TaskId> {
        self.state().cancelled.clone()
    }

    pub fn unregistered(&self) -> Vec<ListenerId> {
        self.state().unregistered.clone()
    }

    pub fn updates(&self) -> usize {
        self.state().updates
    }

    pub fn released(&self) -> Vec<ContainerId> {
        self.state().released.clone()
    }

    pub fn container_count(&self) -> usize {
        self.state().containers.len()
    }

    /// Make `create_container` fail from now on.
    pub fn fail_create(&self, fail: bool) {
        self.state().fail_create = fail;
    }

    /// Make `set_slot` fail from now on.
    pub fn fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }
}

impl ServerApi for TestHost {
    fn is_online(&self, player: Uuid) -> bool {
        self.state().players.get(&player).is_some_and(|p| p.online)
    }

    fn create_container(&self, size: usize, title: &str) -> Result<ContainerId, HostError> {
        if self.state().fail_create {
            return Err(HostError::InvalidSize(size));
        }
        let id = ContainerId(self.next_id());
        self.state().containers.insert(
            id,
            Container {
                title: title.to_string(),
                cells: vec![None; size],
            },
        );
        Ok(id)
    }

    fn set_slot(
        &self,
        container: ContainerId,
        slot: usize,
        item: Option<PluginItem>,
    ) -> Result<(), HostError> {
        let mut state = self.state();
        if state.fail_writes {
            return Err(HostError::SlotOutOfBounds { slot, size: 0 });
        }
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
        let viewed = state.players.values().any(|p| p.top == Some(container));
        if !viewed {
            state.containers.remove(&container);
        }
        state.released.push(container);
    }

    fn open_container(&self, player: Uuid, container: ContainerId) -> Result<(), HostError> {
        let previous = {
            let mut state = self.state();
            let view = state
                .players
                .get_mut(&player)
                .ok_or(HostError::UnknownPlayer(player))?;
            view.top.take()
        };
        if let Some(previous) = previous {
            self.dispatch(InventoryEvent::Close {
                player,
                container: previous,
            });
        }
        let mut state = self.state();
        if let Some(view) = state.players.get_mut(&player) {
            view.top = Some(container);
        }
        state.opened.push((player, container));
        Ok(())
    }

    fn top_container(&self, player: Uuid) -> Option<ContainerId> {
        self.state().players.get(&player).and_then(|p| p.top)
    }

    fn close_container(&self, player: Uuid) {
        self.press_escape(player);
    }

    fn update_inventory(&self, _player: Uuid) {
        self.state().updates += 1;
    }

    fn play_sound(&self, player: Uuid, sound: &str, _volume: f32, _pitch: f32) {
        self.state().sounds.push((player, sound.to_string()));
    }

    fn run_task_later(&self, delay_ticks: u64, task: Task) -> TaskId {
        let id = TaskId(self.next_id() as u32);
        self.state().tasks.push(PendingTask {
            id,
            remaining_ticks: delay_ticks,
            task,
        });
        id
    }

    fn cancel_task(&self, task: TaskId) {
        let mut state = self.state();
        state.tasks.retain(|t| t.id != task);
        state.cancelled.push(task);
    }

    fn register_listener(&self, listener: Arc<dyn InventoryListener>) -> ListenerId {
        let id = ListenerId(self.next_id());
        self.state().listeners.push((id, listener));
        id
    }

    fn unregister_listener(&self, listener: ListenerId) {
        let mut state = self.state();
        state.listeners.retain(|(id, _)| *id != listener);
        state.unregistered.push(listener);
    }
}
