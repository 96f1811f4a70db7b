//! Slot bookkeeping: permanent slots, pages, navigation, and the render overlay.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use mc_rs_plugin_api::PluginItem;

use crate::error::GuiError;
use crate::ROW_WIDTH;

// ─── Actions ─────────────────────────────────────────────────────────────────

/// Outcome of a caller-supplied click action. Errors are logged, never propagated.
pub type ActionResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// A caller-supplied click callback.
pub type Action = Arc<dyn Fn() -> ActionResult + Send + Sync>;

/// What happens when a slot is clicked.
#[derive(Clone)]
pub enum SlotAction {
    /// Run a caller callback.
    Run(Action),
    /// Move one page back (no-op on the first page).
    PreviousPage,
    /// Move one page forward (no-op on the last page).
    NextPage,
    /// Close the GUI, then run the follow-up (if any) on the next tick.
    Back(Option<Action>),
}

impl fmt::Debug for SlotAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotAction::Run(_) => f.write_str("Run(..)"),
            SlotAction::PreviousPage => f.write_str("PreviousPage"),
            SlotAction::NextPage => f.write_str("NextPage"),
            SlotAction::Back(then) => write!(f, "Back(follow_up: {})", then.is_some()),
        }
    }
}

// ─── SlotMap ─────────────────────────────────────────────────────────────────

/// Items and actions keyed by slot. Used for permanent slots and for each page.
#[derive(Debug, Clone, Default)]
pub struct SlotMap {
    items: HashMap<usize, PluginItem>,
    actions: HashMap<usize, SlotAction>,
}

impl SlotMap {
    /// Store an item, keeping any action already at the slot. `None` clears both.
    pub fn set_item(&mut self, slot: usize, item: Option<PluginItem>) {
        match item {
            Some(item) => {
                self.items.insert(slot, item);
            }
            None => self.clear(slot),
        }
    }

    /// Store an item with its action. `None` item clears both; `None` action
    /// removes the slot's action.
    pub fn set_item_with_action(
        &mut self,
        slot: usize,
        item: Option<PluginItem>,
        action: Option<SlotAction>,
    ) {
        let Some(item) = item else {
            self.clear(slot);
            return;
        };
        self.items.insert(slot, item);
        match action {
            Some(action) => {
                self.actions.insert(slot, action);
            }
            None => {
                self.actions.remove(&slot);
            }
        }
    }

    pub fn set_action(&mut self, slot: usize, action: SlotAction) {
        self.actions.insert(slot, action);
    }

    pub fn clear(&mut self, slot: usize) {
        self.items.remove(&slot);
        self.actions.remove(&slot);
    }

    pub fn item(&self, slot: usize) -> Option<&PluginItem> {
        self.items.get(&slot)
    }

    pub fn action(&self, slot: usize) -> Option<&SlotAction> {
        self.actions.get(&slot)
    }

    pub fn items(&self) -> impl Iterator<Item = (usize, &PluginItem)> {
        self.items.iter().map(|(slot, item)| (*slot, item))
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    fn take_actions(&mut self) -> impl Iterator<Item = SlotAction> {
        std::mem::take(&mut self.actions).into_values()
    }
}

// ─── Navigation ──────────────────────────────────────────────────────────────

/// The two paging buttons.
#[derive(Debug, Clone)]
pub struct Navigation {
    pub prev_slot: usize,
    pub prev_item: Option<PluginItem>,
    pub next_slot: usize,
    pub next_item: Option<PluginItem>,
}

impl Navigation {
    fn covers(&self, slot: usize) -> bool {
        slot == self.prev_slot || slot == self.next_slot
    }
}

// ─── Layout ──────────────────────────────────────────────────────────────────

/// Everything a GUI displays, independent of any host container.
#[derive(Debug, Clone)]
pub struct Layout {
    rows: usize,
    permanent: SlotMap,
    pages: Vec<SlotMap>,
    navigation: Option<Navigation>,
    current_page: usize,
}

impl Layout {
    /// Create an empty layout. `rows` must already be validated.
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            permanent: SlotMap::default(),
            pages: Vec::new(),
            navigation: None,
            current_page: 0,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn size(&self) -> usize {
        self.rows * ROW_WIDTH
    }

    pub fn validate_slot(&self, slot: usize) -> Result<(), GuiError> {
        if slot >= self.size() {
            return Err(GuiError::SlotOutOfRange {
                slot,
                size: self.size(),
            });
        }
        Ok(())
    }

    pub fn set_item(&mut self, slot: usize, item: Option<PluginItem>) -> Result<(), GuiError> {
        self.validate_slot(slot)?;
        self.permanent.set_item(slot, item);
        Ok(())
    }

    pub fn set_item_with_action(
        &mut self,
        slot: usize,
        item: Option<PluginItem>,
        action: Option<SlotAction>,
    ) -> Result<(), GuiError> {
        self.validate_slot(slot)?;
        self.permanent.set_item_with_action(slot, item, action);
        Ok(())
    }

    /// Put `item` on every perimeter slot.
    pub fn fill_border(&mut self, item: &PluginItem) {
        let last_row = (self.rows - 1) * ROW_WIDTH;
        for i in 0..ROW_WIDTH {
            self.permanent.set_item(i, Some(item.clone()));
            self.permanent.set_item(last_row + i, Some(item.clone()));
        }
        for row in 1..self.rows.saturating_sub(1) {
            self.permanent.set_item(row * ROW_WIDTH, Some(item.clone()));
            self.permanent
                .set_item(row * ROW_WIDTH + ROW_WIDTH - 1, Some(item.clone()));
        }
    }

    /// Put `item` on all slots of `row`. A `None` item only validates the row.
    pub fn fill_row(&mut self, row: usize, item: Option<&PluginItem>) -> Result<(), GuiError> {
        if row >= self.rows {
            return Err(GuiError::RowOutOfRange {
                row,
                rows: self.rows,
            });
        }
        if let Some(item) = item {
            for i in 0..ROW_WIDTH {
                self.permanent
                    .set_item(row * ROW_WIDTH + i, Some(item.clone()));
            }
        }
        Ok(())
    }

    /// Append an empty page and return its index.
    pub fn add_page(&mut self) -> usize {
        self.pages.push(SlotMap::default());
        self.pages.len() - 1
    }

    fn ensure_page(&mut self, page: usize) {
        while self.pages.len() <= page {
            self.add_page();
        }
    }

    /// Guarantee at least one page exists.
    pub fn ensure_first_page(&mut self) {
        if self.pages.is_empty() {
            self.add_page();
        }
    }

    pub fn set_page_item(
        &mut self,
        page: usize,
        slot: usize,
        item: Option<PluginItem>,
    ) -> Result<(), GuiError> {
        self.validate_slot(slot)?;
        self.ensure_page(page);
        self.pages[page].set_item(slot, item);
        Ok(())
    }

    pub fn set_page_item_with_action(
        &mut self,
        page: usize,
        slot: usize,
        item: Option<PluginItem>,
        action: Option<SlotAction>,
    ) -> Result<(), GuiError> {
        self.validate_slot(slot)?;
        self.ensure_page(page);
        self.pages[page].set_item_with_action(slot, item, action);
        Ok(())
    }

    /// Install paging buttons. Their actions replace any permanent action at
    /// those slots.
    pub fn set_navigation(
        &mut self,
        prev_slot: usize,
        prev_item: Option<PluginItem>,
        next_slot: usize,
        next_item: Option<PluginItem>,
    ) -> Result<(), GuiError> {
        self.validate_slot(prev_slot)?;
        self.validate_slot(next_slot)?;
        if prev_slot == next_slot {
            return Err(GuiError::DuplicateNavigationSlot(prev_slot));
        }
        self.permanent.set_action(prev_slot, SlotAction::PreviousPage);
        self.permanent.set_action(next_slot, SlotAction::NextPage);
        self.navigation = Some(Navigation {
            prev_slot,
            prev_item,
            next_slot,
            next_item,
        });
        Ok(())
    }

    pub fn navigation(&self) -> Option<&Navigation> {
        self.navigation.as_ref()
    }

    pub fn permanent(&self) -> &SlotMap {
        &self.permanent
    }

    pub fn page(&self, page: usize) -> Option<&SlotMap> {
        self.pages.get(page)
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Number of pages, never less than one.
    pub fn total_pages(&self) -> usize {
        self.pages.len().max(1)
    }

    fn last_page(&self) -> usize {
        self.pages.len().saturating_sub(1)
    }

    /// Step back one page. Returns whether the page changed.
    pub fn previous_page(&mut self) -> bool {
        if self.current_page > 0 {
            self.current_page -= 1;
            true
        } else {
            false
        }
    }

    /// Step forward one page. Returns whether the page changed.
    pub fn next_page(&mut self) -> bool {
        if self.current_page < self.last_page() {
            self.current_page += 1;
            true
        } else {
            false
        }
    }

    /// Remove every action (permanent and paged), leaving items in place.
    ///
    /// Actions may hold handles back to their session; dropping them breaks
    /// those cycles once a session is finished.
    pub fn take_actions(&mut self) -> Vec<SlotAction> {
        let mut taken: Vec<SlotAction> = self.permanent.take_actions().collect();
        for page in &mut self.pages {
            taken.extend(page.take_actions());
        }
        taken
    }

    /// The action a click on `slot` runs: permanent actions shadow page actions.
    pub fn resolve_action(&self, slot: usize) -> Option<SlotAction> {
        if let Some(action) = self.permanent.action(slot) {
            return Some(action.clone());
        }
        self.pages
            .get(self.current_page)
            .and_then(|page| page.action(slot))
            .cloned()
    }

    /// Compute every cell for the current page.
    ///
    /// Precedence, later wins: page items, permanent items (except navigation
    /// slots), navigation buttons with permanent items as fallback.
    pub fn compose(&self) -> Vec<Option<PluginItem>> {
        let size = self.size();
        let mut cells = vec![None; size];

        if let Some(page) = self.pages.get(self.current_page) {
            for (slot, item) in page.items() {
                if slot < size {
                    cells[slot] = Some(item.clone());
                }
            }
        }

        for (slot, item) in self.permanent.items() {
            let is_nav = self.navigation.as_ref().is_some_and(|nav| nav.covers(slot));
            if !is_nav && slot < size {
                cells[slot] = Some(item.clone());
            }
        }

        if let Some(nav) = &self.navigation {
            let can_go_back = self.current_page > 0;
            let can_go_forward = self.current_page < self.last_page();
            self.overlay_button(&mut cells, nav.prev_slot, nav.prev_item.as_ref(), can_go_back);
            self.overlay_button(&mut cells, nav.next_slot, nav.next_item.as_ref(), can_go_forward);
        }

        cells
    }

    fn overlay_button(
        &self,
        cells: &mut [Option<PluginItem>],
        slot: usize,
        button: Option<&PluginItem>,
        active: bool,
    ) {
        cells[slot] = match button {
            Some(button) if active => Some(button.clone()),
            _ => self.permanent.item(slot).cloned(),
        };
    }
}

/// The 28 interior slots of a six-row container, left to right, top to bottom.
pub fn standard_slots() -> [usize; 28] {
    [
        10, 11, 12, 13, 14, 15, 16, //
        19, 20, 21, 22, 23, 24, 25, //
        28, 29, 30, 31, 32, 33, 34, //
        37, 38, 39, 40, 41, 42, 43,
    ]
}
