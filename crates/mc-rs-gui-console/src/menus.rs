//! Demo menus: a main menu and a paginated shop.

use std::sync::Arc;

use mc_rs_gui::color::translate_color_codes;
use mc_rs_gui::{standard_slots, Action, GuiContext, GuiError, GuiSession, MAX_ROWS, ROW_WIDTH};
use mc_rs_plugin_api::PluginItem;
use tracing::info;
use uuid::Uuid;

use crate::config::ShopSection;

/// Builds and opens the demo menus. Cloning is cheap.
#[derive(Clone)]
pub struct Menus {
    ctx: GuiContext,
    shop: Arc<ShopSection>,
}

fn border_pane() -> PluginItem {
    PluginItem::new("minecraft:gray_stained_glass_pane").named(" ")
}

impl Menus {
    pub fn new(ctx: GuiContext, shop: ShopSection) -> Self {
        Self {
            ctx,
            shop: Arc::new(shop),
        }
    }

    pub fn context(&self) -> &GuiContext {
        &self.ctx
    }

    /// An item whose display name may use the configured color codes.
    fn button(&self, identifier: &str, name: &str) -> PluginItem {
        PluginItem::new(identifier).named(translate_color_codes(self.ctx.config.color_char, name))
    }

    /// Three rows: shop, info, close.
    pub fn open_main(&self, player: Uuid) -> Result<GuiSession, GuiError> {
        let gui = GuiSession::new(&self.ctx, player, "&8Main Menu", 3)?;
        let menus = self.clone();
        let lore = translate_color_codes(self.ctx.config.color_char, "&7Browse items");
        gui.fill_border(border_pane())?
            .set_item_with_action(
                11,
                self.button("minecraft:emerald", "&aShop").with_lore(lore),
                move || {
                    menus.open_shop(player)?;
                    Ok(())
                },
            )?
            .set_item_with_action(
                13,
                self.button("minecraft:book", "&eInfo"),
                move || {
                    info!("{player} asked for server info");
                    Ok(())
                },
            )?
            .set_back_button(15, self.button("minecraft:barrier", "&cClose"), None)?;
        gui.open()?;
        Ok(gui)
    }

    /// The shop: configured items laid out over as many pages as needed.
    pub fn open_shop(&self, player: Uuid) -> Result<GuiSession, GuiError> {
        let rows = self.shop.rows.clamp(3, MAX_ROWS);
        let size = rows * ROW_WIDTH;
        let gui = GuiSession::new(&self.ctx, player, &self.shop.title, rows)?;

        // Content goes inside the border, above the bottom row.
        let content: Vec<usize> = standard_slots()
            .into_iter()
            .filter(|slot| *slot < size - ROW_WIDTH)
            .collect();
        for (i, item) in self.shop.items.iter().enumerate() {
            let page = i / content.len();
            let slot = content[i % content.len()];
            let bought = item.clone();
            gui.set_page_item_with_action(page, slot, item.clone(), move || {
                info!("{player} bought {} x{}", bought.identifier, bought.count);
                Ok(())
            })?;
        }

        let menus = self.clone();
        let back: Action = Arc::new(move || {
            menus.open_main(player)?;
            Ok(())
        });
        gui.fill_border(border_pane())?
            .set_navigation(
                size - ROW_WIDTH,
                self.button("minecraft:arrow", "&ePrevious"),
                size - 1,
                self.button("minecraft:arrow", "&eNext"),
            )?
            .set_back_button(
                size - 5,
                self.button("minecraft:oak_door", "&7Back"),
                Some(back),
            )?;
        gui.open()?;
        Ok(gui)
    }
}
