use mc_rs_gui::GuiConfig;
use mc_rs_plugin_api::PluginItem;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub gui: GuiConfig,
    #[serde(default)]
    pub shop: ShopSection,
}

#[derive(Debug, Deserialize)]
pub struct ServerSection {
    /// Milliseconds per scheduler tick. Default: 50 (20 TPS).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Players online at startup.
    #[serde(default)]
    pub players: Vec<String>,
}

fn default_tick_interval_ms() -> u64 {
    50
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            players: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// The demo shop menu.
#[derive(Debug, Deserialize)]
pub struct ShopSection {
    #[serde(default = "default_shop_title")]
    pub title: String,
    #[serde(default = "default_shop_rows")]
    pub rows: usize,
    /// Items laid out across the content slots, spilling onto further pages.
    #[serde(default = "default_shop_items")]
    pub items: Vec<PluginItem>,
}

fn default_shop_title() -> String {
    "&2Shop".into()
}

fn default_shop_rows() -> usize {
    6
}

fn default_shop_items() -> Vec<PluginItem> {
    [
        "minecraft:apple",
        "minecraft:bread",
        "minecraft:iron_ingot",
        "minecraft:gold_ingot",
        "minecraft:diamond",
        "minecraft:emerald",
        "minecraft:oak_log",
        "minecraft:cobblestone",
    ]
    .iter()
    .cycle()
    .take(40)
    .map(|id| PluginItem::new(*id))
    .collect()
}

impl Default for ShopSection {
    fn default() -> Self {
        Self {
            title: default_shop_title(),
            rows: default_shop_rows(),
            items: default_shop_items(),
        }
    }
}

impl ConsoleConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}
