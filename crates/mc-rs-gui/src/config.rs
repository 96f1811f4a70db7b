use serde::Deserialize;

/// Tunables shared by every GUI session.
#[derive(Debug, Clone, Deserialize)]
pub struct GuiConfig {
    /// Ticks between a close notification and session cleanup. Default: 1.
    #[serde(default = "default_close_delay_ticks")]
    pub close_delay_ticks: u64,
    /// Alternate color code character translated in titles. Default: `&`.
    #[serde(default = "default_color_char")]
    pub color_char: char,
    #[serde(default)]
    pub sounds: SoundSection,
}

fn default_close_delay_ticks() -> u64 {
    1
}

fn default_color_char() -> char {
    '&'
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self {
            close_delay_ticks: default_close_delay_ticks(),
            color_char: default_color_char(),
            sounds: SoundSection::default(),
        }
    }
}

/// Feedback cues played to the menu's owner.
#[derive(Debug, Clone, Deserialize)]
pub struct SoundSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_open_sound")]
    pub open: String,
    #[serde(default = "default_click_sound")]
    pub click: String,
    #[serde(default = "default_page_turn_sound")]
    pub page_turn: String,
    #[serde(default = "default_unit")]
    pub volume: f32,
    #[serde(default = "default_unit")]
    pub pitch: f32,
}

fn default_true() -> bool {
    true
}

fn default_open_sound() -> String {
    "note.pling".into()
}

fn default_click_sound() -> String {
    "random.click".into()
}

fn default_page_turn_sound() -> String {
    "item.book.page_turn".into()
}

fn default_unit() -> f32 {
    1.0
}

impl Default for SoundSection {
    fn default() -> Self {
        Self {
            enabled: true,
            open: default_open_sound(),
            click: default_click_sound(),
            page_turn: default_page_turn_sound(),
            volume: default_unit(),
            pitch: default_unit(),
        }
    }
}
