//! Console command parsing, registry, and built-in commands.

use std::collections::HashMap;
use std::sync::Arc;

use mc_rs_plugin_api::{EventResult, PluginPlayer};

use crate::host::MemoryHost;
use crate::menus::Menus;

/// Context passed to a command handler.
pub struct CommandContext<'a> {
    pub host: &'a MemoryHost,
    pub menus: &'a Menus,
    /// Arguments after the command name.
    pub args: Vec<String>,
}

/// Result returned by a command handler.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command executed successfully.
    pub success: bool,
    /// Lines to print back to the console.
    pub messages: Vec<String>,
    /// If true, the console should shut down.
    pub should_stop: bool,
}

impl CommandResult {
    /// Create a successful result with a single message.
    pub fn ok(message: impl Into<String>) -> Self {
        Self::lines(vec![message.into()])
    }

    /// Create a successful result with several lines.
    pub fn lines(messages: Vec<String>) -> Self {
        Self {
            success: true,
            messages,
            should_stop: false,
        }
    }

    /// Create a failed result with a single message.
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            messages: vec![message.into()],
            should_stop: false,
        }
    }
}

/// Function pointer type for command handlers.
pub type CommandFn = fn(&CommandContext) -> CommandResult;

/// A registered command.
pub struct CommandEntry {
    pub name: String,
    pub usage: String,
    pub description: String,
    pub handler: CommandFn,
}

/// Interactive console driving the in-memory host.
pub struct Console {
    host: Arc<MemoryHost>,
    menus: Menus,
    commands: HashMap<String, CommandEntry>,
}

impl Console {
    /// Create a console with every built-in command.
    pub fn new(host: Arc<MemoryHost>, menus: Menus) -> Self {
        let mut console = Self {
            host,
            menus,
            commands: HashMap::new(),
        };
        console.register("help", "help", "List available commands", cmd_help);
        console.register("join", "join <player>", "Bring a player online", cmd_join);
        console.register("quit", "quit <player>", "Disconnect a player", cmd_quit);
        console.register("menu", "menu <player> [main|shop]", "Open a menu", cmd_menu);
        console.register("click", "click <player> <slot>", "Click a slot", cmd_click);
        console.register("drag", "drag <player> <slot>...", "Drag across slots", cmd_drag);
        console.register("esc", "esc <player>", "Close the player's view", cmd_esc);
        console.register("show", "show <player>", "Print what the player sees", cmd_show);
        console.register("tick", "tick [count]", "Advance the scheduler", cmd_tick);
        console.register("list", "list", "Show online players and their menus", cmd_list);
        console.register("closeall", "closeall", "Close every open menu", cmd_closeall);
        console.register("stop", "stop", "Stop the console", cmd_stop);
        console
    }

    fn register(&mut self, name: &str, usage: &str, description: &str, handler: CommandFn) {
        self.commands.insert(
            name.to_string(),
            CommandEntry {
                name: name.to_string(),
                usage: usage.to_string(),
                description: description.to_string(),
                handler,
            },
        );
    }

    /// Parse and run one console line. Blank lines yield no output.
    pub fn execute_line(&self, line: &str) -> CommandResult {
        let mut parts = line.trim().trim_start_matches('/').split_whitespace();
        let Some(name) = parts.next() else {
            return CommandResult::lines(Vec::new());
        };
        let name = name.to_lowercase();
        let mut args: Vec<String> = parts.map(str::to_string).collect();
        if name == "help" {
            // Help receives the command list as "usage:description" pairs.
            let mut entries: Vec<&CommandEntry> = self.commands.values().collect();
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            args = entries
                .iter()
                .map(|e| format!("{}:{}", e.usage, e.description))
                .collect();
        }
        self.execute(&name, args)
    }

    /// Execute a command by name.
    pub fn execute(&self, name: &str, args: Vec<String>) -> CommandResult {
        let ctx = CommandContext {
            host: &self.host,
            menus: &self.menus,
            args,
        };
        match self.commands.get(name) {
            Some(entry) => (entry.handler)(&ctx),
            None => CommandResult::err(format!(
                "Unknown command: {name}. Type help for a list of commands."
            )),
        }
    }

    /// Get a reference to all registered commands.
    pub fn get_commands(&self) -> &HashMap<String, CommandEntry> {
        &self.commands
    }
}

// ---------------------------------------------------------------------------
// Built-in commands
// ---------------------------------------------------------------------------

/// Resolve the online player named by `args[0]`.
fn online_player(ctx: &CommandContext) -> Result<PluginPlayer, CommandResult> {
    let Some(name) = ctx.args.first() else {
        return Err(CommandResult::err("Missing player name"));
    };
    match ctx.host.find_player(name) {
        Some(player) if ctx.host.online_players().iter().any(|p| p.uuid == player.uuid) => {
            Ok(player)
        }
        _ => Err(CommandResult::err(format!("{name} is not online"))),
    }
}

fn parse_slot(arg: &str) -> Result<usize, CommandResult> {
    arg.parse()
        .map_err(|_| CommandResult::err(format!("Invalid slot: {arg}")))
}

fn cmd_help(ctx: &CommandContext) -> CommandResult {
    let mut lines = vec!["Available commands:".to_string()];
    for arg in &ctx.args {
        if let Some((usage, desc)) = arg.split_once(':') {
            lines.push(format!("  {usage} - {desc}"));
        }
    }
    CommandResult::lines(lines)
}

fn cmd_join(ctx: &CommandContext) -> CommandResult {
    match ctx.args.first() {
        Some(name) => {
            let player = ctx.host.join(name);
            CommandResult::ok(format!("{} joined ({})", player.name, player.uuid))
        }
        None => CommandResult::err("Usage: join <player>"),
    }
}

fn cmd_quit(ctx: &CommandContext) -> CommandResult {
    match online_player(ctx) {
        Ok(player) => {
            ctx.host.quit(player.uuid);
            CommandResult::ok(format!("{} left", player.name))
        }
        Err(result) => result,
    }
}

fn cmd_menu(ctx: &CommandContext) -> CommandResult {
    let player = match online_player(ctx) {
        Ok(player) => player,
        Err(result) => return result,
    };
    let which = ctx.args.get(1).map(String::as_str).unwrap_or("main");
    let opened = match which {
        "main" => ctx.menus.open_main(player.uuid),
        "shop" => ctx.menus.open_shop(player.uuid),
        other => return CommandResult::err(format!("Unknown menu: {other}")),
    };
    match opened {
        Ok(gui) => CommandResult::ok(format!(
            "Opening '{}' for {} ({} page(s)); it shows next tick",
            gui.title(),
            player.name,
            gui.total_pages()
        )),
        Err(e) => CommandResult::err(format!("Failed to open menu: {e}")),
    }
}

fn cmd_click(ctx: &CommandContext) -> CommandResult {
    let player = match online_player(ctx) {
        Ok(player) => player,
        Err(result) => return result,
    };
    let Some(arg) = ctx.args.get(1) else {
        return CommandResult::err("Usage: click <player> <slot>");
    };
    let slot = match parse_slot(arg) {
        Ok(slot) => slot,
        Err(result) => return result,
    };
    let outcome = match ctx.host.click(player.uuid, slot) {
        EventResult::Cancelled => "cancelled",
        EventResult::Continue => "allowed",
    };
    CommandResult::ok(format!("{} clicked slot {slot}: {outcome}", player.name))
}

fn cmd_drag(ctx: &CommandContext) -> CommandResult {
    let player = match online_player(ctx) {
        Ok(player) => player,
        Err(result) => return result,
    };
    let slots: Result<Vec<usize>, CommandResult> =
        ctx.args.iter().skip(1).map(|a| parse_slot(a)).collect();
    let slots = match slots {
        Ok(slots) if !slots.is_empty() => slots,
        Ok(_) => return CommandResult::err("Usage: drag <player> <slot>..."),
        Err(result) => return result,
    };
    let outcome = match ctx.host.drag(player.uuid, slots) {
        EventResult::Cancelled => "cancelled",
        EventResult::Continue => "allowed",
    };
    CommandResult::ok(format!("{} dragged: {outcome}", player.name))
}

fn cmd_esc(ctx: &CommandContext) -> CommandResult {
    match online_player(ctx) {
        Ok(player) => {
            ctx.host.escape(player.uuid);
            CommandResult::ok(format!("{} closed their view", player.name))
        }
        Err(result) => result,
    }
}

fn cmd_show(ctx: &CommandContext) -> CommandResult {
    let player = match online_player(ctx) {
        Ok(player) => player,
        Err(result) => return result,
    };
    match ctx.host.render_view(player.uuid) {
        Some(view) => CommandResult::lines(view.lines().map(str::to_string).collect()),
        None => CommandResult::ok(format!("{} has no container open", player.name)),
    }
}

fn cmd_tick(ctx: &CommandContext) -> CommandResult {
    let count = match ctx.args.first() {
        Some(arg) => match arg.parse::<u32>() {
            Ok(count) => count,
            Err(_) => return CommandResult::err(format!("Invalid tick count: {arg}")),
        },
        None => 1,
    };
    let fired: usize = (0..count).map(|_| ctx.host.tick()).sum();
    CommandResult::ok(format!(
        "Advanced {count} tick(s) to {}, {fired} task(s) ran",
        ctx.host.current_tick()
    ))
}

fn cmd_list(ctx: &CommandContext) -> CommandResult {
    let players = ctx.host.online_players();
    if players.is_empty() {
        return CommandResult::ok("No players online");
    }
    let registry = &ctx.menus.context().registry;
    let mut lines = vec![format!("{} player(s) online:", players.len())];
    for player in players {
        let menu = registry
            .get(player.uuid)
            .map(|gui| {
                format!(
                    " - '{}' page {}/{} ({:?})",
                    gui.title(),
                    gui.current_page() + 1,
                    gui.total_pages(),
                    gui.state()
                )
            })
            .unwrap_or_default();
        lines.push(format!("  {}{menu}", player.name));
    }
    CommandResult::lines(lines)
}

fn cmd_closeall(ctx: &CommandContext) -> CommandResult {
    let registry = &ctx.menus.context().registry;
    let count = registry.len();
    registry.close_all();
    CommandResult::ok(format!("Closed {count} menu(s)"))
}

fn cmd_stop(_ctx: &CommandContext) -> CommandResult {
    CommandResult {
        success: true,
        messages: vec!["Stopping...".to_string()],
        should_stop: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShopSection;
    use mc_rs_gui::{GuiConfig, GuiContext};
    use mc_rs_plugin_api::ServerApi;

    fn console() -> (Arc<MemoryHost>, Console) {
        let host = Arc::new(MemoryHost::new());
        let ctx = GuiContext::new(host.clone(), GuiConfig::default());
        let menus = Menus::new(ctx, ShopSection::default());
        (host.clone(), Console::new(host, menus))
    }

    #[test]
    fn unknown_command() {
        let (_, console) = console();
        let result = console.execute_line("fly");
        assert!(!result.success);
        assert!(result.messages[0].contains("Unknown command: fly"));
    }

    #[test]
    fn blank_line_is_silent() {
        let (_, console) = console();
        let result = console.execute_line("   ");
        assert!(result.success);
        assert!(result.messages.is_empty());
    }

    #[test]
    fn help_lists_every_command() {
        let (_, console) = console();
        let result = console.execute_line("help");
        assert!(result.success);
        assert_eq!(result.messages.len(), console.get_commands().len() + 1);
        assert!(result
            .messages
            .iter()
            .any(|m| m.contains("click <player> <slot>")));
    }

    #[test]
    fn stop_requests_shutdown() {
        let (_, console) = console();
        let result = console.execute_line("/STOP");
        assert!(result.should_stop);
    }

    #[test]
    fn commands_require_online_player() {
        let (_, console) = console();
        assert!(!console.execute_line("menu Alice").success);
        assert!(!console.execute_line("click").success);
        console.execute_line("join Alice");
        console.execute_line("quit Alice");
        let result = console.execute_line("esc Alice");
        assert!(!result.success);
        assert!(result.messages[0].contains("not online"));
    }

    #[test]
    fn menu_click_and_show() {
        let (host, console) = console();
        assert!(console.execute_line("join Alice").success);
        assert!(console.execute_line("menu Alice shop").success);
        assert!(console.execute_line("tick").success);

        let shown = console.execute_line("show Alice");
        assert!(shown.messages[0].contains("Shop"));
        assert_eq!(shown.messages.len(), 7);

        let clicked = console.execute_line("click Alice 10");
        assert!(clicked.messages[0].ends_with("cancelled"));
        let dragged = console.execute_line("drag Alice 10 11 12");
        assert!(dragged.messages[0].ends_with("cancelled"));

        let listed = console.execute_line("list");
        assert!(listed.messages[1].contains("page 1/2"));

        console.execute_line("esc Alice");
        console.execute_line("tick 2");
        let alice = host.find_player("Alice").unwrap().uuid;
        assert_eq!(host.top_container(alice), None);
        assert!(console.execute_line("list").messages[1].ends_with("Alice"));
    }

    #[test]
    fn invalid_arguments() {
        let (_, console) = console();
        console.execute_line("join Alice");
        assert!(!console.execute_line("click Alice x").success);
        assert!(!console.execute_line("drag Alice").success);
        assert!(!console.execute_line("tick many").success);
        assert!(!console.execute_line("menu Alice attic").success);
    }

    #[test]
    fn closeall_closes_menus() {
        let (host, console) = console();
        console.execute_line("join Alice");
        console.execute_line("join Bob");
        console.execute_line("menu Alice");
        console.execute_line("menu Bob shop");
        console.execute_line("tick");

        let result = console.execute_line("closeall");
        assert_eq!(result.messages[0], "Closed 2 menu(s)");
        assert_eq!(host.listener_count(), 0);
    }
}
