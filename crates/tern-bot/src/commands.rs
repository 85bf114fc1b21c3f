#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Status,
    ClearHistory,
    ShowHistory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub command: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CommandDef {
    command: BotCommand,
    patterns: &'static [&'static str],
    privileged: bool,
    spec: CommandSpec,
}

const COMMAND_DEFS: &[CommandDef] = &[
    CommandDef {
        command: BotCommand::Status,
        patterns: &["/status"],
        privileged: true,
        spec: CommandSpec {
            command: "status",
            description: "Report uptime and counters",
        },
    },
    CommandDef {
        command: BotCommand::ClearHistory,
        patterns: &["/clear", "/reset"],
        privileged: false,
        spec: CommandSpec {
            command: "clear",
            description: "Forget this channel's conversation",
        },
    },
    CommandDef {
        command: BotCommand::ShowHistory,
        patterns: &["/history"],
        privileged: false,
        spec: CommandSpec {
            command: "history",
            description: "Show the remembered turns for this channel",
        },
    },
];

/// Command list for platform-side registration.
pub fn command_specs() -> Vec<CommandSpec> {
    COMMAND_DEFS.iter().map(|def| def.spec).collect()
}

/// Parses `/command` and `/command@name` forms. A mention matches only
/// the configured bot name; with no name configured, any mention is
/// accepted.
pub fn parse_command(text: &str, bot_name: Option<&str>) -> Option<BotCommand> {
    let trimmed = text.trim();

    COMMAND_DEFS.iter().find_map(|def| {
        def.patterns
            .iter()
            .any(|pattern| command_matches(trimmed, pattern, bot_name))
            .then_some(def.command)
    })
}

pub fn requires_privilege(command: BotCommand) -> bool {
    COMMAND_DEFS
        .iter()
        .find(|def| def.command == command)
        .is_some_and(|def| def.privileged)
}

/// Name used for the single-flight slot while the command runs.
pub(crate) fn op_name(command: BotCommand) -> &'static str {
    COMMAND_DEFS
        .iter()
        .find(|def| def.command == command)
        .map_or("command", |def| def.spec.command)
}

fn command_matches(trimmed_text: &str, command: &str, bot_name: Option<&str>) -> bool {
    if trimmed_text == command {
        return true;
    }

    let Some(mention) = trimmed_text
        .strip_prefix(command)
        .and_then(|stripped| stripped.strip_prefix('@'))
    else {
        return false;
    };

    let mention = mention.split_whitespace().next().unwrap_or("");
    bot_name.is_none_or(|name| mention == name)
}
