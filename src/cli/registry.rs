//! Command table of the shell, grouped the way `help` lists it.

use strsim::levenshtein;

use crate::cli::core::CommandResult;
use crate::cli::shell_context::ShellContext;

pub type CommandHandler = fn(&mut ShellContext, &[&str]) -> CommandResult;

/// Largest edit distance at which an unknown command still gets a suggestion.
const SUGGESTION_DISTANCE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandGroup {
    Session,
    Subscriptions,
    Shell,
}

impl CommandGroup {
    pub const ALL: [CommandGroup; 3] = [
        CommandGroup::Session,
        CommandGroup::Subscriptions,
        CommandGroup::Shell,
    ];

    pub fn command(
        self,
        name: &'static str,
        summary: &'static str,
        usage: &'static str,
        handler: CommandHandler,
    ) -> CommandEntry {
        CommandEntry {
            group: self,
            name,
            summary,
            usage,
            handler,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            CommandGroup::Session => "Session",
            CommandGroup::Subscriptions => "Subscriptions",
            CommandGroup::Shell => "Shell",
        }
    }
}

pub struct CommandEntry {
    pub group: CommandGroup,
    pub name: &'static str,
    pub summary: &'static str,
    pub usage: &'static str,
    pub handler: CommandHandler,
}

#[derive(Default)]
pub struct CommandRegistry {
    entries: Vec<CommandEntry>,
}

impl CommandRegistry {
    /// Builds the table; a later entry replaces an earlier one of the same name.
    pub fn with_entries(entries: impl IntoIterator<Item = CommandEntry>) -> Self {
        let mut registry = Self::default();
        for entry in entries {
            match registry.entries.iter_mut().find(|e| e.name == entry.name) {
                Some(slot) => *slot = entry,
                None => registry.entries.push(entry),
            }
        }
        registry
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.name)
    }

    pub fn in_group(&self, group: CommandGroup) -> impl Iterator<Item = &CommandEntry> + '_ {
        self.entries.iter().filter(move |entry| entry.group == group)
    }

    /// Closest command name to a mistyped one, if any is close enough.
    pub fn suggest(&self, input: &str) -> Option<&'static str> {
        let needle = input.to_lowercase();
        self.names()
            .map(|name| (levenshtein(name, &needle), name))
            .filter(|(distance, _)| *distance <= SUGGESTION_DISTANCE)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, name)| name)
    }
}
