use crate::cli::output;
use crate::cli::registry::{CommandEntry, CommandGroup, CommandRegistry};

pub fn print_overview(registry: &CommandRegistry) {
    for group in CommandGroup::ALL {
        let rows: Vec<(&str, String)> = registry
            .in_group(group)
            .map(|entry| (entry.name, entry.summary.to_string()))
            .collect();
        if rows.is_empty() {
            continue;
        }
        output::section(group.title());
        output::two_column(&rows);
    }
    output::hint("Use `help <command>` for details.");
}

pub fn print_command(entry: &CommandEntry) {
    output::section(format!("Help: {}", entry.name));
    output::two_column(&[
        ("summary", entry.summary.to_string()),
        ("usage", entry.usage.to_string()),
        ("group", entry.group.title().to_string()),
    ]);
}
