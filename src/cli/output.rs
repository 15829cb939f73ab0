use colored::Colorize;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::RwLock;

/// Message categories used by the CLI output helpers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
    Hint,
    Section,
}

#[derive(Clone, Copy, Debug)]
pub struct OutputPreferences {
    pub color: bool,
}

impl Default for OutputPreferences {
    fn default() -> Self {
        Self { color: true }
    }
}

static PREFERENCES: Lazy<RwLock<OutputPreferences>> =
    Lazy::new(|| RwLock::new(OutputPreferences::default()));

pub fn set_preferences(prefs: OutputPreferences) {
    if !prefs.color {
        colored::control::set_override(false);
    }
    if let Ok(mut guard) = PREFERENCES.write() {
        *guard = prefs;
    }
}

fn preferences() -> OutputPreferences {
    PREFERENCES
        .read()
        .map(|guard| *guard)
        .unwrap_or_default()
}

fn build_label(kind: MessageKind) -> (&'static str, &'static str) {
    match kind {
        MessageKind::Info => ("INFO", "[i]"),
        MessageKind::Success => ("SUCCESS", "[✓]"),
        MessageKind::Warning => ("WARNING", "[!]"),
        MessageKind::Error => ("ERROR", "[x]"),
        MessageKind::Hint => ("HINT", ""),
        MessageKind::Section => ("", ""),
    }
}

pub(crate) fn apply_style(kind: MessageKind, message: impl fmt::Display, color: bool) -> String {
    let text = message.to_string();
    let formatted = match kind {
        MessageKind::Section => format!("=== {} ===", text.trim()),
        _ => {
            let (label, icon) = build_label(kind);
            if icon.is_empty() {
                format!("{label}: {text}")
            } else {
                format!("{label}: {icon} {text}")
            }
        }
    };

    if !color {
        return formatted;
    }

    match kind {
        MessageKind::Success => formatted.bright_green().to_string(),
        MessageKind::Warning => formatted.bright_yellow().to_string(),
        MessageKind::Error => formatted.bright_red().to_string(),
        MessageKind::Hint => formatted.dimmed().to_string(),
        MessageKind::Section => formatted.bold().to_string(),
        MessageKind::Info => formatted,
    }
}

pub fn print(kind: MessageKind, message: impl fmt::Display) {
    let formatted = apply_style(kind, message, preferences().color);
    match kind {
        MessageKind::Section => println!("\n{}", formatted),
        _ => println!("{}", formatted),
    }
}

pub fn info(message: impl fmt::Display) {
    print(MessageKind::Info, message);
}

pub fn success(message: impl fmt::Display) {
    print(MessageKind::Success, message);
}

pub fn warning(message: impl fmt::Display) {
    print(MessageKind::Warning, message);
}

pub fn error(message: impl fmt::Display) {
    print(MessageKind::Error, message);
}

pub fn hint(message: impl fmt::Display) {
    print(MessageKind::Hint, message);
}

pub fn section(title: impl fmt::Display) {
    print(MessageKind::Section, title);
}

/// Prints `label: value` pairs with the labels padded to a common width.
pub fn two_column(rows: &[(&str, String)]) {
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    for (label, value) in rows {
        println!("  {label:<width$}  {value}");
    }
}

/// Renders rows under a header line, each column padded to its widest cell.
pub fn table(headers: &[&str], rows: &[Vec<String>]) {
    for line in render_table(headers, rows) {
        println!("{line}");
    }
}

pub(crate) fn render_table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|header| header.chars().count()).collect();
    for row in rows {
        for (index, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(index) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }
    let render_row = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render_row(headers.to_vec()));
    lines.push(
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        lines.push(render_row(row.iter().map(String::as_str).collect()));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_style_keeps_label_and_icon() {
        assert_eq!(
            apply_style(MessageKind::Warning, "careful", false),
            "WARNING: [!] careful"
        );
        assert_eq!(apply_style(MessageKind::Hint, "try help", false), "HINT: try help");
        assert_eq!(apply_style(MessageKind::Section, " Summary ", false), "=== Summary ===");
    }

    #[test]
    fn table_columns_align_to_widest_cell() {
        let lines = render_table(
            &["ID", "Name"],
            &[
                vec!["a1".into(), "Netflix".into()],
                vec!["b2345".into(), "Gym".into()],
            ],
        );

        assert_eq!(lines[0], "ID     Name");
        assert_eq!(lines[1], "-----  -------");
        assert_eq!(lines[2], "a1     Netflix");
        assert_eq!(lines[3], "b2345  Gym");
    }
}
