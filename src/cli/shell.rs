//! Line sources for the shell: stdin in script mode, a `rustyline` editor
//! otherwise.

use std::io::{self, BufRead};

use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    history::DefaultHistory,
    Cmd, Context, Editor, Helper, Highlighter, Hinter, KeyEvent, Validator,
};

use crate::cli::core::{CliError, CliMode, CommandError, LoopControl, ShellContext};
use crate::cli::output;

/// Set to any value to read commands from stdin without a line editor.
pub const SCRIPT_ENV: &str = "SUBFOX_CLI_SCRIPT";

pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_ENV).is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };
    let mut context = ShellContext::new(mode)?;

    match mode {
        CliMode::Script => {
            for line in io::stdin().lock().lines() {
                if execute(&mut context, &line?)? == LoopControl::Exit {
                    break;
                }
            }
            Ok(())
        }
        CliMode::Interactive => {
            output::info("SubFox shell. Type `help` to list commands.");
            interactive(&mut context)
        }
    }
}

fn interactive(context: &mut ShellContext) -> Result<(), CliError> {
    let mut editor = Editor::<CommandCompleter, DefaultHistory>::new()?;
    editor.set_helper(Some(CommandCompleter {
        names: context.command_names(),
    }));
    editor.bind_sequence(KeyEvent::from('?'), Cmd::Complete);

    loop {
        match editor.readline(&context.prompt()) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    editor.add_history_entry(line.trim()).ok();
                }
                if execute(context, &line)? == LoopControl::Exit {
                    return Ok(());
                }
            }
            Err(ReadlineError::Interrupted) => {
                output::hint("Type `exit` or press Ctrl-D to leave.");
            }
            Err(ReadlineError::Eof) => {
                output::info("Exiting shell.");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Runs one input line. Command failures are reported here and never end
/// the loop.
fn execute(context: &mut ShellContext, line: &str) -> Result<LoopControl, CliError> {
    match run_line(context, line) {
        Ok(control) => Ok(control),
        Err(err) => {
            context.report_error(err)?;
            Ok(LoopControl::Continue)
        }
    }
}

fn run_line(context: &mut ShellContext, line: &str) -> Result<LoopControl, CommandError> {
    let tokens = match tokenize(line) {
        Ok(tokens) => tokens,
        Err(message) => {
            context.print_warning(&message);
            return Ok(LoopControl::Continue);
        }
    };
    let Some((command, rest)) = tokens.split_first() else {
        return Ok(LoopControl::Continue);
    };
    let args: Vec<&str> = rest.iter().map(String::as_str).collect();
    context.dispatch(&command.to_lowercase(), command, &args)
}

/// Splits a line into shell words. Blank lines and `#` comments yield no
/// tokens.
pub(crate) fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(Vec::new());
    }
    shell_words::split(trimmed).map_err(|err| format!("Could not parse input: {err}"))
}

/// Completes the command word; arguments are left alone.
#[derive(Helper, Highlighter, Hinter, Validator)]
struct CommandCompleter {
    names: Vec<&'static str>,
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let typed = &line[..pos];
        let start = typed.len() - typed.trim_start().len();
        let word = &typed[start..];
        if word.contains(char::is_whitespace) {
            return Ok((pos, Vec::new()));
        }
        let needle = word.to_ascii_lowercase();
        let candidates = self
            .names
            .iter()
            .filter(|name| name.starts_with(&needle))
            .map(|name| Pair {
                display: name.to_string(),
                replacement: name.to_string(),
            })
            .collect();
        Ok((start, candidates))
    }
}
