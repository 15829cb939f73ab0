use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::help;
use crate::cli::output;
use crate::cli::registry::{CommandEntry, CommandGroup};
use crate::utils::build_info;

const GROUP: CommandGroup = CommandGroup::Shell;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        GROUP.command(
            "config",
            "Show the effective configuration",
            "config show",
            cmd_config,
        ),
        GROUP.command("version", "Show build metadata", "version", cmd_version),
        GROUP.command(
            "help",
            "Show available commands",
            "help [command]",
            cmd_help,
        ),
        GROUP.command("exit", "Exit the shell", "exit", cmd_exit),
    ]
}

fn cmd_config(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args {
        [] | ["show"] => {}
        _ => {
            return Err(CommandError::InvalidArguments(
                "usage: config show".into(),
            ))
        }
    }

    let config = &context.config;
    let remote = &config.remote;
    output::section("Configuration");
    output::two_column(&[
        (
            "Config file",
            context.config_manager.config_path().display().to_string(),
        ),
        ("Data dir", context.data_dir.display().to_string()),
        ("Cache file", context.cache.path().display().to_string()),
        (
            "Remote URL",
            remote.url.clone().unwrap_or_else(|| "not set".into()),
        ),
        (
            "Anon key",
            if remote.anon_key.is_some() { "set" } else { "not set" }.to_string(),
        ),
        ("Table", remote.table.clone()),
        (
            "Timeouts",
            format!(
                "{}s request, {}s connect",
                remote.timeout_secs, remote.connect_timeout_secs
            ),
        ),
        ("Sandbox user", config.sandbox_user.clone()),
        ("Currency", config.default_currency.clone()),
        ("Color", config.ui_color_enabled.to_string()),
    ]);
    if !remote.is_configured() {
        output::hint("Set SUBFOX_REMOTE_URL and SUBFOX_ANON_KEY to sync with a backend.");
    }
    Ok(())
}

fn cmd_version(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let meta = build_info::current();
    output::section(format!("SubFox {}", meta.version));
    output::two_column(&meta.rows());
    Ok(())
}

fn cmd_help(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if let Some(command) = args.first().map(|name| name.to_lowercase()) {
        if let Some(command) = context.command(&command) {
            help::print_command(command);
        } else {
            context.suggest_command(args[0]);
        }
        return Ok(());
    }

    help::print_overview(&context.registry);
    Ok(())
}

fn cmd_exit(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    Err(CommandError::ExitRequested)
}
