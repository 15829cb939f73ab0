use subfox_core::{SessionEvent, UserSession};

use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::{CommandEntry, CommandGroup};

const GROUP: CommandGroup = CommandGroup::Session;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        GROUP.command(
            "login",
            "Start a session and load the user's subscriptions",
            "login <user> [token]",
            cmd_login,
        ),
        GROUP.command(
            "logout",
            "End the session and clear the in-memory collection",
            "logout",
            cmd_logout,
        ),
    ]
}

fn cmd_login(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (user, token) = match args {
        [user] => (*user, None),
        [user, token] => (*user, Some(*token)),
        _ => {
            return Err(CommandError::InvalidArguments(
                "usage: login <user> [token]".into(),
            ))
        }
    };
    let mut session = UserSession::new(user);
    if let Some(token) = token {
        session = session.with_access_token(token);
    }

    let outcome = context
        .runtime
        .block_on(context.controller.handle(SessionEvent::UserAvailable(session)))?;
    let Some(outcome) = outcome else {
        output::info(format!("Already logged in as {user}."));
        return Ok(());
    };

    output::success(format!(
        "Logged in as {user}; {} subscription{} loaded.",
        outcome.value,
        if outcome.value == 1 { "" } else { "s" }
    ));
    if context.engine()?.context().is_sandbox() {
        output::hint("Sandbox session: changes stay on this device.");
    }
    context.report_advisory(&outcome);
    Ok(())
}

fn cmd_logout(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let Some(user) = context.controller.current_user().cloned() else {
        output::info("No active session.");
        return Ok(());
    };
    context
        .runtime
        .block_on(context.controller.handle(SessionEvent::UserAbsent))?;
    output::success(format!("Logged out {user}."));
    Ok(())
}
