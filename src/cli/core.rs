//! Core CLI loop, dispatch, and shell context helpers.

use std::{io, sync::Arc};

use subfox_config::{app_data_dir, ConfigError, ConfigManager};
use subfox_core::{CoreError, SessionController, SyncAdvisory, SyncEngine, Synced};
use subfox_domain::{CurrencyCode, Subscription, SubscriptionId, ValidationError};
use subfox_remote::LiveFactory;
use subfox_storage_json::JsonCacheStore;
use tokio::runtime::Builder;
use tracing::debug;

pub use crate::errors::CliError;

use super::commands;
use super::output::{self, OutputPreferences};
use super::registry::CommandEntry;
pub use super::shell_context::{CliMode, ShellContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

/// Printed length of record ids in listings; any unique prefix is accepted
/// wherever an id is expected.
pub(crate) const SHORT_ID_LEN: usize = 8;

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let registry = commands::registry();

        let data_dir = app_data_dir();
        let config_manager = ConfigManager::with_base_dir(data_dir.clone())?;
        let mut config = config_manager.load()?;
        config.apply_env();
        config.validate()?;
        output::set_preferences(OutputPreferences {
            color: config.ui_color_enabled && std::env::var_os("NO_COLOR").is_none(),
        });

        let cache = Arc::new(JsonCacheStore::new(config.resolve_cache_dir(&data_dir))?);
        let controller = SessionController::new(
            cache.clone(),
            Arc::new(LiveFactory::new(config.remote.clone())),
            config.sandbox_user.clone(),
        );
        let runtime = Builder::new_current_thread().enable_all().build()?;
        debug!(data_dir = %data_dir.display(), ?mode, "shell context ready");

        Ok(ShellContext {
            mode,
            registry,
            runtime,
            controller,
            cache,
            config_manager,
            config,
            data_dir,
        })
    }

    pub(crate) fn prompt(&self) -> String {
        match self.controller.current_user() {
            Some(user) => format!("subfox({user})> "),
            None => "subfox> ".to_string(),
        }
    }

    pub(crate) fn command_names(&self) -> Vec<&'static str> {
        self.registry.names().collect()
    }

    pub(crate) fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.registry.get(name)
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(handler) = self.registry.get(command).map(|entry| entry.handler) {
            match handler(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));

        if let Some(best) = self.registry.suggest(input) {
            output::info(format!("Suggestion: `{}`?", best));
        }
    }

    pub(crate) fn report_error(&self, err: CommandError) -> Result<(), CliError> {
        match err {
            CommandError::ExitRequested => Ok(()),
            CommandError::InvalidArguments(message) => {
                self.print_error(&message);
                self.print_hint("Use `help <command>` for usage details.");
                Ok(())
            }
            CommandError::NoSession => {
                self.print_error("No active session. Use `login <user>` first.");
                self.print_hint(&format!(
                    "Try `login {}` to work offline.",
                    self.config.sandbox_user
                ));
                Ok(())
            }
            other => {
                self.print_error(&other.to_string());
                Ok(())
            }
        }
    }

    pub(crate) fn print_error(&self, message: &str) {
        output::error(message);
    }

    pub(crate) fn print_warning(&self, message: &str) {
        output::warning(message);
    }

    pub(crate) fn print_hint(&self, message: &str) {
        output::hint(message);
    }

    /// Engine of the logged-in user.
    pub(crate) fn engine(&self) -> Result<SyncEngine, CommandError> {
        self.controller
            .engine()
            .cloned()
            .ok_or(CommandError::NoSession)
    }

    pub(crate) fn default_currency(&self) -> Result<CurrencyCode, CommandError> {
        Ok(CurrencyCode::parse(&self.config.default_currency)?)
    }

    /// Resolves a full id or a unique id prefix against the collection.
    pub(crate) fn resolve_id(
        &self,
        engine: &SyncEngine,
        input: &str,
    ) -> Result<SubscriptionId, CommandError> {
        let candidate = SubscriptionId::from(input);
        if engine.get(&candidate).is_some() {
            return Ok(candidate);
        }
        match_prefix(&engine.list(), input)
    }

    /// Prints the advisory attached to an engine result, if any.
    pub(crate) fn report_advisory<T>(&self, outcome: &Synced<T>) {
        match &outcome.advisory {
            None => {}
            Some(SyncAdvisory::StaleData { reason }) => {
                self.print_warning(&format!("Showing cached data; remote unavailable ({reason})."));
            }
            Some(SyncAdvisory::NotSynced { ids, reason }) => {
                self.print_warning(&format!(
                    "Saved locally but not synced ({} record{}): {reason}",
                    ids.len(),
                    if ids.len() == 1 { "" } else { "s" }
                ));
            }
        }
    }
}

pub(crate) fn match_prefix(
    records: &[Subscription],
    input: &str,
) -> Result<SubscriptionId, CommandError> {
    let matches: Vec<&Subscription> = records
        .iter()
        .filter(|record| record.id.as_str().starts_with(input))
        .collect();
    match matches.as_slice() {
        [single] => Ok(single.id.clone()),
        [] => Err(CommandError::InvalidArguments(format!(
            "no subscription matches id `{input}`"
        ))),
        _ => Err(CommandError::InvalidArguments(format!(
            "id `{input}` is ambiguous; use more characters"
        ))),
    }
}

pub(crate) fn short_id(id: &SubscriptionId) -> String {
    id.as_str().chars().take(SHORT_ID_LEN).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("No active session. Use `login <user>` first.")]
    NoSession,
    #[error("{0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Core(CoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("exit requested")]
    ExitRequested,
}

impl From<CoreError> for CommandError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NoSession => CommandError::NoSession,
            CoreError::Validation(err) => CommandError::Validation(err),
            other => CommandError::Core(other),
        }
    }
}

impl From<CommandError> for CliError {
    fn from(err: CommandError) -> Self {
        CliError::Command(err.to_string())
    }
}
