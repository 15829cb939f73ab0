pub mod session;
pub mod subscriptions;
pub mod system;

use crate::cli::registry::CommandRegistry;

/// Every shell command, in help order.
pub(crate) fn registry() -> CommandRegistry {
    CommandRegistry::with_entries(
        session::definitions()
            .into_iter()
            .chain(subscriptions::definitions())
            .chain(system::definitions()),
    )
}
