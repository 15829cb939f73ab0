use std::path::Path;

use chrono::Local;
use subfox_core::SubscriptionForm;
use subfox_domain::{format_amount, Subscription};
use subfox_storage_json::{export_to_dir, read_import_file};

use crate::cli::core::{short_id, CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::{CommandEntry, CommandGroup};

const FORM_FLAGS: &str =
    "[--currency C] [--recurrence R] [--tags \"a, b\"] [--icon I] [--start YYYY-MM-DD]";

const GROUP: CommandGroup = CommandGroup::Subscriptions;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        GROUP.command("list", "List subscriptions", "list", cmd_list),
        GROUP.command(
            "add",
            "Add a subscription",
            "add <name> <amount> [--currency C] [--recurrence R] [--tags \"a, b\"] [--icon I] [--start YYYY-MM-DD]",
            cmd_add,
        ),
        GROUP.command(
            "update",
            "Change fields of a subscription",
            "update <id> [--name N] [--amount A] [--currency C] [--recurrence R] [--tags \"a, b\"] [--icon I] [--start YYYY-MM-DD]",
            cmd_update,
        ),
        GROUP.command("remove", "Delete a subscription", "remove <id>", cmd_remove),
        GROUP.command(
            "import",
            "Add every entry of a JSON backup file",
            "import <file>",
            cmd_import,
        ),
        GROUP.command(
            "export",
            "Write the collection to subfox_backup_<date>.json",
            "export [dir]",
            cmd_export,
        ),
        GROUP.command(
            "summary",
            "Show monthly and yearly spend",
            "summary",
            cmd_summary,
        ),
        GROUP.command(
            "refresh",
            "Reload the collection from the remote store",
            "refresh",
            cmd_refresh,
        ),
    ]
}

fn cmd_list(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let records = context.engine()?.list();
    if records.is_empty() {
        output::info("No subscriptions yet. Use `add` to create one.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = records.iter().map(list_row).collect();
    output::table(
        &["ID", "Name", "Amount", "Recurrence", "Monthly", "Tags"],
        &rows,
    );
    Ok(())
}

fn list_row(record: &Subscription) -> Vec<String> {
    vec![
        short_id(&record.id),
        record.name.clone(),
        format_amount(record.amount, &record.currency),
        record.recurrence.label().to_string(),
        format_amount(record.monthly_equivalent(), &record.currency),
        if record.tags.is_empty() {
            "-".to_string()
        } else {
            record.tags.join(", ")
        },
    ]
}

fn cmd_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (positional, mut form) = parse_form_args(args)?;
    let [name, amount] = positional.as_slice() else {
        return Err(usage_error(format!("add <name> <amount> {FORM_FLAGS}")));
    };
    form.name = Some(name.to_string());
    form.amount = Some(amount.to_string());

    let engine = context.engine()?;
    let draft = form.into_draft(&context.default_currency()?)?;
    let outcome = context.block_on(engine.add(draft))?;
    output::success(format!(
        "Added {} ({}).",
        outcome.value.name,
        short_id(&outcome.value.id)
    ));
    context.report_advisory(&outcome);
    Ok(())
}

fn cmd_update(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (positional, form) = parse_form_args(args)?;
    let [raw_id] = positional.as_slice() else {
        return Err(usage_error("update <id> [--name N] [--amount A] ...".into()));
    };
    if form == SubscriptionForm::default() {
        return Err(CommandError::InvalidArguments(
            "nothing to update; pass at least one field flag".into(),
        ));
    }

    let engine = context.engine()?;
    let patch = form.into_patch()?;
    let id = context.resolve_id(&engine, raw_id)?;
    let outcome = context.block_on(engine.update(&id, patch))?;
    output::success(format!("Updated {}.", outcome.value.name));
    context.report_advisory(&outcome);
    Ok(())
}

fn cmd_remove(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [raw_id] = args else {
        return Err(usage_error("remove <id>".into()));
    };
    let engine = context.engine()?;
    if !engine
        .list()
        .iter()
        .any(|record| record.id.as_str().starts_with(raw_id))
    {
        output::info(format!("No subscription matches `{raw_id}`; nothing removed."));
        return Ok(());
    }

    let id = context.resolve_id(&engine, raw_id)?;
    let outcome = context.block_on(engine.remove(&id))?;
    match &outcome.value {
        Some(removed) => output::success(format!("Removed {}.", removed.name)),
        None => output::info("Nothing removed."),
    }
    context.report_advisory(&outcome);
    Ok(())
}

fn cmd_import(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [file] = args else {
        return Err(usage_error("import <file>".into()));
    };
    let engine = context.engine()?;
    let drafts = read_import_file(Path::new(file))?;
    let outcome = context.block_on(engine.import(drafts))?;
    output::success(format!(
        "Imported {} subscription{}.",
        outcome.value,
        if outcome.value == 1 { "" } else { "s" }
    ));
    context.report_advisory(&outcome);
    Ok(())
}

fn cmd_export(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let dir = match args {
        [] => ".",
        [dir] => *dir,
        _ => return Err(usage_error("export [dir]".into())),
    };
    let records = context.engine()?.list();
    let path = export_to_dir(Path::new(dir), &records, Local::now().date_naive())?;
    output::success(format!(
        "Exported {} subscription{} to {}",
        records.len(),
        if records.len() == 1 { "" } else { "s" },
        path.display()
    ));
    Ok(())
}

fn cmd_summary(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let summary = context.engine()?.summary();
    if summary.count == 0 {
        output::info("No subscriptions yet.");
        return Ok(());
    }
    let currency = context.default_currency()?;

    output::section("Summary");
    output::two_column(&[
        ("Subscriptions", summary.count.to_string()),
        ("Monthly total", format_amount(summary.total_monthly, &currency)),
        ("Yearly total", format_amount(summary.total_yearly, &currency)),
    ]);

    output::section("Monthly by tag");
    let tags: Vec<(&str, String)> = summary
        .by_tag
        .iter()
        .map(|(tag, amount)| (tag.as_str(), format_amount(*amount, &currency)))
        .collect();
    output::two_column(&tags);

    output::section("Monthly by currency");
    let currencies: Vec<(&str, String)> = summary
        .by_currency
        .iter()
        .map(|(code, amount)| (code.as_str(), format_amount(*amount, code)))
        .collect();
    output::two_column(&currencies);
    Ok(())
}

fn cmd_refresh(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let engine = context.engine()?;
    let outcome = context.block_on(engine.refresh())?;
    if outcome.is_synced() {
        output::success(format!(
            "Refreshed {} subscription{}.",
            outcome.value,
            if outcome.value == 1 { "" } else { "s" }
        ));
    }
    context.report_advisory(&outcome);
    Ok(())
}

fn usage_error(usage: String) -> CommandError {
    CommandError::InvalidArguments(format!("usage: {usage}"))
}

/// Splits positional arguments from `--flag value` pairs and collects the
/// flags into a form.
pub(crate) fn parse_form_args<'a>(
    args: &[&'a str],
) -> Result<(Vec<&'a str>, SubscriptionForm), CommandError> {
    let mut positional = Vec::new();
    let mut form = SubscriptionForm::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let Some(flag) = arg.strip_prefix("--") else {
            positional.push(*arg);
            continue;
        };
        let value = iter.next().ok_or_else(|| {
            CommandError::InvalidArguments(format!("flag `--{flag}` expects a value"))
        })?;
        let slot = match flag {
            "name" => &mut form.name,
            "amount" => &mut form.amount,
            "currency" => &mut form.currency,
            "recurrence" => &mut form.recurrence,
            "tags" => &mut form.tags,
            "icon" => &mut form.icon,
            "start" => &mut form.start_date,
            other => {
                return Err(CommandError::InvalidArguments(format!(
                    "unknown flag `--{other}`"
                )))
            }
        };
        *slot = Some(value.to_string());
    }
    Ok((positional, form))
}
