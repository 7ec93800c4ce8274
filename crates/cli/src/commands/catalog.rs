use paydesk_agent::{catalog, payments_registry, CATALOG};

use crate::commands::CommandResult;

/// Prints the declarations the model sees, after confirming every one of
/// them has a handler.
pub fn run() -> CommandResult {
    if let Err(mismatch) = payments_registry().ensure_matches(CATALOG) {
        return CommandResult::failure("catalog", "catalog_parity", mismatch.to_string(), 6);
    }

    CommandResult::success_with_data(
        "catalog",
        format!("{} tools declared", CATALOG.len()),
        Some(catalog::declarations()),
    )
}
