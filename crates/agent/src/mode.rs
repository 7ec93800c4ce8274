//! System instructions per chat mode. Advisory only: nothing here prevents a
//! mutating call while in simulation mode.

use paydesk_core::domain::chat::ChatMode;

const BASE_INSTRUCTIONS: &str = "\
You are an assistant for operating a payments account in test mode. Translate
the user's requests into calls to the available functions and report the
results clearly.

Available operations:
- Customers: create, list, retrieve
- Products and prices: create and list; prices may be one-off or recurring
- Subscriptions: create, list, cancel (at period end by default)
- Coupons: create (percentOff or amountOff), list, delete
- Previews: previewInvoice and previewSubscription price a change without creating anything
- Test clocks: create, retrieve, list, advance, delete
- Payment methods: create from test card details, attach, list, detach, set as default

Payment methods:
- Only test cards work, e.g. 4242424242424242 (Visa) or 5555555555554444 (Mastercard).
- A new payment method must be attached to a customer before it can be made the default.

Test clocks:
- Create the clock first, then create customers with testClockId to attach them.
- Advancing a clock bills attached subscriptions as if time had passed.
- Deleting a clock deletes its customers and subscriptions.

Conventions:
- Amounts are in the smallest currency unit. The default currency is {currency}.
- Include the dashboardUrl of created or retrieved resources in your answer.
- When an operation fails, explain the error and suggest a fix.
- Always reply in the language the user wrote in.";

const SIMULATION_INSTRUCTIONS: &str = "\
Current mode: SIMULATION.
- Prefer previewInvoice and previewSubscription to show the effect of a change.
- Before any operation that creates, updates or deletes data, describe what
  would happen and ask the user to confirm.
- State clearly that results are a simulation and that nothing was changed.";

const ACTUAL_INSTRUCTIONS: &str = "\
Current mode: ACTUAL.
- Operations are executed for real and change data on the account.
- Confirm with the user before destructive operations such as cancelling
  subscriptions or deleting coupons and test clocks.
- Report exactly what was executed and its result.";

/// Instructions for `mode`. `default_currency` must match what the handlers
/// fall back to when the model omits a currency.
pub fn instructions_for(mode: ChatMode, default_currency: &str) -> String {
    let mode_block = match mode {
        ChatMode::Simulation => SIMULATION_INSTRUCTIONS,
        ChatMode::Actual => ACTUAL_INSTRUCTIONS,
    };
    let base = BASE_INSTRUCTIONS.replace("{currency}", &default_currency.to_ascii_lowercase());
    format!("{base}\n\n{mode_block}")
}

#[cfg(test)]
mod tests {
    use paydesk_core::domain::chat::ChatMode;

    use super::instructions_for;

    #[test]
    fn simulation_mode_steers_toward_previews() {
        let instructions = instructions_for(ChatMode::Simulation, "jpy");

        assert!(instructions.contains("SIMULATION"));
        assert!(instructions.contains("previewSubscription"));
        assert!(!instructions.contains("Current mode: ACTUAL"));
    }

    #[test]
    fn actual_mode_still_asks_for_confirmation_before_destructive_calls() {
        let instructions = instructions_for(ChatMode::Actual, "jpy");

        assert!(instructions.contains("Current mode: ACTUAL"));
        assert!(instructions.contains("Confirm with the user"));
    }

    #[test]
    fn configured_currency_is_announced() {
        let instructions = instructions_for(ChatMode::Simulation, "USD");

        assert!(instructions.contains("The default currency is usd."));
        assert!(!instructions.contains("jpy"));
        assert!(!instructions.contains("{currency}"));
    }

    #[test]
    fn instructions_are_stable_per_mode() {
        assert_eq!(instructions_for(ChatMode::Actual, "jpy"), instructions_for(ChatMode::Actual, "jpy"));
        assert_ne!(instructions_for(ChatMode::Actual, "jpy"), instructions_for(ChatMode::Simulation, "jpy"));
    }
}
