//! Declarations of every operation the model may call.
//!
//! The catalog is a process-wide constant handed to the provider unchanged on
//! every round; [`crate::tools::ToolRegistry::ensure_matches`] keeps it in
//! step with the registered handlers.

use serde_json::{json, Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub param_type: ParamType,
    pub description: &'static str,
    pub required: bool,
}

const fn required(
    name: &'static str,
    param_type: ParamType,
    description: &'static str,
) -> ParameterSpec {
    ParameterSpec { name, param_type, description, required: true }
}

const fn optional(
    name: &'static str,
    param_type: ParamType,
    description: &'static str,
) -> ParameterSpec {
    ParameterSpec { name, param_type, description, required: false }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: &'static [ParameterSpec],
}

impl ToolDefinition {
    /// JSON-schema object describing the parameters.
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        for parameter in self.parameters {
            properties.insert(
                parameter.name.to_string(),
                json!({
                    "type": parameter.param_type.as_str(),
                    "description": parameter.description,
                }),
            );
        }

        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));

        let required: Vec<&str> = self.required_parameters().collect();
        if !required.is_empty() {
            schema.insert("required".to_string(), json!(required));
        }

        Value::Object(schema)
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &'static str> {
        self.parameters.iter().filter(|parameter| parameter.required).map(|parameter| parameter.name)
    }
}

const LIMIT: ParameterSpec =
    optional("limit", ParamType::Integer, "Number of records to return (1-100, default 10).");

pub static CATALOG: &[ToolDefinition] = &[
    ToolDefinition {
        name: "createCustomer",
        description: "Create a new customer. Pass testClockId to attach the customer to a test clock.",
        parameters: &[
            required("email", ParamType::String, "Customer email address."),
            optional("name", ParamType::String, "Customer name."),
            optional("description", ParamType::String, "Free-form description of the customer."),
            optional(
                "testClockId",
                ParamType::String,
                "Test clock ID (starts with clock_) to attach the customer to.",
            ),
        ],
    },
    ToolDefinition {
        name: "listCustomers",
        description: "List customers, optionally filtered by email address.",
        parameters: &[optional("email", ParamType::String, "Only return customers with this email."), LIMIT],
    },
    ToolDefinition {
        name: "getCustomer",
        description: "Retrieve a single customer by ID.",
        parameters: &[required("customerId", ParamType::String, "Customer ID (starts with cus_).")],
    },
    ToolDefinition {
        name: "createProduct",
        description: "Create a new product.",
        parameters: &[
            required("name", ParamType::String, "Product name."),
            optional("description", ParamType::String, "Product description."),
            optional("active", ParamType::Boolean, "Whether the product is available (default true)."),
        ],
    },
    ToolDefinition {
        name: "listProducts",
        description: "List products.",
        parameters: &[optional("active", ParamType::Boolean, "Only return active or inactive products."), LIMIT],
    },
    ToolDefinition {
        name: "createPrice",
        description: "Create a one-off or recurring price for a product.",
        parameters: &[
            required("productId", ParamType::String, "Product ID (starts with prod_)."),
            required(
                "unitAmount",
                ParamType::Integer,
                "Amount in the smallest currency unit (yen for jpy, cents for usd).",
            ),
            optional("currency", ParamType::String, "Three-letter currency code, e.g. jpy or usd."),
            optional(
                "recurringInterval",
                ParamType::String,
                "Billing interval for subscriptions: day, week, month or year. Omit for one-off prices.",
            ),
            optional("recurringIntervalCount", ParamType::Integer, "Number of intervals between billings (default 1)."),
            optional("nickname", ParamType::String, "Internal nickname for the price."),
        ],
    },
    ToolDefinition {
        name: "listPrices",
        description: "List prices, optionally for one product.",
        parameters: &[
            optional("productId", ParamType::String, "Only return prices for this product."),
            optional("active", ParamType::Boolean, "Only return active or inactive prices."),
            LIMIT,
        ],
    },
    ToolDefinition {
        name: "createSubscription",
        description: "Subscribe a customer to a recurring price.",
        parameters: &[
            required("customerId", ParamType::String, "Customer ID."),
            required("priceId", ParamType::String, "Recurring price ID."),
            optional("trialPeriodDays", ParamType::Integer, "Length of the free trial in days."),
            optional("couponId", ParamType::String, "Coupon to apply to the subscription."),
        ],
    },
    ToolDefinition {
        name: "listSubscriptions",
        description: "List subscriptions.",
        parameters: &[
            optional("customerId", ParamType::String, "Only return subscriptions for this customer."),
            optional("status", ParamType::String, "Filter by status: active, canceled, past_due, trialing, all."),
            LIMIT,
        ],
    },
    ToolDefinition {
        name: "cancelSubscription",
        description: "Cancel a subscription at period end or immediately.",
        parameters: &[
            required("subscriptionId", ParamType::String, "Subscription ID."),
            optional(
                "cancelAtPeriodEnd",
                ParamType::Boolean,
                "true (default) cancels at the end of the current period, false cancels immediately.",
            ),
        ],
    },
    ToolDefinition {
        name: "createCoupon",
        description: "Create a discount coupon. Use either percentOff or amountOff.",
        parameters: &[
            optional("percentOff", ParamType::Number, "Percentage discount (1-100). Excludes amountOff."),
            optional("amountOff", ParamType::Integer, "Fixed discount amount. Excludes percentOff."),
            optional("currency", ParamType::String, "Currency of amountOff."),
            required("duration", ParamType::String, "How long the discount applies: once, repeating or forever."),
            optional("durationInMonths", ParamType::Integer, "Number of months when duration is repeating."),
            optional("name", ParamType::String, "Coupon name shown to customers."),
            optional("maxRedemptions", ParamType::Integer, "Maximum number of times the coupon can be redeemed."),
        ],
    },
    ToolDefinition {
        name: "listCoupons",
        description: "List coupons.",
        parameters: &[LIMIT],
    },
    ToolDefinition {
        name: "deleteCoupon",
        description: "Delete a coupon.",
        parameters: &[required("couponId", ParamType::String, "Coupon ID.")],
    },
    ToolDefinition {
        name: "previewInvoice",
        description: "[Simulation] Preview the next invoice for a customer, including discounts. Creates nothing.",
        parameters: &[
            required("customerId", ParamType::String, "Customer ID."),
            optional("subscriptionId", ParamType::String, "Existing subscription to preview."),
            optional("priceId", ParamType::String, "Price of a new subscription to preview."),
            optional("couponId", ParamType::String, "Coupon to simulate."),
        ],
    },
    ToolDefinition {
        name: "previewSubscription",
        description: "[Simulation] Preview what a subscription would cost. No subscription is created.",
        parameters: &[
            required("customerId", ParamType::String, "Customer ID."),
            required("priceId", ParamType::String, "Price ID."),
            optional("couponId", ParamType::String, "Coupon to simulate."),
        ],
    },
    ToolDefinition {
        name: "createTestClock",
        description: "Create a test clock frozen at a point in time to exercise subscription lifecycles.",
        parameters: &[
            required(
                "frozenTime",
                ParamType::String,
                "Time to freeze at, as ISO 8601 (e.g. 2024-01-15T00:00:00Z) or a Unix timestamp.",
            ),
            optional("name", ParamType::String, "Test clock name."),
        ],
    },
    ToolDefinition {
        name: "getTestClock",
        description: "Retrieve a test clock.",
        parameters: &[required("testClockId", ParamType::String, "Test clock ID (starts with clock_).")],
    },
    ToolDefinition {
        name: "listTestClocks",
        description: "List test clocks.",
        parameters: &[LIMIT],
    },
    ToolDefinition {
        name: "advanceTestClock",
        description: "Advance a test clock. Attached subscriptions are billed as time passes.",
        parameters: &[
            required("testClockId", ParamType::String, "Test clock ID."),
            required(
                "frozenTime",
                ParamType::String,
                "Target time, as ISO 8601 or a Unix timestamp. Must be later than the current frozen time.",
            ),
        ],
    },
    ToolDefinition {
        name: "deleteTestClock",
        description: "Delete a test clock together with its customers and subscriptions.",
        parameters: &[required("testClockId", ParamType::String, "Test clock ID.")],
    },
    ToolDefinition {
        name: "createPaymentMethod",
        description: "Create a card payment method from test card details. Test mode only.",
        parameters: &[
            required("cardNumber", ParamType::String, "Test card number, e.g. 4242424242424242."),
            required("expMonth", ParamType::Integer, "Expiry month (1-12)."),
            required("expYear", ParamType::Integer, "Expiry year, e.g. 2030."),
            required("cvc", ParamType::String, "Card security code, e.g. 123."),
        ],
    },
    ToolDefinition {
        name: "attachPaymentMethod",
        description: "Attach a payment method to a customer.",
        parameters: &[
            required("paymentMethodId", ParamType::String, "Payment method ID (starts with pm_)."),
            required("customerId", ParamType::String, "Customer ID (starts with cus_)."),
        ],
    },
    ToolDefinition {
        name: "listPaymentMethods",
        description: "List a customer's payment methods.",
        parameters: &[
            required("customerId", ParamType::String, "Customer ID."),
            optional("type", ParamType::String, "Payment method type, e.g. card (default) or customer_balance."),
            LIMIT,
        ],
    },
    ToolDefinition {
        name: "detachPaymentMethod",
        description: "Detach a payment method from its customer.",
        parameters: &[required("paymentMethodId", ParamType::String, "Payment method ID.")],
    },
    ToolDefinition {
        name: "setDefaultPaymentMethod",
        description: "Set the default payment method used for a customer's invoices.",
        parameters: &[
            required("customerId", ParamType::String, "Customer ID."),
            required("paymentMethodId", ParamType::String, "Payment method ID to make the default."),
        ],
    },
];

pub fn find(name: &str) -> Option<&'static ToolDefinition> {
    CATALOG.iter().find(|definition| definition.name == name)
}

/// The catalog as a JSON array of `{name, description, parameters}`.
pub fn declarations() -> Value {
    Value::Array(
        CATALOG
            .iter()
            .map(|definition| {
                json!({
                    "name": definition.name,
                    "description": definition.description,
                    "parameters": definition.parameters_schema(),
                })
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use super::{declarations, find, CATALOG};

    #[test]
    fn catalog_names_are_unique() {
        let names: HashSet<&str> = CATALOG.iter().map(|definition| definition.name).collect();

        assert_eq!(names.len(), CATALOG.len());
        assert_eq!(CATALOG.len(), 25);
    }

    #[test]
    fn schema_lists_required_parameters() {
        let schema = find("createPrice").expect("createPrice").parameters_schema();

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["productId", "unitAmount"]));
        assert_eq!(schema["properties"]["unitAmount"]["type"], "integer");
        assert_eq!(schema["properties"]["currency"]["type"], "string");
    }

    #[test]
    fn schema_omits_required_when_everything_is_optional() {
        let schema = find("listCoupons").expect("listCoupons").parameters_schema();

        assert!(schema.get("required").is_none());
        assert_eq!(schema["properties"]["limit"]["type"], "integer");
    }

    #[test]
    fn declarations_are_identical_across_calls() {
        let first = serde_json::to_string(&declarations()).expect("serialize");
        let second = serde_json::to_string(&declarations()).expect("serialize");

        assert_eq!(first, second);
    }
}
