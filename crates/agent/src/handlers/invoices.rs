//! Invoice previews. Both operations price a hypothetical invoice and create
//! nothing on the account.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::args::{field, list_data, optional_str, path_id, Form};
use crate::error::ToolError;
use crate::tools::{Tool, ToolContext};

const PREVIEW_PATH: &str = "v1/invoices/create_preview";

fn preview_form(
    customer_id: &str,
    subscription_id: Option<String>,
    price_id: Option<String>,
    coupon_id: Option<String>,
) -> Form {
    Form::new()
        .set("customer", customer_id)
        .set_opt("subscription", subscription_id)
        .set_opt("subscription_details[items][0][price]", price_id)
        .set_opt("discounts[0][coupon]", coupon_id)
        .set("expand[]", "discounts")
}

/// First applied discount, or null. Discounts are only objects when expanded.
fn first_discount(invoice: &Value) -> Value {
    let Some(discount) = invoice
        .get("discounts")
        .and_then(Value::as_array)
        .and_then(|discounts| discounts.first())
    else {
        return Value::Null;
    };

    let coupon = discount
        .get("coupon")
        .or_else(|| discount.pointer("/source/coupon"))
        .filter(|coupon| coupon.is_object());

    match coupon {
        Some(coupon) => json!({
            "couponId": field(coupon, "id"),
            "couponName": field(coupon, "name"),
            "percentOff": field(coupon, "percent_off"),
            "amountOff": field(coupon, "amount_off"),
        }),
        None => json!({
            "couponId": Value::Null,
            "couponName": Value::Null,
            "percentOff": Value::Null,
            "amountOff": Value::Null,
        }),
    }
}

fn lines(invoice: &Value, with_quantity: bool) -> Value {
    let lines = invoice.get("lines").map(list_data).unwrap_or_default();
    Value::Array(
        lines
            .iter()
            .map(|line| {
                let mut entry = json!({
                    "description": field(line, "description"),
                    "amount": field(line, "amount"),
                });
                if with_quantity {
                    entry["quantity"] = field(line, "quantity");
                }
                entry
            })
            .collect(),
    )
}

pub struct PreviewInvoice;

#[async_trait]
impl Tool for PreviewInvoice {
    fn name(&self) -> &'static str {
        "previewInvoice"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let customer_id = path_id(args, "customerId")?;
        let form = preview_form(
            &customer_id,
            optional_str(args, "subscriptionId")?,
            optional_str(args, "priceId")?,
            optional_str(args, "couponId")?,
        );

        let invoice = ctx.api.post(PREVIEW_PATH, form.pairs()).await?;

        Ok(json!({
            "subtotal": field(&invoice, "subtotal"),
            "total": field(&invoice, "total"),
            "amountDue": field(&invoice, "amount_due"),
            "currency": field(&invoice, "currency"),
            "discount": first_discount(&invoice),
            "lines": lines(&invoice, true),
            "customerDashboardUrl": ctx.dashboard_url("customers", &customer_id),
        }))
    }
}

pub struct PreviewSubscription;

#[async_trait]
impl Tool for PreviewSubscription {
    fn name(&self) -> &'static str {
        "previewSubscription"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let customer_id = path_id(args, "customerId")?;
        let form = preview_form(
            &customer_id,
            None,
            Some(path_id(args, "priceId")?),
            optional_str(args, "couponId")?,
        );

        let invoice = ctx.api.post(PREVIEW_PATH, form.pairs()).await?;

        Ok(json!({
            "message": "Simulation result. No subscription has been created.",
            "subtotal": field(&invoice, "subtotal"),
            "total": field(&invoice, "total"),
            "currency": field(&invoice, "currency"),
            "discount": first_discount(&invoice),
            "lines": lines(&invoice, false),
            "customerDashboardUrl": ctx.dashboard_url("customers", &customer_id),
        }))
    }
}
