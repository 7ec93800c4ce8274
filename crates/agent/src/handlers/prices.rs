use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::args::{
    field, id_of, limit, list_data, optional_bool, optional_i64, optional_str, path_id,
    required_i64, Form,
};
use crate::error::ToolError;
use crate::tools::{Tool, ToolContext};

const INTERVALS: &[&str] = &["day", "week", "month", "year"];

fn recurring(price: &Value) -> Value {
    match price.get("recurring") {
        Some(recurring) if recurring.is_object() => json!({
            "interval": field(recurring, "interval"),
            "intervalCount": field(recurring, "interval_count"),
        }),
        _ => Value::Null,
    }
}

fn price_summary(ctx: &ToolContext, price: &Value) -> Value {
    json!({
        "id": field(price, "id"),
        "unitAmount": field(price, "unit_amount"),
        "currency": field(price, "currency"),
        "recurring": recurring(price),
        "nickname": field(price, "nickname"),
        "dashboardUrl": ctx.dashboard_url("prices", id_of(price)),
    })
}

pub struct CreatePrice;

#[async_trait]
impl Tool for CreatePrice {
    fn name(&self) -> &'static str {
        "createPrice"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let product_id = path_id(args, "productId")?;
        let unit_amount = required_i64(args, "unitAmount")?;
        if unit_amount < 0 {
            return Err(ToolError::InvalidArgument {
                name: "unitAmount".to_string(),
                expected: "zero or a positive integer",
            });
        }
        let currency = optional_str(args, "currency")?
            .unwrap_or_else(|| ctx.default_currency.clone())
            .to_ascii_lowercase();

        let mut form = Form::new()
            .set("product", product_id)
            .set("unit_amount", unit_amount)
            .set("currency", currency)
            .set_opt("nickname", optional_str(args, "nickname")?);

        if let Some(interval) = optional_str(args, "recurringInterval")? {
            let interval = interval.to_ascii_lowercase();
            if !INTERVALS.contains(&interval.as_str()) {
                return Err(ToolError::InvalidArgument {
                    name: "recurringInterval".to_string(),
                    expected: "one of day, week, month, year",
                });
            }
            let interval_count = optional_i64(args, "recurringIntervalCount")?.unwrap_or(1).max(1);
            form = form
                .set("recurring[interval]", interval)
                .set("recurring[interval_count]", interval_count);
        }

        let price = ctx.api.post("v1/prices", form.pairs()).await?;
        Ok(price_summary(ctx, &price))
    }
}

pub struct ListPrices;

#[async_trait]
impl Tool for ListPrices {
    fn name(&self) -> &'static str {
        "listPrices"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let query = Form::new()
            .set_opt("product", optional_str(args, "productId")?)
            .set_opt("active", optional_bool(args, "active")?)
            .set("limit", limit(args)?)
            .set("expand[]", "data.product");

        let prices = ctx.api.get("v1/prices", query.pairs()).await?;

        Ok(Value::Array(
            list_data(&prices)
                .iter()
                .map(|price| {
                    let mut summary = price_summary(ctx, price);
                    let product_name = price
                        .get("product")
                        .filter(|product| product.is_object())
                        .map_or(Value::Null, |product| field(product, "name"));
                    summary["productName"] = product_name;
                    summary
                })
                .collect(),
        ))
    }
}
