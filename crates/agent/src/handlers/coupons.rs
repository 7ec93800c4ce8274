use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::args::{
    field, id_of, limit, list_data, optional_f64, optional_i64, optional_str, path_id,
    required_str, Form,
};
use crate::error::ToolError;
use crate::tools::{Tool, ToolContext};

const DURATIONS: &[&str] = &["once", "repeating", "forever"];

pub struct CreateCoupon;

#[async_trait]
impl Tool for CreateCoupon {
    fn name(&self) -> &'static str {
        "createCoupon"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let duration = required_str(args, "duration")?.to_ascii_lowercase();
        if !DURATIONS.contains(&duration.as_str()) {
            return Err(ToolError::InvalidArgument {
                name: "duration".to_string(),
                expected: "one of once, repeating, forever",
            });
        }

        let mut form = Form::new().set("duration", &duration);

        match (optional_f64(args, "percentOff")?, optional_i64(args, "amountOff")?) {
            (Some(percent_off), None) => {
                if !(percent_off > 0.0 && percent_off <= 100.0) {
                    return Err(ToolError::InvalidArgument {
                        name: "percentOff".to_string(),
                        expected: "a number greater than 0 and at most 100",
                    });
                }
                form = form.set("percent_off", percent_off);
            }
            (None, Some(amount_off)) => {
                if amount_off <= 0 {
                    return Err(ToolError::InvalidArgument {
                        name: "amountOff".to_string(),
                        expected: "a positive integer",
                    });
                }
                let currency = optional_str(args, "currency")?
                    .unwrap_or_else(|| ctx.default_currency.clone())
                    .to_ascii_lowercase();
                form = form.set("amount_off", amount_off).set("currency", currency);
            }
            (Some(_), Some(_)) => {
                return Err(ToolError::Rejected(
                    "Specify either percentOff or amountOff, not both.".to_string(),
                ))
            }
            (None, None) => {
                return Err(ToolError::Rejected(
                    "Either percentOff or amountOff is required.".to_string(),
                ))
            }
        }

        let duration_in_months = optional_i64(args, "durationInMonths")?;
        if duration == "repeating" {
            match duration_in_months {
                Some(months) if months > 0 => form = form.set("duration_in_months", months),
                _ => {
                    return Err(ToolError::Rejected(
                        "durationInMonths is required when duration is repeating.".to_string(),
                    ))
                }
            }
        }

        let form = form
            .set_opt("name", optional_str(args, "name")?)
            .set_opt("max_redemptions", optional_i64(args, "maxRedemptions")?);

        let coupon = ctx.api.post("v1/coupons", form.pairs()).await?;

        Ok(json!({
            "id": field(&coupon, "id"),
            "name": field(&coupon, "name"),
            "percentOff": field(&coupon, "percent_off"),
            "amountOff": field(&coupon, "amount_off"),
            "currency": field(&coupon, "currency"),
            "duration": field(&coupon, "duration"),
            "durationInMonths": field(&coupon, "duration_in_months"),
            "dashboardUrl": ctx.dashboard_url("coupons", id_of(&coupon)),
        }))
    }
}

pub struct ListCoupons;

#[async_trait]
impl Tool for ListCoupons {
    fn name(&self) -> &'static str {
        "listCoupons"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let query = Form::new().set("limit", limit(args)?);
        let coupons = ctx.api.get("v1/coupons", query.pairs()).await?;

        Ok(Value::Array(
            list_data(&coupons)
                .iter()
                .map(|coupon| {
                    json!({
                        "id": field(coupon, "id"),
                        "name": field(coupon, "name"),
                        "percentOff": field(coupon, "percent_off"),
                        "amountOff": field(coupon, "amount_off"),
                        "currency": field(coupon, "currency"),
                        "duration": field(coupon, "duration"),
                        "valid": field(coupon, "valid"),
                        "dashboardUrl": ctx.dashboard_url("coupons", id_of(coupon)),
                    })
                })
                .collect(),
        ))
    }
}

pub struct DeleteCoupon;

#[async_trait]
impl Tool for DeleteCoupon {
    fn name(&self) -> &'static str {
        "deleteCoupon"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let coupon_id = path_id(args, "couponId")?;
        let deleted = ctx.api.delete(&format!("v1/coupons/{coupon_id}")).await?;

        Ok(json!({
            "id": field(&deleted, "id"),
            "deleted": field(&deleted, "deleted"),
        }))
    }
}
