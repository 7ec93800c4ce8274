use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::args::{
    field, id_of, iso_field, limit, list_data, optional_bool, optional_i64, optional_str,
    path_id, Form,
};
use crate::error::ToolError;
use crate::tools::{Tool, ToolContext};

/// Billing period bounds moved from the subscription onto its items in newer
/// API versions; read whichever is present.
fn period_field(subscription: &Value, key: &str) -> Value {
    let top_level = iso_field(subscription, key);
    if !top_level.is_null() {
        return top_level;
    }

    subscription
        .get("items")
        .map(list_data)
        .and_then(|items| items.first())
        .map_or(Value::Null, |item| iso_field(item, key))
}

fn subscription_summary(ctx: &ToolContext, subscription: &Value) -> Value {
    json!({
        "id": field(subscription, "id"),
        "status": field(subscription, "status"),
        "currentPeriodStart": period_field(subscription, "current_period_start"),
        "currentPeriodEnd": period_field(subscription, "current_period_end"),
        "dashboardUrl": ctx.dashboard_url("subscriptions", id_of(subscription)),
    })
}

pub struct CreateSubscription;

#[async_trait]
impl Tool for CreateSubscription {
    fn name(&self) -> &'static str {
        "createSubscription"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let form = Form::new()
            .set("customer", path_id(args, "customerId")?)
            .set("items[0][price]", path_id(args, "priceId")?)
            .set_opt(
                "trial_period_days",
                optional_i64(args, "trialPeriodDays")?.filter(|days| *days > 0),
            )
            .set_opt("discounts[0][coupon]", optional_str(args, "couponId")?);

        let subscription = ctx.api.post("v1/subscriptions", form.pairs()).await?;

        let mut summary = subscription_summary(ctx, &subscription);
        summary["trialEnd"] = iso_field(&subscription, "trial_end");
        Ok(summary)
    }
}

pub struct ListSubscriptions;

#[async_trait]
impl Tool for ListSubscriptions {
    fn name(&self) -> &'static str {
        "listSubscriptions"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let query = Form::new()
            .set_opt("customer", optional_str(args, "customerId")?)
            .set_opt("status", optional_str(args, "status")?)
            .set("limit", limit(args)?);

        let subscriptions = ctx.api.get("v1/subscriptions", query.pairs()).await?;

        Ok(Value::Array(
            list_data(&subscriptions)
                .iter()
                .map(|subscription| subscription_summary(ctx, subscription))
                .collect(),
        ))
    }
}

pub struct CancelSubscription;

#[async_trait]
impl Tool for CancelSubscription {
    fn name(&self) -> &'static str {
        "cancelSubscription"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let subscription_id = path_id(args, "subscriptionId")?;
        let path = format!("v1/subscriptions/{subscription_id}");

        // Only an explicit `false` cancels immediately.
        if optional_bool(args, "cancelAtPeriodEnd")? == Some(false) {
            let canceled = ctx.api.delete(&path).await?;
            return Ok(json!({
                "id": field(&canceled, "id"),
                "status": field(&canceled, "status"),
                "canceledAt": iso_field(&canceled, "canceled_at"),
                "dashboardUrl": ctx.dashboard_url("subscriptions", id_of(&canceled)),
            }));
        }

        let form = Form::new().set("cancel_at_period_end", true);
        let scheduled = ctx.api.post(&path, form.pairs()).await?;

        Ok(json!({
            "id": field(&scheduled, "id"),
            "status": field(&scheduled, "status"),
            "cancelAtPeriodEnd": field(&scheduled, "cancel_at_period_end"),
            "cancelAt": iso_field(&scheduled, "cancel_at"),
            "dashboardUrl": ctx.dashboard_url("subscriptions", id_of(&scheduled)),
        }))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use paydesk_payments::Method;

    use super::{CancelSubscription, CreateSubscription, ListSubscriptions};
    use crate::handlers::tests::{args, context};
    use crate::tools::Tool;

    #[tokio::test]
    async fn create_subscription_sends_items_trial_and_coupon() {
        let (api, ctx) = context(|api| {
            api.with_response(
                Method::Post,
                "v1/subscriptions",
                json!({"id": "sub_1", "status": "trialing", "trial_end": 1_705_276_800,
                       "items": {"data": [{"current_period_start": 1_705_276_800,
                                           "current_period_end": 1_707_955_200}]}}),
            )
        });

        let result = CreateSubscription
            .execute(
                &ctx,
                &args(json!({"customerId": "cus_1", "priceId": "price_1",
                             "trialPeriodDays": 14, "couponId": "SUMMER"})),
            )
            .await
            .expect("create");

        assert_eq!(result["status"], "trialing");
        assert_eq!(result["trialEnd"], "2024-01-15T00:00:00.000Z");
        assert_eq!(result["currentPeriodEnd"], "2024-02-15T00:00:00.000Z");
        let call = &api.calls()[0];
        assert_eq!(call.param("items[0][price]"), Some("price_1"));
        assert_eq!(call.param("trial_period_days"), Some("14"));
        assert_eq!(call.param("discounts[0][coupon]"), Some("SUMMER"));
    }

    #[tokio::test]
    async fn cancel_defaults_to_period_end() {
        let (api, ctx) = context(|api| {
            api.with_response(
                Method::Post,
                "v1/subscriptions/sub_1",
                json!({"id": "sub_1", "status": "active", "cancel_at_period_end": true,
                       "cancel_at": 1_707_955_200}),
            )
        });

        let result = CancelSubscription
            .execute(&ctx, &args(json!({"subscriptionId": "sub_1"})))
            .await
            .expect("cancel");

        assert_eq!(result["cancelAtPeriodEnd"], true);
        assert_eq!(result["cancelAt"], "2024-02-15T00:00:00.000Z");
        assert_eq!(api.calls()[0].param("cancel_at_period_end"), Some("true"));
    }

    #[tokio::test]
    async fn cancel_immediately_when_period_end_is_false() {
        let (api, ctx) = context(|api| {
            api.with_response(
                Method::Delete,
                "v1/subscriptions/sub_1",
                json!({"id": "sub_1", "status": "canceled", "canceled_at": 1_705_276_800}),
            )
        });

        let result = CancelSubscription
            .execute(&ctx, &args(json!({"subscriptionId": "sub_1", "cancelAtPeriodEnd": false})))
            .await
            .expect("cancel");

        assert_eq!(result["status"], "canceled");
        assert_eq!(result["canceledAt"], "2024-01-15T00:00:00.000Z");
        assert_eq!(api.calls()[0].method, Method::Delete);
    }

    #[tokio::test]
    async fn list_subscriptions_forwards_filters() {
        let (api, ctx) = context(|api| {
            api.with_response(Method::Get, "v1/subscriptions", json!({"data": [{"id": "sub_1"}]}))
        });

        let result = ListSubscriptions
            .execute(&ctx, &args(json!({"customerId": "cus_1", "status": "active", "limit": 5})))
            .await
            .expect("list");

        assert_eq!(result[0]["dashboardUrl"], "https://dashboard.test/subscriptions/sub_1");
        let call = &api.calls()[0];
        assert_eq!(call.param("customer"), Some("cus_1"));
        assert_eq!(call.param("status"), Some("active"));
        assert_eq!(call.param("limit"), Some("5"));
    }
}
