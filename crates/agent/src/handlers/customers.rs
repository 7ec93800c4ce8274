use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::args::{field, id_of, iso_field, limit, list_data, optional_str, path_id, required_str, Form};
use crate::error::ToolError;
use crate::tools::{Tool, ToolContext};

fn customer_summary(ctx: &ToolContext, customer: &Value) -> Value {
    json!({
        "id": field(customer, "id"),
        "email": field(customer, "email"),
        "name": field(customer, "name"),
        "created": iso_field(customer, "created"),
        "dashboardUrl": ctx.dashboard_url("customers", id_of(customer)),
    })
}

pub struct CreateCustomer;

#[async_trait]
impl Tool for CreateCustomer {
    fn name(&self) -> &'static str {
        "createCustomer"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let form = Form::new()
            .set("email", required_str(args, "email")?)
            .set_opt("name", optional_str(args, "name")?)
            .set_opt("description", optional_str(args, "description")?)
            .set_opt("test_clock", optional_str(args, "testClockId")?);

        let customer = ctx.api.post("v1/customers", form.pairs()).await?;

        Ok(json!({
            "id": field(&customer, "id"),
            "email": field(&customer, "email"),
            "name": field(&customer, "name"),
            "created": iso_field(&customer, "created"),
            "testClock": field(&customer, "test_clock"),
            "dashboardUrl": ctx.dashboard_url("customers", id_of(&customer)),
        }))
    }
}

pub struct ListCustomers;

#[async_trait]
impl Tool for ListCustomers {
    fn name(&self) -> &'static str {
        "listCustomers"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let query =
            Form::new().set_opt("email", optional_str(args, "email")?).set("limit", limit(args)?);

        let customers = ctx.api.get("v1/customers", query.pairs()).await?;

        Ok(Value::Array(
            list_data(&customers).iter().map(|customer| customer_summary(ctx, customer)).collect(),
        ))
    }
}

pub struct GetCustomer;

#[async_trait]
impl Tool for GetCustomer {
    fn name(&self) -> &'static str {
        "getCustomer"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let customer_id = path_id(args, "customerId")?;
        let customer = ctx.api.get(&format!("v1/customers/{customer_id}"), &[]).await?;

        if customer.get("deleted").and_then(Value::as_bool).unwrap_or(false) {
            return Ok(json!({ "error": "The customer has been deleted." }));
        }

        Ok(json!({
            "id": field(&customer, "id"),
            "email": field(&customer, "email"),
            "name": field(&customer, "name"),
            "description": field(&customer, "description"),
            "created": iso_field(&customer, "created"),
            "testClock": field(&customer, "test_clock"),
            "dashboardUrl": ctx.dashboard_url("customers", id_of(&customer)),
        }))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use paydesk_payments::Method;

    use super::{CreateCustomer, GetCustomer, ListCustomers};
    use crate::handlers::tests::{args, context};
    use crate::tools::Tool;

    #[tokio::test]
    async fn create_customer_maps_arguments_and_normalizes_result() {
        let (api, ctx) = context(|api| {
            api.with_response(
                Method::Post,
                "v1/customers",
                json!({"id": "cus_123", "email": "taro@example.com", "name": "Taro",
                       "created": 1_705_276_800, "test_clock": "clock_1"}),
            )
        });

        let result = CreateCustomer
            .execute(
                &ctx,
                &args(json!({"email": "taro@example.com", "name": "Taro", "testClockId": "clock_1"})),
            )
            .await
            .expect("create");

        assert_eq!(result["id"], "cus_123");
        assert_eq!(result["created"], "2024-01-15T00:00:00.000Z");
        assert_eq!(result["testClock"], "clock_1");
        assert_eq!(result["dashboardUrl"], "https://dashboard.test/customers/cus_123");

        let calls = api.calls();
        assert_eq!(calls[0].param("email"), Some("taro@example.com"));
        assert_eq!(calls[0].param("test_clock"), Some("clock_1"));
        assert_eq!(calls[0].param("description"), None);
    }

    #[tokio::test]
    async fn create_customer_requires_email() {
        let (api, ctx) = context(|api| api);

        let error = CreateCustomer.execute(&ctx, &args(json!({"name": "Taro"}))).await;

        assert!(error.is_err());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn list_customers_uses_default_limit() {
        let (api, ctx) = context(|api| {
            api.with_response(
                Method::Get,
                "v1/customers",
                json!({"data": [{"id": "cus_1", "email": "a@example.com", "created": 0}]}),
            )
        });

        let result = ListCustomers.execute(&ctx, &args(json!({}))).await.expect("list");

        assert_eq!(result[0]["id"], "cus_1");
        assert_eq!(result[0]["created"], serde_json::Value::Null);
        assert_eq!(api.calls()[0].param("limit"), Some("10"));
    }

    #[tokio::test]
    async fn deleted_customer_yields_error_payload() {
        let (_, ctx) = context(|api| {
            api.with_response(Method::Get, "v1/customers/cus_9", json!({"id": "cus_9", "deleted": true}))
        });

        let result =
            GetCustomer.execute(&ctx, &args(json!({"customerId": "cus_9"}))).await.expect("get");

        assert!(result.get("error").is_some());
    }
}
