use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::args::{field, id_of, limit, list_data, optional_bool, optional_str, required_str, Form};
use crate::error::ToolError;
use crate::tools::{Tool, ToolContext};

fn product_summary(ctx: &ToolContext, product: &Value) -> Value {
    json!({
        "id": field(product, "id"),
        "name": field(product, "name"),
        "description": field(product, "description"),
        "active": field(product, "active"),
        "dashboardUrl": ctx.dashboard_url("products", id_of(product)),
    })
}

pub struct CreateProduct;

#[async_trait]
impl Tool for CreateProduct {
    fn name(&self) -> &'static str {
        "createProduct"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let form = Form::new()
            .set("name", required_str(args, "name")?)
            .set_opt("description", optional_str(args, "description")?)
            .set("active", optional_bool(args, "active")?.unwrap_or(true));

        let product = ctx.api.post("v1/products", form.pairs()).await?;
        Ok(product_summary(ctx, &product))
    }
}

pub struct ListProducts;

#[async_trait]
impl Tool for ListProducts {
    fn name(&self) -> &'static str {
        "listProducts"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let query =
            Form::new().set_opt("active", optional_bool(args, "active")?).set("limit", limit(args)?);

        let products = ctx.api.get("v1/products", query.pairs()).await?;
        Ok(Value::Array(list_data(&products).iter().map(|product| product_summary(ctx, product)).collect()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use paydesk_payments::Method;

    use super::{CreateProduct, ListProducts};
    use crate::handlers::tests::{args, context};
    use crate::tools::Tool;

    #[tokio::test]
    async fn products_are_active_unless_disabled() {
        let (api, ctx) = context(|api| {
            api.with_response(
                Method::Post,
                "v1/products",
                json!({"id": "prod_1", "name": "Pro", "active": true}),
            )
        });

        let result =
            CreateProduct.execute(&ctx, &args(json!({"name": "Pro"}))).await.expect("create");

        assert_eq!(result["dashboardUrl"], "https://dashboard.test/products/prod_1");
        assert_eq!(api.calls()[0].param("active"), Some("true"));
    }

    #[tokio::test]
    async fn list_products_forwards_active_filter_and_clamps_limit() {
        let (api, ctx) = context(|api| api.with_response(Method::Get, "v1/products", json!({"data": []})));

        let result = ListProducts
            .execute(&ctx, &args(json!({"active": false, "limit": 1000})))
            .await
            .expect("list");

        assert_eq!(result, json!([]));
        assert_eq!(api.calls()[0].param("active"), Some("false"));
        assert_eq!(api.calls()[0].param("limit"), Some("100"));
    }
}
