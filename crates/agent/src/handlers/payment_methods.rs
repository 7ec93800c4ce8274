use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::args::{
    field, iso_field, limit, list_data, optional_str, path_id, required_i64, required_str, Form,
};
use crate::error::ToolError;
use crate::tools::{Tool, ToolContext};

fn card_summary(payment_method: &Value) -> Value {
    match payment_method.get("card") {
        Some(card) if card.is_object() => json!({
            "brand": field(card, "brand"),
            "last4": field(card, "last4"),
            "expMonth": field(card, "exp_month"),
            "expYear": field(card, "exp_year"),
        }),
        _ => Value::Null,
    }
}

pub struct CreatePaymentMethod;

#[async_trait]
impl Tool for CreatePaymentMethod {
    fn name(&self) -> &'static str {
        "createPaymentMethod"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let card_number: String =
            required_str(args, "cardNumber")?.chars().filter(|ch| !ch.is_whitespace()).collect();
        let exp_month = required_i64(args, "expMonth")?;
        if !(1..=12).contains(&exp_month) {
            return Err(ToolError::InvalidArgument {
                name: "expMonth".to_string(),
                expected: "a month between 1 and 12",
            });
        }

        let form = Form::new()
            .set("type", "card")
            .set("card[number]", card_number)
            .set("card[exp_month]", exp_month)
            .set("card[exp_year]", required_i64(args, "expYear")?)
            .set("card[cvc]", required_str(args, "cvc")?);

        let payment_method = ctx.api.post("v1/payment_methods", form.pairs()).await?;

        Ok(json!({
            "id": field(&payment_method, "id"),
            "type": field(&payment_method, "type"),
            "card": card_summary(&payment_method),
            "created": iso_field(&payment_method, "created"),
            "hint": "Use attachPaymentMethod to attach this payment method to a customer.",
        }))
    }
}

pub struct AttachPaymentMethod;

#[async_trait]
impl Tool for AttachPaymentMethod {
    fn name(&self) -> &'static str {
        "attachPaymentMethod"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let payment_method_id = path_id(args, "paymentMethodId")?;
        let customer_id = path_id(args, "customerId")?;
        let form = Form::new().set("customer", &customer_id);

        let payment_method = ctx
            .api
            .post(&format!("v1/payment_methods/{payment_method_id}/attach"), form.pairs())
            .await?;

        Ok(json!({
            "id": field(&payment_method, "id"),
            "type": field(&payment_method, "type"),
            "customerId": field(&payment_method, "customer"),
            "card": card_summary(&payment_method),
            "message": "The payment method was attached to the customer.",
            "dashboardUrl": ctx.dashboard_url("customers", &customer_id),
        }))
    }
}

pub struct ListPaymentMethods;

#[async_trait]
impl Tool for ListPaymentMethods {
    fn name(&self) -> &'static str {
        "listPaymentMethods"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let customer_id = path_id(args, "customerId")?;
        let query = Form::new()
            .set("type", optional_str(args, "type")?.unwrap_or_else(|| "card".to_string()))
            .set("limit", limit(args)?);

        let payment_methods = ctx
            .api
            .get(&format!("v1/customers/{customer_id}/payment_methods"), query.pairs())
            .await?;

        Ok(Value::Array(
            list_data(&payment_methods)
                .iter()
                .map(|payment_method| {
                    json!({
                        "id": field(payment_method, "id"),
                        "type": field(payment_method, "type"),
                        "card": card_summary(payment_method),
                        "created": iso_field(payment_method, "created"),
                    })
                })
                .collect(),
        ))
    }
}

pub struct DetachPaymentMethod;

#[async_trait]
impl Tool for DetachPaymentMethod {
    fn name(&self) -> &'static str {
        "detachPaymentMethod"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let payment_method_id = path_id(args, "paymentMethodId")?;
        let payment_method = ctx
            .api
            .post(&format!("v1/payment_methods/{payment_method_id}/detach"), &[])
            .await?;

        Ok(json!({
            "id": field(&payment_method, "id"),
            "type": field(&payment_method, "type"),
            "message": "The payment method was detached from the customer.",
        }))
    }
}

pub struct SetDefaultPaymentMethod;

#[async_trait]
impl Tool for SetDefaultPaymentMethod {
    fn name(&self) -> &'static str {
        "setDefaultPaymentMethod"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let customer_id = path_id(args, "customerId")?;
        let form = Form::new().set(
            "invoice_settings[default_payment_method]",
            path_id(args, "paymentMethodId")?,
        );

        let customer = ctx.api.post(&format!("v1/customers/{customer_id}"), form.pairs()).await?;
        let default_payment_method = customer
            .pointer("/invoice_settings/default_payment_method")
            .cloned()
            .unwrap_or(Value::Null);

        Ok(json!({
            "customerId": field(&customer, "id"),
            "defaultPaymentMethod": default_payment_method,
            "message": "The default payment method was updated.",
            "dashboardUrl": ctx.dashboard_url("customers", &customer_id),
        }))
    }
}
