//! One handler per catalog entry. Handlers validate model arguments, issue
//! payments requests and reduce responses to compact JSON summaries.

mod args;
pub mod coupons;
pub mod customers;
pub mod invoices;
pub mod payment_methods;
pub mod prices;
pub mod products;
pub mod subscriptions;
pub mod test_clocks;

use crate::tools::ToolRegistry;

/// Registry holding a handler for every catalog operation.
pub fn payments_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::default();

    registry.register(customers::CreateCustomer);
    registry.register(customers::ListCustomers);
    registry.register(customers::GetCustomer);

    registry.register(products::CreateProduct);
    registry.register(products::ListProducts);

    registry.register(prices::CreatePrice);
    registry.register(prices::ListPrices);

    registry.register(subscriptions::CreateSubscription);
    registry.register(subscriptions::ListSubscriptions);
    registry.register(subscriptions::CancelSubscription);

    registry.register(coupons::CreateCoupon);
    registry.register(coupons::ListCoupons);
    registry.register(coupons::DeleteCoupon);

    registry.register(invoices::PreviewInvoice);
    registry.register(invoices::PreviewSubscription);

    registry.register(test_clocks::CreateTestClock);
    registry.register(test_clocks::GetTestClock);
    registry.register(test_clocks::ListTestClocks);
    registry.register(test_clocks::AdvanceTestClock);
    registry.register(test_clocks::DeleteTestClock);

    registry.register(payment_methods::CreatePaymentMethod);
    registry.register(payment_methods::AttachPaymentMethod);
    registry.register(payment_methods::ListPaymentMethods);
    registry.register(payment_methods::DetachPaymentMethod);
    registry.register(payment_methods::SetDefaultPaymentMethod);

    registry
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use serde_json::{json, Map, Value};

    use paydesk_payments::{Method, PaymentsError, RecordingPaymentsApi};

    use super::payments_registry;
    use crate::catalog::CATALOG;
    use crate::tools::ToolContext;

    pub(crate) fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    pub(crate) fn context(
        script: impl FnOnce(RecordingPaymentsApi) -> RecordingPaymentsApi,
    ) -> (Arc<RecordingPaymentsApi>, ToolContext) {
        let api = Arc::new(script(RecordingPaymentsApi::default()));
        let ctx = ToolContext::new(api.clone(), "https://dashboard.test", "jpy");
        (api, ctx)
    }

    #[test]
    fn every_catalog_entry_has_a_handler() {
        let registry = payments_registry();

        assert_eq!(registry.len(), CATALOG.len());
        assert_eq!(registry.ensure_matches(CATALOG), Ok(()));
    }

    #[tokio::test]
    async fn payments_errors_surface_as_error_outcomes() {
        let (_api, ctx) = context(|api| {
            api.respond(
                Method::Delete,
                "v1/coupons/GONE",
                Err(PaymentsError::Api {
                    status: 404,
                    kind: "invalid_request_error".to_string(),
                    code: Some("resource_missing".to_string()),
                    message: "No such coupon: 'GONE'".to_string(),
                }),
            );
            api
        });

        let outcome = payments_registry()
            .invoke(&ctx, "deleteCoupon", &args(json!({"couponId": "GONE"})))
            .await;

        assert_eq!(outcome.error_message(), Some("No such coupon: 'GONE'"));
    }

    #[tokio::test]
    async fn missing_required_argument_is_reported_by_name() {
        let (api, ctx) = context(|api| api);

        let outcome = payments_registry().invoke(&ctx, "getCustomer", &Map::new()).await;

        assert!(!outcome.is_success());
        assert!(outcome.error_message().is_some_and(|message| message.contains("customerId")));
        assert!(api.calls().is_empty());
    }
}
