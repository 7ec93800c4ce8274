use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::args::{
    field, id_of, iso_field, iso_from_unix, limit, list_data, optional_str, path_id,
    unix_seconds, Form,
};
use crate::error::ToolError;
use crate::tools::{Tool, ToolContext};

const TEST_CLOCKS: &str = "v1/test_helpers/test_clocks";

fn clock_summary(ctx: &ToolContext, clock: &Value) -> Value {
    json!({
        "id": field(clock, "id"),
        "name": field(clock, "name"),
        "frozenTime": iso_field(clock, "frozen_time"),
        "status": field(clock, "status"),
        "created": iso_field(clock, "created"),
        "dashboardUrl": ctx.dashboard_url("test-clocks", id_of(clock)),
    })
}

pub struct CreateTestClock;

#[async_trait]
impl Tool for CreateTestClock {
    fn name(&self) -> &'static str {
        "createTestClock"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let form = Form::new()
            .set("frozen_time", unix_seconds(args, "frozenTime")?)
            .set_opt("name", optional_str(args, "name")?);

        let clock = ctx.api.post(TEST_CLOCKS, form.pairs()).await?;

        let mut summary = clock_summary(ctx, &clock);
        summary["hint"] =
            json!("Pass this test clock's ID as testClockId when creating a customer to attach it.");
        Ok(summary)
    }
}

pub struct GetTestClock;

#[async_trait]
impl Tool for GetTestClock {
    fn name(&self) -> &'static str {
        "getTestClock"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let clock_id = path_id(args, "testClockId")?;
        let clock = ctx.api.get(&format!("{TEST_CLOCKS}/{clock_id}"), &[]).await?;
        Ok(clock_summary(ctx, &clock))
    }
}

pub struct ListTestClocks;

#[async_trait]
impl Tool for ListTestClocks {
    fn name(&self) -> &'static str {
        "listTestClocks"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let query = Form::new().set("limit", limit(args)?);
        let clocks = ctx.api.get(TEST_CLOCKS, query.pairs()).await?;

        Ok(Value::Array(list_data(&clocks).iter().map(|clock| clock_summary(ctx, clock)).collect()))
    }
}

pub struct AdvanceTestClock;

#[async_trait]
impl Tool for AdvanceTestClock {
    fn name(&self) -> &'static str {
        "advanceTestClock"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let clock_id = path_id(args, "testClockId")?;
        let frozen_time = unix_seconds(args, "frozenTime")?;
        let form = Form::new().set("frozen_time", frozen_time);

        let clock =
            ctx.api.post(&format!("{TEST_CLOCKS}/{clock_id}/advance"), form.pairs()).await?;

        let target = iso_from_unix(frozen_time).unwrap_or_else(|| frozen_time.to_string());
        Ok(json!({
            "id": field(&clock, "id"),
            "name": field(&clock, "name"),
            "frozenTime": iso_field(&clock, "frozen_time"),
            "status": field(&clock, "status"),
            "message": format!("Advancing the test clock to {target}."),
            "dashboardUrl": ctx.dashboard_url("test-clocks", id_of(&clock)),
        }))
    }
}

pub struct DeleteTestClock;

#[async_trait]
impl Tool for DeleteTestClock {
    fn name(&self) -> &'static str {
        "deleteTestClock"
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let clock_id = path_id(args, "testClockId")?;
        let deleted = ctx.api.delete(&format!("{TEST_CLOCKS}/{clock_id}")).await?;

        Ok(json!({
            "id": field(&deleted, "id"),
            "deleted": field(&deleted, "deleted"),
            "message": "The test clock and all of its customers and subscriptions were deleted.",
        }))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use paydesk_payments::Method;

    use super::{AdvanceTestClock, CreateTestClock, DeleteTestClock, GetTestClock, TEST_CLOCKS};
    use crate::handlers::tests::{args, context};
    use crate::tools::Tool;

    fn clock(status: &str, frozen_time: i64) -> serde_json::Value {
        json!({"id": "clock_1", "name": "trial run", "frozen_time": frozen_time,
               "status": status, "created": 1_705_276_800})
    }

    #[tokio::test]
    async fn create_accepts_iso_time_and_returns_hint() {
        let (api, ctx) = context(|api| {
            api.with_response(Method::Post, TEST_CLOCKS, clock("ready", 1_705_276_800))
        });

        let result = CreateTestClock
            .execute(&ctx, &args(json!({"frozenTime": "2024-01-15T00:00:00Z", "name": "trial run"})))
            .await
            .expect("create");

        assert_eq!(result["frozenTime"], "2024-01-15T00:00:00.000Z");
        assert_eq!(result["dashboardUrl"], "https://dashboard.test/test-clocks/clock_1");
        assert!(result["hint"].as_str().is_some_and(|hint| hint.contains("testClockId")));
        assert_eq!(api.calls()[0].param("frozen_time"), Some("1705276800"));
    }

    #[tokio::test]
    async fn advance_posts_to_the_advance_endpoint() {
        let (api, ctx) = context(|api| {
            api.with_response(
                Method::Post,
                "v1/test_helpers/test_clocks/clock_1/advance",
                clock("advancing", 1_705_276_800),
            )
        });

        let result = AdvanceTestClock
            .execute(&ctx, &args(json!({"testClockId": "clock_1", "frozenTime": "1707955200"})))
            .await
            .expect("advance");

        assert_eq!(result["status"], "advancing");
        assert!(result["message"]
            .as_str()
            .is_some_and(|message| message.contains("2024-02-15T00:00:00.000Z")));
        assert_eq!(api.calls()[0].param("frozen_time"), Some("1707955200"));
    }

    #[tokio::test]
    async fn get_and_delete_use_the_clock_path() {
        let (api, ctx) = context(|api| {
            api.with_response(Method::Get, "v1/test_helpers/test_clocks/clock_1", clock("ready", 1))
                .with_response(
                    Method::Delete,
                    "v1/test_helpers/test_clocks/clock_1",
                    json!({"id": "clock_1", "deleted": true}),
                )
        });

        let fetched = GetTestClock
            .execute(&ctx, &args(json!({"testClockId": "clock_1"})))
            .await
            .expect("get");
        assert_eq!(fetched["status"], "ready");

        let deleted = DeleteTestClock
            .execute(&ctx, &args(json!({"testClockId": "clock_1"})))
            .await
            .expect("delete");
        assert_eq!(deleted["deleted"], true);
        assert_eq!(api.calls().len(), 2);
    }

    #[tokio::test]
    async fn unparseable_time_is_an_argument_error() {
        let (api, ctx) = context(|api| api);

        let error = CreateTestClock
            .execute(&ctx, &args(json!({"frozenTime": "next tuesday"})))
            .await
            .expect_err("bad time");

        assert!(error.to_string().contains("frozenTime"));
        assert!(api.calls().is_empty());
    }
}
