//! Current date/time tool.

use async_trait::async_trait;
use chrono::Local;
use serde_json::{json, Value};

use super::Tool;

/// Report the local wall-clock time.
pub struct CurrentTime;

#[async_trait]
impl Tool for CurrentTime {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Return the current local date and time."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _args: Value) -> anyhow::Result<String> {
        Ok(Local::now().format("%Y-%m-%d %H:%M:%S").to_string())
    }
}
