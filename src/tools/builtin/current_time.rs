//! `current_time` tool
//!
//! Returns the current system time, local by default. Both the strftime
//! format and the UTC switch can be set per call or as defaults in the tool's
//! config table.

use crate::tools::{Tool, ToolDescription, ToolError};
use async_trait::async_trait;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, TimeZone, Utc};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Call parameters
#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CurrentTimeParams {
    /// strftime-style format string, e.g. "%H:%M"
    #[serde(default)]
    pub format: Option<String>,
    /// Report UTC instead of the server's local time
    #[serde(default)]
    pub utc: Option<bool>,
}

pub struct CurrentTimeTool {
    default_format: String,
    default_utc: bool,
}

impl Default for CurrentTimeTool {
    fn default() -> Self {
        Self::new()
    }
}

impl CurrentTimeTool {
    pub fn new() -> Self {
        Self {
            default_format: DEFAULT_TIME_FORMAT.to_string(),
            default_utc: false,
        }
    }

    fn parameter_schema() -> Value {
        let schema = schemars::schema_for!(CurrentTimeParams);
        serde_json::to_value(schema).unwrap_or_else(|_| json!({"type": "object"}))
    }

    /// Parse a format string up front; chrono panics when formatting with an
    /// invalid specifier.
    fn parse_format(format: &str) -> Result<Vec<Item<'_>>, ToolError> {
        let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            return Err(ToolError::ExecutionError(format!(
                "invalid time format '{format}'"
            )));
        }
        Ok(items)
    }

    fn render<Tz>(now: &DateTime<Tz>, format: &str) -> Result<String, ToolError>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let items = Self::parse_format(format)?;
        Ok(now.format_with_items(items.iter()).to_string())
    }
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "current_time".to_string(),
            description: "Get the current system time. Defaults to local time formatted as \
                          YYYY-MM-DD HH:MM:SS."
                .to_string(),
            parameters: Self::parameter_schema(),
        }
    }

    async fn initialize(&mut self, config: Option<&Value>) -> Result<(), ToolError> {
        let Some(config) = config else {
            return Ok(());
        };

        let defaults: CurrentTimeParams = serde_json::from_value(config.clone())
            .map_err(|e| ToolError::InitializationError(e.to_string()))?;

        if let Some(format) = defaults.format {
            Self::parse_format(&format)
                .map_err(|e| ToolError::InitializationError(e.to_string()))?;
            self.default_format = format;
        }
        if let Some(utc) = defaults.utc {
            self.default_utc = utc;
        }
        Ok(())
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let params: CurrentTimeParams = if parameters.is_null() {
            CurrentTimeParams::default()
        } else {
            serde_json::from_value(parameters.clone())
                .map_err(|e| ToolError::ValidationError(e.to_string()))?
        };

        let format = params.format.as_deref().unwrap_or(&self.default_format);
        let utc = params.utc.unwrap_or(self.default_utc);

        let (formatted, timezone, timestamp) = if utc {
            let now = Utc::now();
            (Self::render(&now, format)?, "UTC".to_string(), now.timestamp())
        } else {
            let now = Local::now();
            (
                Self::render(&now, format)?,
                now.offset().to_string(),
                now.timestamp(),
            )
        };

        Ok(json!({
            "current_time": formatted,
            "timezone": timezone,
            "unix_timestamp": timestamp,
        }))
    }
}
