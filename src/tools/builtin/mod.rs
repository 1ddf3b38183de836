//! Builtin tools selected with `tool_name = "builtin"`

pub mod current_time;

pub use current_time::CurrentTimeTool;

use super::{Tool, ToolError};

/// Instantiate the builtin tool registered under `tool_name`
pub fn create(tool_name: &str) -> Result<Box<dyn Tool>, ToolError> {
    match tool_name {
        "current_time" => Ok(Box::new(CurrentTimeTool::new())),
        _ => Err(ToolError::UnknownTool(tool_name.to_string())),
    }
}
