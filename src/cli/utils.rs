use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// `{success, message, data?}` in JSON mode, a check-marked line otherwise
pub fn print_done(format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let mut body = json!({ "success": true, "message": message });
            if let Some(data) = data {
                body["data"] = data;
            }
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Text => println!("✓ {}", message),
    }
    Ok(())
}

/// An empty list under `key` in JSON mode, `message` otherwise
pub fn print_empty(format: &OutputFormat, key: &str, message: &str) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&json!({ key: [] }))?),
        OutputFormat::Text => println!("{}", message),
    }
    Ok(())
}
