pub mod baseline;
pub mod config;
pub mod exercise;
pub mod progress;
pub mod settings;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

pub fn print_json<T: Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse a CLI argument into one of the core's serde string enums
/// (`stress-relief`, `pre-meeting`, `light`, ...).
pub fn parse_enum<T: DeserializeOwned>(value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| format!("unrecognized value '{value}'"))
}
