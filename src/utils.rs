//! Helpers for pulling tool arguments out of MCP requests

use crate::mcp::protocol::{error_codes, Response};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{from_value, Number, Value};
use std::fmt;

/// Deserializes `args[key]` into `T`, or answers the request with `INVALID_PARAMS`.
pub fn get_required_arg<T: DeserializeOwned>(
    args: &Value,
    key: &str,
    req_id: &Value,
) -> Result<T, Response> {
    from_value(args.get(key).cloned().unwrap_or(Value::Null)).map_err(|_| {
        Response::error(
            req_id.clone(),
            error_codes::INVALID_PARAMS,
            format!("Missing or invalid required argument: '{}'", key),
        )
    })
}

/// A transfer amount as sent by an agent: either `"1.5"` or `1.5`.
/// Forwarded as text; the staging server does the decimal validation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AmountArg {
    Text(String),
    Number(Number),
}

impl fmt::Display for AmountArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountArg::Text(s) => f.write_str(s),
            AmountArg::Number(n) => write!(f, "{}", n),
        }
    }
}
