//! JSON envelopes for the remote provider protocol.
//!
//! A request is POSTed as `{method, params, settings?}` and answered with either
//! `{result}` or `{error: {code, message, data?}}`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProviderSettings;

/// The three provider methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMethod {
    Capabilities,
    Items,
    Annotations,
}

impl ProviderMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderMethod::Capabilities => "capabilities",
            ProviderMethod::Items => "items",
            ProviderMethod::Annotations => "annotations",
        }
    }
}

impl fmt::Display for ProviderMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRequest {
    pub method: ProviderMethod,
    pub params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<ProviderSettings>,
}

/// Error reported by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderErrorBody {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Response envelope. When both fields are present the error wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ProviderErrorBody>,
}

impl ProviderResponse {
    pub fn success(result: Value) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(error: ProviderErrorBody) -> Self {
        Self {
            result: None,
            error: Some(error),
        }
    }

    /// Split the envelope into the result value (`Null` when absent) or the
    /// provider-reported error.
    pub fn into_result(self) -> Result<Value, ProviderErrorBody> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}
