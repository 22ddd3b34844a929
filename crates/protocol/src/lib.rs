use anyhow::Result;
use serde::{Deserialize, Serialize};

pub mod request_path;

pub use request_path::{clean_request_path, is_root};

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Envelope returned by every JSON endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct JsonResponse {
    pub status: u16,
    pub error: String,
    pub result: ResponseResult,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ResponseResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: 200,
            error: String::new(),
            result: ResponseResult {
                message: Some(message.into()),
                data: None,
            },
        }
    }

    pub fn error(status: u16, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            result: ResponseResult::default(),
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.result.data = Some(data);
        self
    }
}

/// Body of `POST /movies/setdir`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SetDirectoryRequest {
    #[serde(rename = "filepath")]
    pub path: String,
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}
