/*
 * Responsibility
 * - Generic response envelope {message, success, data?}
 * - Used by every body that is not an auth response, errors included
 */
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct MessageResponse<T = Value> {
    pub message: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl MessageResponse<Value> {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
            data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
            data: None,
        }
    }
}

impl<T> MessageResponse<T> {
    pub fn success_with(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            success: true,
            data: Some(data),
        }
    }

    pub fn error_with(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            success: false,
            data: Some(data),
        }
    }
}
