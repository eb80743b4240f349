use serde::{Deserialize, Serialize};

/// Error body returned by every JSON endpoint: `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}
