//! Response envelope and pagination types shared by every endpoint.

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Envelope codes that denote success.
pub const SUCCESS_CODES: [i64; 2] = [200, 201];

/// Uniform `{code, message, data}` wrapper returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        SUCCESS_CODES.contains(&self.code)
    }

    /// Unwrap the payload, treating an absent `data` field as a malformed response.
    pub fn into_data(self) -> Result<T, ClientError> {
        self.data.ok_or_else(|| {
            ClientError::Decode(format!(
                "response envelope (code {}) carried no data",
                self.code
            ))
        })
    }
}

/// Envelope with the payload left undecoded, used to inspect `code`/`message`
/// before the typed decode.
pub type RawEnvelope = Envelope<serde_json::Value>;

/// Pagination query parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageParams {
    pub page: u32,
    pub page_size: u32,
}

impl PageParams {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn to_query(self) -> Vec<(String, String)> {
        vec![
            ("page".to_string(), self.page.to_string()),
            ("page_size".to_string(), self.page_size.to_string()),
        ]
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
        }
    }
}

/// Paginated list payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> Paginated<T> {
    pub fn is_last_page(&self) -> bool {
        self.page >= self.total_pages
    }
}
