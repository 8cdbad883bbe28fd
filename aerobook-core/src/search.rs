use serde::{Deserialize, Serialize};
use chrono::NaiveDate;

use crate::{CoreError, CoreResult};

fn default_page() -> u32 { 1 }
fn default_page_size() -> u32 { 20 }

/// A single paged flight search. Immutable once submitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchRequest {
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate, // Just date, departure time is ignored for matching
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl SearchRequest {
    pub fn validate(&self) -> CoreResult<()> {
        if self.origin.trim().is_empty() || self.destination.trim().is_empty() {
            return Err(CoreError::ValidationError("origin and destination are required".to_string()));
        }
        if self.page == 0 {
            return Err(CoreError::ValidationError("page starts at 1".to_string()));
        }
        if self.page_size == 0 {
            return Err(CoreError::ValidationError("page_size must be positive".to_string()));
        }
        Ok(())
    }

    /// Deterministic key for the external result cache
    pub fn cache_key(&self) -> String {
        format!(
            "flights:{}:{}:{}:{}:{}",
            self.origin,
            self.destination,
            self.date.format("%Y-%m-%d"),
            self.page,
            self.page_size
        )
    }

    pub fn offset(&self) -> u64 {
        (self.page.saturating_sub(1) as u64) * self.page_size as u64
    }

    pub fn limit(&self) -> u64 {
        self.page_size as u64
    }
}
