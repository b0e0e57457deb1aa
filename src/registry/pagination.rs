//! Pagination Cursor Store
//!
//! Maps opaque page tokens to resume offsets. Cursors expire after a TTL and
//! the store is bounded; the oldest cursor is evicted when it is full.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for list pagination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaginationConfig {
    /// Page size used when the caller passes 0
    pub default_page_size: usize,
    /// Larger requested page sizes are clamped to this
    pub max_page_size: usize,
    /// Cursor lifetime in seconds
    pub token_ttl_secs: u64,
    /// Maximum number of live cursors
    pub max_cursors: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 250,
            token_ttl_secs: 3600,
            max_cursors: 10_000,
        }
    }
}

impl PaginationConfig {
    /// Reject page sizes that would keep a listing from advancing
    pub fn check(&self) -> Result<()> {
        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(Error::Configuration(
                "page sizes must be at least 1".into(),
            ));
        }
        if self.max_page_size < self.default_page_size {
            return Err(Error::Configuration(format!(
                "maxPageSize {} is below defaultPageSize {}",
                self.max_page_size, self.default_page_size
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Page Window
// =============================================================================

/// Resolved slice of a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: usize,
    pub size: usize,
}

impl PageWindow {
    /// Cut this window out of `items`, reporting whether elements remain past it
    pub fn apply<T>(&self, mut items: Vec<T>) -> (Vec<T>, bool) {
        if self.offset >= items.len() {
            return (Vec::new(), false);
        }
        let end = self.offset.saturating_add(self.size);
        let has_more = end < items.len();
        items.truncate(end.min(items.len()));
        (items.split_off(self.offset), has_more)
    }

    /// Offset of the page following this one
    pub fn next_offset(&self) -> usize {
        self.offset + self.size
    }
}

// =============================================================================
// Cursor Store
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct Cursor {
    offset: usize,
    created_at: DateTime<Utc>,
}

/// Server-side store of page tokens
pub struct PaginationStore {
    config: PaginationConfig,
    cursors: Mutex<HashMap<String, Cursor>>,
}

impl PaginationStore {
    pub fn new(config: PaginationConfig) -> Self {
        Self {
            config,
            cursors: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve page size and token into a window
    pub fn resolve(&self, page_size: i32, page_token: Option<&str>) -> Result<PageWindow> {
        let size = match page_size {
            n if n < 0 => return Err(Error::InvalidPageSize(n)),
            0 => self.config.default_page_size,
            n => (n as usize).min(self.config.max_page_size),
        }
        .max(1);

        let offset = match page_token.filter(|t| !t.is_empty()) {
            None => 0,
            Some(token) => {
                let cursor = self.cursors.lock().get(token).copied();
                match cursor {
                    Some(cursor) if !self.is_expired(&cursor, Utc::now()) => {
                        debug!("Found offset {} from pagination token {}", cursor.offset, token);
                        cursor.offset
                    }
                    _ => {
                        return Err(Error::InvalidPageToken {
                            token: token.to_string(),
                        })
                    }
                }
            }
        };

        Ok(PageWindow { offset, size })
    }

    /// Mint a token that resumes at `offset`
    pub fn mint(&self, offset: usize) -> String {
        let now = Utc::now();
        let token = uuid::Uuid::new_v4().to_string();

        let mut cursors = self.cursors.lock();
        cursors.retain(|_, cursor| !self.is_expired(cursor, now));
        if cursors.len() >= self.config.max_cursors {
            let oldest = cursors
                .iter()
                .min_by_key(|(_, cursor)| cursor.created_at)
                .map(|(token, _)| token.clone());
            if let Some(oldest) = oldest {
                cursors.remove(&oldest);
            }
        }
        cursors.insert(token.clone(), Cursor { offset, created_at: now });

        token
    }

    /// Number of live cursors
    pub fn len(&self) -> usize {
        self.cursors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, cursor: &Cursor, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(cursor.created_at);
        age.num_milliseconds() > (self.config.token_ttl_secs as i64).saturating_mul(1000)
    }
}

impl Default for PaginationStore {
    fn default() -> Self {
        Self::new(PaginationConfig::default())
    }
}
