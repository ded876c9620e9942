//! Bounded in-memory log of recent command failures.
//!
//! The dispatcher pushes one entry per failed execution; the `/log`
//! slash command reads pages of it back for moderators. Capacity is
//! fixed and old entries are dropped first. This is an explicitly
//! constructed collaborator owned by the shared state, not a global.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use marmot_core::NormalizedError;
use marmot_db::CommandKind;

const DEFAULT_CAPACITY: usize = 200;

/// One recorded command failure.
#[derive(Debug, Clone)]
pub struct ErrorLogEntry {
    pub at: DateTime<Utc>,
    pub command_name: String,
    pub command_kind: CommandKind,
    pub user_id: u64,
    pub guild_id: Option<u64>,
    pub channel_id: Option<u64>,
    pub message_id: Option<u64>,
    pub error: NormalizedError,
}

/// Fixed-capacity ring buffer of failures, newest last.
#[derive(Debug)]
pub struct ErrorLog {
    entries: Mutex<VecDeque<ErrorLogEntry>>,
    capacity: usize,
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ErrorLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, entry: ErrorLogEntry) {
        let mut entries = self.entries.lock().expect("error log poisoned");
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// One page of entries, newest first. Page numbering starts at 1;
    /// an out-of-range page clamps to the last page.
    pub fn page(&self, page: usize, per_page: usize) -> ErrorPage {
        let entries = self.entries.lock().expect("error log poisoned");
        let total = entries.len();
        if total == 0 || per_page == 0 {
            return ErrorPage {
                entries: Vec::new(),
                page: 1,
                total_pages: 1,
                total,
            };
        }

        let total_pages = total.div_ceil(per_page);
        let page = page.clamp(1, total_pages);
        let newest_first: Vec<ErrorLogEntry> = entries.iter().rev().cloned().collect();
        let start = (page - 1) * per_page;
        let slice = newest_first[start..(start + per_page).min(total)].to_vec();

        ErrorPage {
            entries: slice,
            page,
            total_pages,
            total,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("error log poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One page of the error log plus paging metadata for display.
#[derive(Debug)]
pub struct ErrorPage {
    pub entries: Vec<ErrorLogEntry>,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: usize) -> ErrorLogEntry {
        ErrorLogEntry {
            at: Utc::now(),
            command_name: format!("cmd{n}"),
            command_kind: CommandKind::Message,
            user_id: 1,
            guild_id: Some(10),
            channel_id: Some(20),
            message_id: Some(30),
            error: NormalizedError::new("message", format!("boom {n}")),
        }
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let log = ErrorLog::with_capacity(3);
        for n in 0..5 {
            log.push(entry(n));
        }

        assert_eq!(log.len(), 3);
        let page = log.page(1, 10);
        // Newest first; entry 0 and 1 were dropped.
        assert_eq!(page.entries[0].command_name, "cmd4");
        assert_eq!(page.entries[2].command_name, "cmd2");
    }

    #[test]
    fn test_paging_clamps_out_of_range() {
        let log = ErrorLog::with_capacity(50);
        for n in 0..25 {
            log.push(entry(n));
        }

        let page = log.page(99, 10);
        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.entries.len(), 5);
        assert_eq!(page.total, 25);
    }

    #[test]
    fn test_empty_log() {
        let log = ErrorLog::default();
        let page = log.page(1, 10);
        assert!(page.entries.is_empty());
        assert_eq!(page.total, 0);
        assert!(log.is_empty());
    }
}
