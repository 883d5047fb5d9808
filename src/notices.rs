//! One reporting path for every failed operation. Operations only say what
//! failed; the page decides whether that becomes an inline message, an
//! alert banner or a quiet note.

use crate::errors::ClientError;
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Load,
    FilterChange,
    Create,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub operation: Operation,
    pub message: String,
}

pub trait ErrorReporter: Send + Sync {
    fn report(&self, operation: Operation, error: &ClientError);

    /// Drops the current notice if it came from `operation`.
    fn clear(&self, operation: Operation);

    fn dismiss(&self);

    fn latest(&self) -> Option<Notice>;
}

/// Keeps the most recent notice for one dashboard.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    username: String,
    latest: Mutex<Option<Notice>>,
}

impl NoticeBoard {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            latest: Mutex::new(None),
        }
    }
}

impl ErrorReporter for NoticeBoard {
    fn report(&self, operation: Operation, error: &ClientError) {
        warn!(username = %self.username, ?operation, %error, "operation failed");
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        *latest = Some(Notice {
            operation,
            message: error.to_string(),
        });
    }

    fn clear(&self, operation: Operation) {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        if latest.as_ref().is_some_and(|notice| notice.operation == operation) {
            *latest = None;
        }
    }

    fn dismiss(&self) {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn latest(&self) -> Option<Notice> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
