use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A single synthetic credential record. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub user_id: u32,
    pub username: String,
    pub password: String,
}

/// Circular feeder over a pre-generated ordered pool of credential records.
///
/// Each virtual user draws one record at start time. The cursor wraps back
/// to the first record after the last, so the feeder never exhausts.
#[derive(Debug)]
pub struct UserFeeder {
    records: Vec<UserRecord>,
    cursor: AtomicUsize,
}

impl UserFeeder {
    /// Generate `pool_size` records with indexed usernames and passwords,
    /// paired by index starting at 1. The pool is never empty: a size of 0
    /// is clamped to a single record so `next()` always has one to hand out.
    pub fn new(username_prefix: &str, password_prefix: &str, pool_size: u32) -> Self {
        let records = (1..=pool_size.max(1))
            .map(|i| UserRecord {
                user_id: i,
                username: format!("{}{}", username_prefix, i),
                password: format!("{}{}", password_prefix, i),
            })
            .collect();

        Self {
            records,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Draw the next record, wrapping around at the end of the pool.
    pub fn next(&self) -> UserRecord {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.records[index % self.records.len()].clone()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
