//! Durable engagement and like state
//!
//! This module owns all reads and writes of the two engagement tables.
//! Handlers construct no transactions themselves; they go through an
//! explicitly injected [`EngagementStore`] built once at startup.
//!
//! Every toggle is a read-modify-write of a single row inside one write
//! transaction, so concurrent toggles from the same visitor each apply a
//! well-defined transition. The response state is a fresh read taken after
//! commit, never a locally-predicted value.

use redb::{Database, ReadableDatabase, ReadableTable};
use std::sync::Arc;
use thiserror::Error;

use chrono::Utc;

use crate::database::{row_key, slug_range, TABLE_ENGAGEMENT, TABLE_LIKES};
use crate::model::{
    ActiveFlags, Counts, EngagementAction, EngagementRecord, EngagementState, LikeAction,
    LikeRecord, LikeState,
};

/// Failure of the persistent store
///
/// Every redb-level failure collapses into this one condition; callers
/// surface it as "feature unavailable" (HTTP 503), never as a crash.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The embedded store could not be read or written
    #[error("engagement store unavailable: {0}")]
    Unavailable(#[from] redb::Error),
}

impl From<redb::TransactionError> for StoreError {
    fn from(err: redb::TransactionError) -> Self {
        Self::Unavailable(err.into())
    }
}

impl From<redb::TableError> for StoreError {
    fn from(err: redb::TableError) -> Self {
        Self::Unavailable(err.into())
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(err: redb::StorageError) -> Self {
        Self::Unavailable(err.into())
    }
}

impl From<redb::CommitError> for StoreError {
    fn from(err: redb::CommitError) -> Self {
        Self::Unavailable(err.into())
    }
}

/// Store client for engagement and legacy like rows
///
/// Cheap to clone; wraps the shared database handle.
#[derive(Clone)]
pub struct EngagementStore {
    db: Arc<Database>,
}

impl EngagementStore {
    /// Creates a store over an already-initialized database
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Reads the aggregate counts plus the visitor's own flags for one game
    ///
    /// Tolerates a game nobody has engaged with: counts all zero, active all
    /// false. Read-only; a corrupt stored value is skipped in the aggregate
    /// and treated as "no row" for the visitor.
    pub fn get_state(&self, slug: &str, visitor_id: &str) -> Result<EngagementState, StoreError> {
        // Begin a read-only transaction
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_ENGAGEMENT)?;

        // Aggregate every row of this game via the composite-key range
        let (start, end) = slug_range(slug);
        let mut counts = Counts::default();
        for row in table.range(start.as_str()..end.as_str())? {
            let (_, value) = row?;
            let Ok(record) = serde_json::from_str::<EngagementRecord>(value.value()) else {
                continue;
            };
            match record.vote {
                1 => counts.up += 1,
                -1 => counts.down += 1,
                _ => {}
            }
            if record.collected {
                counts.love += 1;
            }
        }

        // Look up the requesting visitor's own row
        let active = match table.get(row_key(slug, visitor_id).as_str())? {
            Some(guard) => match serde_json::from_str::<EngagementRecord>(guard.value()) {
                Ok(record) => ActiveFlags {
                    up: record.vote == 1,
                    down: record.vote == -1,
                    love: record.collected,
                },
                Err(_) => ActiveFlags::default(),
            },
            None => ActiveFlags::default(),
        };

        Ok(EngagementState { counts, active })
    }

    /// Applies one toggle for a visitor and returns the fresh post-mutation state
    ///
    /// The row is created with defaults (vote 0, not collected) when the
    /// visitor has never engaged with the game before; the toggle is then
    /// applied to that default. Up and down share the single vote field, so
    /// toggling one direction implicitly clears the other.
    pub fn apply_action(
        &self,
        slug: &str,
        visitor_id: &str,
        action: EngagementAction,
    ) -> Result<EngagementState, StoreError> {
        // Begin a write transaction; the whole read-modify-write is atomic
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE_ENGAGEMENT)?;
            let key = row_key(slug, visitor_id);

            // Load the existing row, or start from the lazy default
            let mut record = match table.get(key.as_str())? {
                Some(guard) => {
                    serde_json::from_str::<EngagementRecord>(guard.value()).unwrap_or_default()
                }
                None => EngagementRecord::default(),
            };

            match action {
                EngagementAction::ToggleUp => {
                    record.vote = if record.vote == 1 { 0 } else { 1 };
                }
                EngagementAction::ToggleDown => {
                    record.vote = if record.vote == -1 { 0 } else { -1 };
                }
                EngagementAction::ToggleCollect => {
                    record.collected = !record.collected;
                }
            }
            record.updated_at = Utc::now();

            let record_json = serde_json::to_string(&record).unwrap();
            table.insert(key.as_str(), record_json.as_str())?;
        }

        // Commit the transaction to persist the toggle
        write_txn.commit()?;

        // Fresh read so the caller observes the authoritative aggregate
        self.get_state(slug, visitor_id)
    }

    /// Reads the legacy like count plus the visitor's own liked flag
    pub fn like_state(&self, slug: &str, visitor_id: &str) -> Result<LikeState, StoreError> {
        // Begin a read-only transaction
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_LIKES)?;

        // Row presence is the like; counting the range is the aggregate
        let (start, end) = slug_range(slug);
        let mut count = 0u64;
        for row in table.range(start.as_str()..end.as_str())? {
            row?;
            count += 1;
        }

        let liked = table.get(row_key(slug, visitor_id).as_str())?.is_some();

        Ok(LikeState { count, liked })
    }

    /// Applies one legacy like action and returns the fresh post-mutation state
    ///
    /// `like` and `unlike` are idempotent; `toggle` flips the row's
    /// existence. Both the insert-if-absent and the delete-if-present are
    /// no-ops when the row is already in the desired state.
    pub fn apply_like(
        &self,
        slug: &str,
        visitor_id: &str,
        action: LikeAction,
    ) -> Result<LikeState, StoreError> {
        // Begin a write transaction
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE_LIKES)?;
            let key = row_key(slug, visitor_id);

            let has_like = table.get(key.as_str())?.is_some();
            let want_like = match action {
                LikeAction::Like => true,
                LikeAction::Unlike => false,
                LikeAction::Toggle => !has_like,
            };

            if want_like && !has_like {
                let record = LikeRecord {
                    created_at: Utc::now(),
                };
                let record_json = serde_json::to_string(&record).unwrap();
                table.insert(key.as_str(), record_json.as_str())?;
            } else if !want_like && has_like {
                table.remove(key.as_str())?;
            }
        }

        // Commit the transaction to persist the change
        write_txn.commit()?;

        // Fresh read so the caller observes the authoritative count
        self.like_state(slug, visitor_id)
    }
}
