//! Database initialization and table definitions
//!
//! This module handles the setup and configuration of the embedded redb database.
//! It defines the database tables, the composite key scheme shared by both
//! engagement tables, and provides initialization functions.

use redb::{Database, TableDefinition};
use std::sync::Arc;

use crate::resolver::AssetResolver;
use crate::store::EngagementStore;

/// Main table for per-visitor engagement rows
///
/// Key: Composite key in format "{game_slug}:{visitor_id}"
/// Value: JSON-serialized EngagementRecord as string
///
/// Example:
/// - Key: "bloodmoney:0d6a2f0c-0b5e-4a5e-9c0a-7a9a1f2b3c4d"
/// - Value: '{"vote":1,"collected":false,"updated_at":"2026-08-07T10:00:00Z"}'
///
/// The ':' separator never appears in a game slug (alphanumerics and hyphens)
/// or in a textual UUID, so per-game range scans over the "{game_slug}:"
/// prefix cannot pick up rows of another game.
pub const TABLE_ENGAGEMENT: TableDefinition<&str, &str> =
    TableDefinition::new("engagement_v1");

/// Legacy single-boolean like rows
///
/// Key: Composite key in format "{game_slug}:{visitor_id}"
/// Value: JSON-serialized LikeRecord as string
///
/// Presence of a key means the visitor currently likes the game; unliking
/// removes the row.
pub const TABLE_LIKES: TableDefinition<&str, &str> = TableDefinition::new("likes_v1");

/// Application state shared across all request handlers
///
/// Built once by the composition root and cloned into every handler: the
/// engagement store client (wrapping the shared database handle) and the
/// asset resolution policy.
#[derive(Clone)]
pub struct AppState {
    /// Store client for engagement and like rows
    pub store: EngagementStore,

    /// Routing policy for `/games` asset requests
    pub assets: Arc<AssetResolver>,
}

impl AppState {
    /// Assembles the shared state from an initialized database and resolver
    pub fn new(db: Database, assets: AssetResolver) -> Self {
        Self {
            store: EngagementStore::new(Arc::new(db)),
            assets: Arc::new(assets),
        }
    }
}

/// Builds the composite row key for a (game, visitor) pair
pub fn row_key(slug: &str, visitor_id: &str) -> String {
    format!("{}:{}", slug, visitor_id)
}

/// Returns the key range covering every row of one game
///
/// start_key: "bloodmoney:" - matches all entries for this slug
/// end_key: "bloodmoney:{" - the character '{' is lexicographically after ':'
///                           so this effectively creates an upper bound
pub fn slug_range(slug: &str) -> (String, String) {
    (format!("{}:", slug), format!("{}:{{", slug))
}

/// Initializes the embedded database and creates required tables
///
/// This function:
/// 1. Creates or opens the database file at the specified path
/// 2. Opens both the engagement table and the legacy likes table
/// 3. Commits the transaction to ensure tables are persisted
///
/// Table creation is idempotent, so this is safe to run on every startup.
///
/// # Arguments
///
/// * `db_path` - File path where the database should be stored (e.g., "data.db")
///
/// # Returns
///
/// * `Ok(Database)` - Successfully initialized database instance
/// * `Err(redb::Error)` - Database initialization error
///
/// # Example
///
/// ```no_run
/// # use gameportal::database::init_db;
/// let db = init_db("data.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    // Create or open the database file
    let db = Database::create(db_path)?;

    // Begin a write transaction to create tables
    let write_txn = db.begin_write()?;
    {
        // Open (or create if not exists) the engagement table
        write_txn.open_table(TABLE_ENGAGEMENT)?;

        // Open (or create if not exists) the legacy likes table
        write_txn.open_table(TABLE_LIKES)?;
    }

    // Commit the transaction to persist the table structures
    write_txn.commit()?;

    Ok(db)
}
