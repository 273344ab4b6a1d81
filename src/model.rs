//! Data models for the game portal engagement API
//!
//! This module defines all the data structures used throughout the application,
//! including request/response models and database record structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents one visitor's engagement row stored in the database
///
/// One row exists per (game, visitor) pair, created lazily on the first
/// mutating request and updated in place afterwards.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EngagementRecord {
    /// Reaction vote: -1 (down), 0 (none) or 1 (up)
    ///
    /// A single field holds both directions, so "up and down at the same
    /// time" is structurally impossible.
    pub vote: i8,

    /// Whether the visitor has collected (loved) this game
    /// Toggles independently of the vote
    #[serde(default)]
    pub collected: bool,

    /// Timestamp of the last change to this row
    pub updated_at: DateTime<Utc>,
}

impl Default for EngagementRecord {
    fn default() -> Self {
        Self {
            vote: 0,
            collected: false,
            updated_at: Utc::now(),
        }
    }
}

/// Represents one legacy like row stored in the database
///
/// The row's existence is the like; its value only records when the like
/// was placed.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LikeRecord {
    /// Timestamp when this like was placed
    pub created_at: DateTime<Utc>,
}

/// Aggregate reaction counts across all visitors of one game
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    /// Number of visitors with vote = 1
    pub up: u64,

    /// Number of visitors with vote = -1
    pub down: u64,

    /// Number of visitors with collected = true
    pub love: u64,
}

/// The requesting visitor's own reaction flags
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveFlags {
    /// True when the visitor's vote is 1
    pub up: bool,

    /// True when the visitor's vote is -1
    pub down: bool,

    /// True when the visitor has collected the game
    pub love: bool,
}

/// Combined engagement view returned by both GET and POST
///
/// # Example
/// ```json
/// {
///   "counts": { "up": 3, "down": 1, "love": 2 },
///   "active": { "up": true, "down": false, "love": false }
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngagementState {
    /// Aggregates across all visitors for the game
    pub counts: Counts,

    /// Only the requesting visitor's own row
    pub active: ActiveFlags,
}

/// Legacy like view returned by both GET and POST
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LikeState {
    /// Number of visitors currently liking the game
    pub count: u64,

    /// Whether the requesting visitor likes the game
    pub liked: bool,
}

/// Request payload for mutating engagement state
///
/// # Example
/// ```json
/// { "action": "toggle_up" }
/// ```
///
/// The action is kept as a plain string so the handler can distinguish
/// "missing" from "unrecognized" and answer both with a 400.
#[derive(Deserialize, Default)]
pub struct ActionRequest {
    /// One of "toggle_up", "toggle_down", "toggle_collect" (engagement)
    /// or "like", "unlike", "toggle" (legacy like endpoint)
    pub action: Option<String>,
}

/// A mutation of the tri-state engagement row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementAction {
    /// Set vote to 1, or back to 0 when it is already 1
    ToggleUp,

    /// Set vote to -1, or back to 0 when it is already -1
    ToggleDown,

    /// Flip the collected flag, leaving the vote untouched
    ToggleCollect,
}

impl EngagementAction {
    /// Parses the wire action name; returns None for anything unrecognized
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "toggle_up" => Some(Self::ToggleUp),
            "toggle_down" => Some(Self::ToggleDown),
            "toggle_collect" => Some(Self::ToggleCollect),
            _ => None,
        }
    }
}

/// A mutation of the legacy single-boolean like row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeAction {
    /// Ensure the row exists
    Like,

    /// Ensure the row is gone
    Unlike,

    /// Flip the row's existence
    Toggle,
}

impl LikeAction {
    /// Parses the wire action name; returns None for anything unrecognized
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "like" => Some(Self::Like),
            "unlike" => Some(Self::Unlike),
            "toggle" => Some(Self::Toggle),
            _ => None,
        }
    }
}

/// Validates a game slug against the `^[a-z0-9-]{1,64}$` pattern
/// (case-insensitive, matching how slugs arrive from the router)
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= 64
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
}
