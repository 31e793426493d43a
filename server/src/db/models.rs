use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Language tag stored when detection is not confident enough.
pub const UNKNOWN_LANGUAGE: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Player {
    pub id: i64,
    pub nick: String,
    pub account_created_at: DateTime<Utc>,
    pub last_battle_at: DateTime<Utc>,
    pub last_logout_at: DateTime<Utc>,
    /// Always >= 1, see `sync::win_rate`.
    pub battles: i32,
    /// wins / battles, in [0, 1].
    pub win_rate: f64,
    pub top_tier_count: i32,
    pub hidden_profile: bool,
    pub clan_id: Option<i64>,
    pub clan_joined_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Clan {
    pub id: i64,
    pub name: String,
    pub tag: String,
    pub language: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub leader_id: Option<i64>,
    /// Subscribed for the incremental scan. Never written by clan upserts.
    pub tracked: bool,
    /// Roster as fetched; derived from `players.clan_id` once stored.
    #[sqlx(skip)]
    #[serde(skip)]
    pub member_ids: Vec<i64>,
}

/// A clan as last persisted, with the players pointing at it.
#[derive(Debug, Clone)]
pub struct StoredClan {
    pub clan: Clan,
    pub members: Vec<Player>,
}

/// Historical fact: `player_id` left `clan_id`. Insert-only.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct PreviousClan {
    pub player_id: i64,
    pub clan_id: i64,
    pub joined_at: Option<DateTime<Utc>>,
    pub left_at: DateTime<Utc>,
}

/// Departure alert subscription of one chat channel.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Filter {
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub min_win_rate: f64,
    pub max_days_since_last_battle: i32,
    pub min_top_tier_count: i32,
    pub min_battles: i32,
    #[sqlx(skip)]
    pub tracked_clan_ids: HashSet<i64>,
}
