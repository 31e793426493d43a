//! Wire shapes of the statistics service responses.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_with::{serde_as, DefaultOnNull, TimestampSeconds};

use crate::error::RemoteServiceError;

/// Every endpoint answers `{"status": "ok", "data": …}` or
/// `{"status": "error", "error": {…}}`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub status: String,
    pub data: Option<T>,
    pub error: Option<ApiErrorBody>,
}

impl<T> Envelope<T> {
    pub fn into_result(self) -> Result<T, RemoteServiceError> {
        if let Some(error) = self.error.filter(|_| self.status != "ok") {
            return Err(RemoteServiceError::Api {
                code: error.code,
                message: match error.field {
                    Some(field) => format!("{} ({field})", error.message),
                    None => error.message,
                },
            });
        }
        self.data.ok_or_else(|| RemoteServiceError::Api {
            code: 0,
            message: format!("no data in response with status `{}`", self.status),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub field: Option<String>,
}

/// One entry of the ship encyclopedia.
#[derive(Debug, Clone, Deserialize)]
pub struct ShipTier {
    pub ship_id: i64,
    pub tier: i32,
}

/// A ship currently in a player's port.
#[derive(Debug, Clone, Deserialize)]
pub struct GarageShip {
    pub ship_id: i64,
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountInfo {
    pub account_id: i64,
    pub nickname: String,
    #[serde_as(as = "Option<TimestampSeconds<i64>>")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde_as(as = "Option<TimestampSeconds<i64>>")]
    pub last_battle_time: Option<DateTime<Utc>>,
    #[serde_as(as = "Option<TimestampSeconds<i64>>")]
    pub logout_at: Option<DateTime<Utc>>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub hidden_profile: bool,
    /// Absent for hidden profiles.
    #[serde(default)]
    pub statistics: Option<AccountStatistics>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountStatistics {
    #[serde(default)]
    pub pvp: Option<PvpStatistics>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PvpStatistics {
    #[serde(default)]
    pub battles: Option<i64>,
    #[serde(default)]
    pub wins: Option<i64>,
}

/// A player's current clan membership.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClanMembership {
    pub account_id: i64,
    #[serde(default)]
    pub clan_id: Option<i64>,
    #[serde_as(as = "Option<TimestampSeconds<i64>>")]
    pub joined_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClanListEntry {
    pub clan_id: i64,
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClanInfo {
    pub clan_id: i64,
    pub name: String,
    pub tag: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde_as(as = "Option<TimestampSeconds<i64>>")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde_as(as = "Option<TimestampSeconds<i64>>")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub leader_id: Option<i64>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub members_ids: Vec<i64>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub is_clan_disbanded: bool,
}
