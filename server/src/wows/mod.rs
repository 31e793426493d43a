//! Client for the World of Warships public statistics service.
//!
//! Every batched call accepts at most [`MAX_BATCH`] ids; callers chunk larger
//! inputs. Listing endpoints are paginated by [`PAGE_SIZE`].

pub mod types;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::Realm;
use crate::error::RemoteServiceError;
use types::{
    AccountInfo, ClanInfo, ClanListEntry, ClanMembership, Envelope, GarageShip, ShipTier,
};

/// Maximum number of ids accepted by one batched call.
pub const MAX_BATCH: usize = 100;
/// Page size of the clan listing.
pub const PAGE_SIZE: usize = 100;

const TIMEOUT: Duration = Duration::from_secs(10);

const ACCOUNT_FIELDS: &str = "account_id,created_at,hidden_profile,last_battle_time,logout_at,\
                              nickname,statistics.pvp.wins,statistics.pvp.battles";
const CLAN_FIELDS: &str =
    "clan_id,name,tag,description,created_at,updated_at,is_clan_disbanded,members_ids,leader_id";

/// Calls the rest of the crate makes against the statistics service.
#[async_trait]
pub trait StatsApi: Send + Sync {
    /// One page (1-based) of the ship encyclopedia.
    async fn ship_tiers(&self, page: u32) -> Result<Vec<ShipTier>, RemoteServiceError>;

    /// Ships currently in the player's port, keyed by account id as returned
    /// by the service (`None` for accounts it has no data for).
    async fn garage_ships(
        &self,
        account_id: i64,
    ) -> Result<HashMap<i64, Option<Vec<GarageShip>>>, RemoteServiceError>;

    /// Account details; unknown accounts are left out.
    async fn accounts(&self, account_ids: &[i64]) -> Result<Vec<AccountInfo>, RemoteServiceError>;

    /// Current clan membership of each account that has one.
    async fn clan_memberships(
        &self,
        account_ids: &[i64],
    ) -> Result<HashMap<i64, ClanMembership>, RemoteServiceError>;

    /// One page (1-based) of clan ids, at most [`PAGE_SIZE`] long.
    async fn clan_ids(&self, page: u32) -> Result<Vec<i64>, RemoteServiceError>;

    /// Clan details, disbanded clans included.
    async fn clans(&self, clan_ids: &[i64]) -> Result<Vec<ClanInfo>, RemoteServiceError>;
}

pub struct WowsClient {
    client: reqwest::Client,
    base: Url,
    application_id: String,
}

impl WowsClient {
    pub fn new(application_id: &str, realm: Realm) -> Result<Self, RemoteServiceError> {
        Self::with_base(application_id, realm.api_base())
    }

    /// Client against an arbitrary host, e.g. a local mock.
    pub fn with_base(application_id: &str, base: &str) -> Result<Self, RemoteServiceError> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(TIMEOUT).build()?,
            base: Url::parse(base)?,
            application_id: application_id.to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, RemoteServiceError> {
        let url = self.base.join(path)?;
        let resp = self
            .client
            .get(url)
            .query(&[("application_id", self.application_id.as_str())])
            .query(params)
            .send()
            .await?
            .error_for_status()?;

        resp.json::<Envelope<T>>().await?.into_result()
    }
}

fn id_list(ids: &[i64]) -> Result<String, RemoteServiceError> {
    if ids.len() > MAX_BATCH {
        return Err(RemoteServiceError::BatchTooLarge(ids.len()));
    }
    Ok(ids
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(","))
}

#[async_trait]
impl StatsApi for WowsClient {
    async fn ship_tiers(&self, page: u32) -> Result<Vec<ShipTier>, RemoteServiceError> {
        let data: HashMap<i64, Option<ShipTier>> = self
            .get(
                "wows/encyclopedia/ships/",
                &[("fields", "ship_id,tier".into()), ("page_no", page.to_string())],
            )
            .await?;
        Ok(data.into_values().flatten().collect())
    }

    async fn garage_ships(
        &self,
        account_id: i64,
    ) -> Result<HashMap<i64, Option<Vec<GarageShip>>>, RemoteServiceError> {
        self.get(
            "wows/ships/stats/",
            &[
                ("account_id", account_id.to_string()),
                ("fields", "ship_id".into()),
                ("in_garage", "1".into()),
            ],
        )
        .await
    }

    async fn accounts(&self, account_ids: &[i64]) -> Result<Vec<AccountInfo>, RemoteServiceError> {
        if account_ids.is_empty() {
            return Ok(Vec::new());
        }
        let data: HashMap<i64, Option<AccountInfo>> = self
            .get(
                "wows/account/info/",
                &[
                    ("account_id", id_list(account_ids)?),
                    ("fields", ACCOUNT_FIELDS.into()),
                ],
            )
            .await?;
        Ok(data.into_values().flatten().collect())
    }

    async fn clan_memberships(
        &self,
        account_ids: &[i64],
    ) -> Result<HashMap<i64, ClanMembership>, RemoteServiceError> {
        if account_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let data: HashMap<i64, Option<ClanMembership>> = self
            .get(
                "wows/clans/accountinfo/",
                &[("account_id", id_list(account_ids)?)],
            )
            .await?;
        Ok(data
            .into_iter()
            .filter_map(|(id, m)| m.map(|m| (id, m)))
            .collect())
    }

    async fn clan_ids(&self, page: u32) -> Result<Vec<i64>, RemoteServiceError> {
        let data: Vec<ClanListEntry> = self
            .get(
                "wows/clans/list/",
                &[
                    ("limit", PAGE_SIZE.to_string()),
                    ("page_no", page.to_string()),
                    ("fields", "clan_id".into()),
                ],
            )
            .await?;
        Ok(data.into_iter().map(|c| c.clan_id).collect())
    }

    async fn clans(&self, clan_ids: &[i64]) -> Result<Vec<ClanInfo>, RemoteServiceError> {
        if clan_ids.is_empty() {
            return Ok(Vec::new());
        }
        let data: HashMap<i64, Option<ClanInfo>> = self
            .get(
                "wows/clans/info/",
                &[("clan_id", id_list(clan_ids)?), ("fields", CLAN_FIELDS.into())],
            )
            .await?;
        let mut clans: Vec<ClanInfo> = data.into_values().flatten().collect();
        clans.sort_by_key(|c| c.clan_id);
        Ok(clans)
    }
}
