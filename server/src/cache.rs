//! Ship → tier reference table, warmed once at start-up.
//!
//! Built before any scan runs and shared read-only afterwards, so it needs no
//! locking. Ships missing from the table simply do not count.

use std::collections::HashMap;

use crate::error::{Error, RemoteServiceError, Result};
use crate::wows::types::GarageShip;
use crate::wows::StatsApi;

/// Highest tier in the game; ships at this tier are "top tier".
pub const TOP_TIER: i32 = 10;

#[derive(Debug, Clone, Default)]
pub struct TierCache {
    tiers: HashMap<i64, i32>,
}

impl TierCache {
    /// Walk the encyclopedia page by page until an empty page.
    ///
    /// The service exposes no page count, so an error on any page after the
    /// first is taken as the end of the data. An error on page 1 propagates.
    pub async fn load(api: &dyn StatsApi) -> Result<Self, RemoteServiceError> {
        let mut tiers = HashMap::new();
        let mut page = 1u32;
        loop {
            let ships = match api.ship_tiers(page).await {
                Ok(ships) => ships,
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    log::debug!("tier-cache: stopping at page {page}: {e}");
                    break;
                }
            };
            if ships.is_empty() {
                break;
            }
            tiers.extend(ships.into_iter().map(|s| (s.ship_id, s.tier)));
            page += 1;
        }
        log::info!("tier-cache: loaded {} ships", tiers.len());
        Ok(Self { tiers })
    }

    pub fn from_tiers(tiers: impl IntoIterator<Item = (i64, i32)>) -> Self {
        Self {
            tiers: tiers.into_iter().collect(),
        }
    }

    pub fn tier(&self, ship_id: i64) -> Option<i32> {
        self.tiers.get(&ship_id).copied()
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Count top-tier ships in a garage response for `account_id`.
    ///
    /// The response must hold exactly one ship list, for that account.
    pub fn count_top_tier(
        &self,
        account_id: i64,
        garage: &HashMap<i64, Option<Vec<GarageShip>>>,
    ) -> Result<i32> {
        if garage.len() != 1 {
            return Err(Error::InvalidShipList { account_id });
        }
        let Some(Some(ships)) = garage.get(&account_id) else {
            return Err(Error::InvalidShipList { account_id });
        };
        let count = ships
            .iter()
            .filter(|s| self.tier(s.ship_id) == Some(TOP_TIER))
            .count();
        Ok(count as i32)
    }

    /// Fetch the player's garage and count its top-tier ships.
    pub async fn top_tier_count(&self, api: &dyn StatsApi, account_id: i64) -> Result<i32> {
        log::debug!("tier-cache: counting top-tier ships of player {account_id}");
        let garage = api.garage_ships(account_id).await?;
        self.count_top_tier(account_id, &garage)
    }
}
