//! In-memory stand-ins for the statistics service, the store and the chat
//! platform.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::{mpsc, watch};

use wows_recruiter::cache::TierCache;
use wows_recruiter::db::models::{Clan, Filter, Player, PreviousClan, StoredClan};
use wows_recruiter::db::Store;
use wows_recruiter::error::{NotifyError, RemoteServiceError};
use wows_recruiter::language::LanguageClassifier;
use wows_recruiter::notify::{self, DepartureEvent, Notifier};
use wows_recruiter::sync::Scraper;
use wows_recruiter::wows::types::{
    AccountInfo, AccountStatistics, ClanInfo, ClanMembership, GarageShip, PvpStatistics, ShipTier,
};
use wows_recruiter::wows::StatsApi;

pub fn api_error() -> RemoteServiceError {
    RemoteServiceError::Api {
        code: 504,
        message: "SOURCE_NOT_AVAILABLE".into(),
    }
}

//////////////////////////////////////////////////
// Statistics service
//////////////////////////////////////////////////

#[derive(Default)]
struct ApiState {
    ship_pages: Vec<Result<Vec<ShipTier>, ()>>,
    garages: HashMap<i64, Vec<i64>>,
    accounts: HashMap<i64, AccountInfo>,
    memberships: HashMap<i64, ClanMembership>,
    clan_pages: Vec<Vec<i64>>,
    clans: HashMap<i64, ClanInfo>,
    failing_clan_ids: HashSet<i64>,
    fail_listing: bool,
    fail_accounts: bool,
}

#[derive(Default)]
pub struct FakeApi {
    state: Mutex<ApiState>,
    pub listing_calls: AtomicUsize,
    pub account_calls: AtomicUsize,
    pub garage_calls: AtomicUsize,
    /// Every batch passed to `clans`, in call order.
    pub clan_batches: Mutex<Vec<Vec<i64>>>,
    /// Every batch passed to `accounts`, in call order.
    pub account_batches: Mutex<Vec<Vec<i64>>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Err(())` entries make that page fail.
    pub fn set_ship_pages(&self, pages: Vec<Result<Vec<ShipTier>, ()>>) {
        self.state.lock().unwrap().ship_pages = pages;
    }

    pub fn set_garage(&self, account_id: i64, ship_ids: Vec<i64>) {
        self.state.lock().unwrap().garages.insert(account_id, ship_ids);
    }

    pub fn set_account(&self, account: AccountInfo) {
        self.state
            .lock()
            .unwrap()
            .accounts
            .insert(account.account_id, account);
    }

    pub fn remove_account(&self, account_id: i64) {
        self.state.lock().unwrap().accounts.remove(&account_id);
    }

    pub fn set_membership(&self, account_id: i64, clan_id: i64, joined_at: DateTime<Utc>) {
        self.state.lock().unwrap().memberships.insert(
            account_id,
            ClanMembership {
                account_id,
                clan_id: Some(clan_id),
                joined_at: Some(joined_at),
            },
        );
    }

    pub fn set_clan_pages(&self, pages: Vec<Vec<i64>>) {
        self.state.lock().unwrap().clan_pages = pages;
    }

    pub fn set_clan(&self, clan: ClanInfo) {
        self.state.lock().unwrap().clans.insert(clan.clan_id, clan);
    }

    pub fn fail_clan(&self, clan_id: i64) {
        self.state.lock().unwrap().failing_clan_ids.insert(clan_id);
    }

    pub fn fail_listing(&self) {
        self.state.lock().unwrap().fail_listing = true;
    }

    pub fn fail_accounts(&self, fail: bool) {
        self.state.lock().unwrap().fail_accounts = fail;
    }

    pub fn requested_clan_ids(&self) -> Vec<i64> {
        self.clan_batches.lock().unwrap().concat()
    }
}

#[async_trait]
impl StatsApi for FakeApi {
    async fn ship_tiers(&self, page: u32) -> Result<Vec<ShipTier>, RemoteServiceError> {
        let state = self.state.lock().unwrap();
        match state.ship_pages.get(page as usize - 1) {
            Some(Ok(ships)) => Ok(ships.clone()),
            Some(Err(())) => Err(api_error()),
            None => Ok(Vec::new()),
        }
    }

    async fn garage_ships(
        &self,
        account_id: i64,
    ) -> Result<HashMap<i64, Option<Vec<GarageShip>>>, RemoteServiceError> {
        self.garage_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        let ships = state.garages.get(&account_id).map(|ids| {
            ids.iter()
                .map(|&ship_id| GarageShip { ship_id })
                .collect::<Vec<_>>()
        });
        Ok(HashMap::from([(account_id, ships)]))
    }

    async fn accounts(&self, account_ids: &[i64]) -> Result<Vec<AccountInfo>, RemoteServiceError> {
        assert!(account_ids.len() <= 100, "account batch over the limit");
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        self.account_batches.lock().unwrap().push(account_ids.to_vec());
        let state = self.state.lock().unwrap();
        if state.fail_accounts {
            return Err(api_error());
        }
        Ok(account_ids
            .iter()
            .filter_map(|id| state.accounts.get(id).cloned())
            .collect())
    }

    async fn clan_memberships(
        &self,
        account_ids: &[i64],
    ) -> Result<HashMap<i64, ClanMembership>, RemoteServiceError> {
        let state = self.state.lock().unwrap();
        Ok(account_ids
            .iter()
            .filter_map(|id| state.memberships.get(id).map(|m| (*id, m.clone())))
            .collect())
    }

    async fn clan_ids(&self, page: u32) -> Result<Vec<i64>, RemoteServiceError> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.fail_listing {
            return Err(api_error());
        }
        Ok(state
            .clan_pages
            .get(page as usize - 1)
            .cloned()
            .unwrap_or_default())
    }

    async fn clans(&self, clan_ids: &[i64]) -> Result<Vec<ClanInfo>, RemoteServiceError> {
        assert!(clan_ids.len() <= 100, "clan batch over the limit");
        self.clan_batches.lock().unwrap().push(clan_ids.to_vec());
        let state = self.state.lock().unwrap();
        if clan_ids.iter().any(|id| state.failing_clan_ids.contains(id)) {
            return Err(api_error());
        }
        let mut clans: Vec<ClanInfo> = clan_ids
            .iter()
            .filter_map(|id| state.clans.get(id).cloned())
            .collect();
        clans.sort_by_key(|c| c.clan_id);
        Ok(clans)
    }
}

pub fn account(id: i64, nick: &str, battles: i64, wins: i64, last_battle: DateTime<Utc>) -> AccountInfo {
    AccountInfo {
        account_id: id,
        nickname: nick.into(),
        created_at: Some(last_battle - Duration::days(1000)),
        last_battle_time: Some(last_battle),
        logout_at: Some(last_battle),
        hidden_profile: false,
        statistics: Some(AccountStatistics {
            pvp: Some(PvpStatistics {
                battles: Some(battles),
                wins: Some(wins),
            }),
        }),
    }
}

pub fn clan_info(id: i64, tag: &str, members: Vec<i64>) -> ClanInfo {
    ClanInfo {
        clan_id: id,
        name: format!("{tag} clan"),
        tag: tag.into(),
        description: None,
        created_at: Some(Utc::now() - Duration::days(365)),
        updated_at: Some(Utc::now()),
        leader_id: members.first().copied(),
        members_ids: members,
        is_clan_disbanded: false,
    }
}

//////////////////////////////////////////////////
// Store
//////////////////////////////////////////////////

#[derive(Default)]
pub struct StoreState {
    pub clans: BTreeMap<i64, Clan>,
    pub players: BTreeMap<i64, Player>,
    pub previous: Vec<PreviousClan>,
    pub filters: Vec<Filter>,
}

#[derive(Default)]
pub struct MemoryStore {
    pub state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clan(&self, id: i64) -> Option<Clan> {
        self.state.lock().unwrap().clans.get(&id).cloned()
    }

    pub fn player(&self, id: i64) -> Option<Player> {
        self.state.lock().unwrap().players.get(&id).cloned()
    }

    pub fn previous(&self) -> Vec<PreviousClan> {
        self.state.lock().unwrap().previous.clone()
    }

    pub fn set_tracked(&self, clan_id: i64, tracked: bool) {
        if let Some(clan) = self.state.lock().unwrap().clans.get_mut(&clan_id) {
            clan.tracked = tracked;
        }
    }

    pub fn add_filter(&self, filter: Filter) {
        self.state.lock().unwrap().filters.push(filter);
    }

    pub fn members_of(&self, clan_id: i64) -> Vec<i64> {
        self.state
            .lock()
            .unwrap()
            .players
            .values()
            .filter(|p| p.clan_id == Some(clan_id))
            .map(|p| p.id)
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_clan(&self, clan: &Clan) -> sqlx::Result<()> {
        let mut state = self.state.lock().unwrap();
        let mut row = clan.clone();
        row.member_ids.clear();
        if let Some(existing) = state.clans.get(&clan.id) {
            row.tracked = existing.tracked;
        }
        state.clans.insert(clan.id, row);
        Ok(())
    }

    async fn upsert_player(&self, player: &Player) -> sqlx::Result<()> {
        self.state
            .lock()
            .unwrap()
            .players
            .insert(player.id, player.clone());
        Ok(())
    }

    async fn insert_previous_clan(&self, entry: &PreviousClan) -> sqlx::Result<()> {
        self.state.lock().unwrap().previous.push(entry.clone());
        Ok(())
    }

    async fn tracked_clan_ids(&self) -> sqlx::Result<Vec<i64>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .clans
            .values()
            .filter(|c| c.tracked)
            .map(|c| c.id)
            .collect())
    }

    async fn stored_clan(&self, clan_id: i64) -> sqlx::Result<Option<StoredClan>> {
        let state = self.state.lock().unwrap();
        let Some(clan) = state.clans.get(&clan_id) else {
            return Ok(None);
        };
        let members: Vec<Player> = state
            .players
            .values()
            .filter(|p| p.clan_id == Some(clan_id))
            .cloned()
            .collect();
        let mut clan = clan.clone();
        clan.member_ids = members.iter().map(|p| p.id).collect();
        Ok(Some(StoredClan { clan, members }))
    }

    async fn players(&self, ids: &[i64]) -> sqlx::Result<Vec<Player>> {
        let state = self.state.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| state.players.get(id).cloned())
            .collect())
    }

    async fn detach_players(&self, clan_id: i64, ids: &[i64]) -> sqlx::Result<()> {
        let mut state = self.state.lock().unwrap();
        for id in ids {
            if let Some(player) = state.players.get_mut(id) {
                if player.clan_id == Some(clan_id) {
                    player.clan_id = None;
                    player.clan_joined_at = None;
                }
            }
        }
        Ok(())
    }

    async fn clan_count(&self) -> sqlx::Result<i64> {
        Ok(self.state.lock().unwrap().clans.len() as i64)
    }

    async fn filters(&self) -> sqlx::Result<Vec<Filter>> {
        Ok(self.state.lock().unwrap().filters.clone())
    }
}

pub fn filter(channel: &str, min_win_rate: f64, tracked: &[i64]) -> Filter {
    Filter {
        channel_id: channel.into(),
        guild_id: None,
        min_win_rate,
        max_days_since_last_battle: 30,
        min_top_tier_count: 0,
        min_battles: 0,
        tracked_clan_ids: tracked.iter().copied().collect(),
    }
}

//////////////////////////////////////////////////
// Chat platform
//////////////////////////////////////////////////

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
    pub rejecting: Mutex<HashSet<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(&self, channel_id: &str) {
        self.rejecting.lock().unwrap().insert(channel_id.into());
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), NotifyError> {
        if self.rejecting.lock().unwrap().contains(channel_id) {
            return Err(NotifyError::Rejected {
                status: 403,
                body: "Missing Access".into(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((channel_id.into(), content.into()));
        Ok(())
    }
}

//////////////////////////////////////////////////
// Language
//////////////////////////////////////////////////

/// Returns the same candidates for any text.
pub struct FixedClassifier(pub Vec<(String, f64)>);

impl LanguageClassifier for FixedClassifier {
    fn confidence_values(&self, _text: &str) -> Vec<(String, f64)> {
        self.0.clone()
    }
}

//////////////////////////////////////////////////
// Wiring
//////////////////////////////////////////////////

pub struct Harness {
    pub api: Arc<FakeApi>,
    pub store: Arc<MemoryStore>,
    pub scraper: Scraper,
    pub events: mpsc::Receiver<DepartureEvent>,
    pub shutdown: watch::Sender<bool>,
}

/// Ship 1000 is tier 10, ship 900 tier 9.
pub fn harness(buffer: usize) -> Harness {
    let api = Arc::new(FakeApi::new());
    let store = Arc::new(MemoryStore::new());
    let tiers = Arc::new(TierCache::from_tiers([(1000, 10), (1001, 10), (900, 9)]));
    let (tx, rx) = notify::channel(buffer);
    let (shutdown, shutdown_rx) = watch::channel(false);
    let scraper = Scraper::new(
        api.clone(),
        store.clone(),
        tiers,
        Arc::new(FixedClassifier(vec![("English".into(), 0.9)])),
        tx,
        shutdown_rx,
    );
    Harness {
        api,
        store,
        scraper,
        events: rx,
        shutdown,
    }
}

pub fn drain(events: &mut mpsc::Receiver<DepartureEvent>) -> Vec<DepartureEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}
