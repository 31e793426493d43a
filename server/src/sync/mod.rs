//! Roster synchronization: fetch clans, diff rosters, persist, announce.
//!
//! [`Scraper::scan_all_clans`] walks the whole clan listing;
//! [`Scraper::scan_monitored_clans`] only the tracked clans. Both feed
//! [`Scraper::update_clans`], which works through chunks of at most
//! [`MAX_BATCH`] clans, one request at a time.

pub mod roster;
pub mod scheduler;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};

use crate::cache::TierCache;
use crate::db::models::{Clan, Player, PreviousClan, StoredClan};
use crate::db::Store;
use crate::error::Result;
use crate::language::{clan_text, detect_language, LanguageClassifier};
use crate::metrics::{CHUNK_FAILURES, DEPARTURES, SCAN_PASSES};
use crate::notify::DepartureEvent;
use crate::wows::types::{AccountInfo, ClanInfo, PvpStatistics};
use crate::wows::{StatsApi, MAX_BATCH, PAGE_SIZE};

pub struct Scraper {
    api: Arc<dyn StatsApi>,
    store: Arc<dyn Store>,
    tiers: Arc<TierCache>,
    classifier: Arc<dyn LanguageClassifier>,
    events: mpsc::Sender<DepartureEvent>,
    shutdown: watch::Receiver<bool>,
}

impl Scraper {
    pub fn new(
        api: Arc<dyn StatsApi>,
        store: Arc<dyn Store>,
        tiers: Arc<TierCache>,
        classifier: Arc<dyn LanguageClassifier>,
        events: mpsc::Sender<DepartureEvent>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            api,
            store,
            tiers,
            classifier,
            events,
            shutdown,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    fn stopping(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Full pass over every listed clan.
    ///
    /// A listing error aborts the pass; a failed page of clan details is
    /// logged and the walk continues with the next page.
    pub async fn scan_all_clans(&self) -> Result<()> {
        log::info!("scraper: start scanning all clans");
        SCAN_PASSES.with_label_values(&["full"]).inc();
        let mut page = 1u32;
        loop {
            if self.stopping() {
                log::info!("scraper: shutdown requested, full scan stopped before page [{page}]");
                return Ok(());
            }
            let clan_ids = self.api.clan_ids(page).await?;
            log::info!(
                "scraper: scanning clan page [{page}] ({} clans)",
                clan_ids.len()
            );

            if let Err(e) = self.update_clans(&clan_ids).await {
                CHUNK_FAILURES.inc();
                log::warn!("scraper: clan page [{page}] skipped: {e}");
            }

            if clan_ids.len() < PAGE_SIZE {
                break;
            }
            page += 1;
        }
        log::info!("scraper: finished scanning all clans ({page} pages)");
        Ok(())
    }

    /// Incremental pass over the clans some filter tracks.
    pub async fn scan_monitored_clans(&self) -> Result<()> {
        let clan_ids = self.store.tracked_clan_ids().await?;
        log::info!("scraper: start scanning {} monitored clans", clan_ids.len());
        SCAN_PASSES.with_label_values(&["monitored"]).inc();
        let result = self.update_clans(&clan_ids).await;
        if result.is_err() {
            CHUNK_FAILURES.inc();
        }
        log::info!("scraper: finished scanning {} monitored clans", clan_ids.len());
        result
    }

    /// Synchronize `clan_ids`, chunk by chunk.
    ///
    /// A remote error while fetching a chunk aborts the whole call. Failures
    /// on a single clan or player are logged and skipped.
    pub async fn update_clans(&self, clan_ids: &[i64]) -> Result<()> {
        for chunk in clan_ids.chunks(MAX_BATCH) {
            if self.stopping() {
                log::info!("scraper: shutdown requested, leaving remaining clans for next pass");
                return Ok(());
            }
            for clan in self.fetch_clans(chunk).await? {
                let (id, tag) = (clan.id, clan.tag.clone());
                if let Err(e) = self.sync_clan(clan).await {
                    log::warn!("scraper: clan [{tag}] ({id}) skipped: {e}");
                }
            }
        }
        Ok(())
    }

    /// Clan details for one chunk, disbanded clans dropped.
    pub async fn fetch_clans(&self, clan_ids: &[i64]) -> Result<Vec<Clan>> {
        let clans = self.api.clans(clan_ids).await?;
        Ok(clans
            .into_iter()
            .filter(|c| {
                if c.is_clan_disbanded {
                    log::debug!("scraper: clan [{}] is disbanded, ignoring", c.tag);
                }
                !c.is_clan_disbanded
            })
            .map(|c| self.clan_from_info(c))
            .collect())
    }

    fn clan_from_info(&self, info: ClanInfo) -> Clan {
        let text = clan_text(&info.name, info.description.as_deref());
        let language = detect_language(self.classifier.as_ref(), &text);
        log::debug!("scraper: clan [{}] language detection: {language}", info.tag);
        Clan {
            id: info.clan_id,
            name: info.name,
            tag: info.tag,
            language,
            created_at: info.created_at,
            updated_at: info.updated_at,
            leader_id: info.leader_id,
            tracked: false,
            member_ids: info.members_ids,
        }
    }

    async fn sync_clan(&self, mut clan: Clan) -> Result<()> {
        if let Some(stored) = self.store.stored_clan(clan.id).await? {
            log::debug!("scraper: clan [{}] already present, computing roster diff", clan.tag);
            clan.tracked = stored.clan.tracked;
            let departed = roster::departed(&stored.clan.member_ids, &clan.member_ids);
            if !departed.is_empty() {
                self.record_departures(&stored, &departed).await?;
            }
        }

        self.store.upsert_clan(&clan).await?;
        self.refresh_members(&clan).await;
        Ok(())
    }

    /// Persist and announce the departure of `departed` from `stored`.
    ///
    /// Stats are re-fetched (top-tier count included) for these players only.
    /// Players the service no longer returns are announced with their stored
    /// snapshot. Returns the records written for the departed players.
    async fn record_departures(&self, stored: &StoredClan, departed: &[i64]) -> Result<Vec<Player>> {
        let mut fresh = self.fetch_players(departed, true).await?;
        let left_at = Utc::now();
        let mut written = Vec::with_capacity(departed.len());

        for &id in departed {
            let Some(previous) = stored.members.iter().find(|p| p.id == id) else {
                continue;
            };
            let mut player = fresh.remove(&id).unwrap_or_else(|| {
                log::info!("scraper: player {id} no longer returned by the service, using stored record");
                previous.clone()
            });
            player.clan_id = None;
            player.clan_joined_at = None;

            log::info!(
                "scraper: player '{}' left clan [{}] (language: {})",
                player.nick,
                stored.clan.tag,
                stored.clan.language
            );
            DEPARTURES.inc();

            let event = DepartureEvent {
                player: player.clone(),
                clan: stored.clan.clone(),
            };
            if self.events.send(event).await.is_err() {
                log::warn!("scraper: notification channel closed, departure of {id} not announced");
            }

            let entry = PreviousClan {
                player_id: id,
                clan_id: stored.clan.id,
                joined_at: previous.clan_joined_at,
                left_at,
            };
            if let Err(e) = self.store.insert_previous_clan(&entry).await {
                log::warn!("scraper: could not record previous clan of player {id}: {e}");
            }
            if let Err(e) = self.store.upsert_player(&player).await {
                log::warn!("scraper: could not update player {id}: {e}");
            }
            written.push(player);
        }

        if let Err(e) = self.store.detach_players(stored.clan.id, departed).await {
            log::warn!("scraper: could not detach players from clan [{}]: {e}", stored.clan.tag);
        }
        Ok(written)
    }

    /// Upsert every current member of `clan`.
    ///
    /// Top-tier counts are not recomputed here; the stored count is carried
    /// over. A member still stored under another clan has moved: that move is
    /// recorded as a departure from the other clan first.
    async fn refresh_members(&self, clan: &Clan) {
        log::debug!("scraper: start getting player details for clan [{}]", clan.tag);
        let fetched = match self.fetch_players(&clan.member_ids, false).await {
            Ok(p) => p,
            Err(e) => {
                log::info!("scraper: failed to get players of clan [{}]: {e}", clan.tag);
                return;
            }
        };

        let mut known: HashMap<i64, Player> = match self.store.players(&clan.member_ids).await {
            Ok(players) => players.into_iter().map(|p| (p.id, p)).collect(),
            Err(e) => {
                log::warn!("scraper: could not load stored players of clan [{}]: {e}", clan.tag);
                HashMap::new()
            }
        };

        let mut moved: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
        for player in known.values() {
            if let Some(previous_clan) = player.clan_id.filter(|&c| c != clan.id) {
                moved.entry(previous_clan).or_default().push(player.id);
            }
        }
        for (previous_clan, mut ids) in moved {
            ids.sort_unstable();
            match self.store.stored_clan(previous_clan).await {
                Ok(Some(stored)) => match self.record_departures(&stored, &ids).await {
                    Ok(written) => known.extend(written.into_iter().map(|p| (p.id, p))),
                    Err(e) => log::warn!("scraper: moves out of clan {previous_clan} skipped: {e}"),
                },
                Ok(None) => {}
                Err(e) => log::warn!("scraper: could not load clan {previous_clan}: {e}"),
            }
        }

        let mut players: Vec<Player> = fetched.into_values().collect();
        players.sort_by_key(|p| p.id);
        for mut player in players {
            player.clan_id = Some(clan.id);
            player.top_tier_count = known.get(&player.id).map_or(0, |p| p.top_tier_count);
            if let Err(e) = self.store.upsert_player(&player).await {
                log::warn!("scraper: could not update player {}: {e}", player.id);
            }
        }
        log::debug!("scraper: finished getting player details for clan [{}]", clan.tag);
    }

    /// Player records for `ids`, fetched in batches of [`MAX_BATCH`].
    /// `clan_id` is left unset for the caller to fill in.
    async fn fetch_players(&self, ids: &[i64], with_top_tier: bool) -> Result<HashMap<i64, Player>> {
        let mut players = HashMap::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_BATCH) {
            let accounts = self.api.accounts(chunk).await?;
            let memberships = self.api.clan_memberships(chunk).await?;
            for account in accounts {
                let id = account.account_id;
                let top_tier_count = if with_top_tier {
                    match self.tiers.top_tier_count(self.api.as_ref(), id).await {
                        Ok(n) => n,
                        Err(e) => {
                            log::debug!("scraper: no top-tier count for player {id}: {e}");
                            0
                        }
                    }
                } else {
                    0
                };
                let joined_at = memberships.get(&id).and_then(|m| m.joined_at);
                players.insert(id, player_from_account(account, joined_at, top_tier_count));
            }
        }
        Ok(players)
    }
}

/// `(battles, win_rate)` from PvP statistics.
///
/// Missing statistics or zero battles count as one lost battle, so the rate
/// is always defined and in [0, 1].
pub fn win_rate(pvp: Option<&PvpStatistics>) -> (i32, f64) {
    match pvp.and_then(|p| Some((p.battles?, p.wins?))) {
        Some((battles, wins)) if battles > 0 => {
            let wins = wins.clamp(0, battles);
            (battles as i32, wins as f64 / battles as f64)
        }
        _ => (1, 0.0),
    }
}

pub fn player_from_account(
    account: AccountInfo,
    clan_joined_at: Option<DateTime<Utc>>,
    top_tier_count: i32,
) -> Player {
    let pvp = account.statistics.as_ref().and_then(|s| s.pvp.as_ref());
    if pvp.is_none() {
        log::debug!(
            "scraper: no stats for player {}[{}]",
            account.nickname,
            account.account_id
        );
    }
    let (battles, win_rate) = win_rate(pvp);
    Player {
        id: account.account_id,
        nick: account.nickname,
        account_created_at: account.created_at.unwrap_or_default(),
        last_battle_at: account.last_battle_time.unwrap_or_default(),
        last_logout_at: account.logout_at.unwrap_or_default(),
        battles,
        win_rate,
        top_tier_count,
        hidden_profile: account.hidden_profile,
        clan_id: None,
        clan_joined_at,
    }
}
