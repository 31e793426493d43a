//! Persistence gateway.
//!
//! The scraper and the notifier only see [`Store`]; [`PgStore`] backs it with
//! Postgres. Upserts overwrite every column on primary-key conflict.

pub mod clan_repo;
pub mod filter_repo;
pub mod models;
pub mod player_repo;

use async_trait::async_trait;
use sqlx::PgPool;

use models::{Clan, Filter, Player, PreviousClan, StoredClan};

#[async_trait]
pub trait Store: Send + Sync {
    async fn upsert_clan(&self, clan: &Clan) -> sqlx::Result<()>;

    async fn upsert_player(&self, player: &Player) -> sqlx::Result<()>;

    /// Insert-only; a departure is recorded once and never updated.
    async fn insert_previous_clan(&self, entry: &PreviousClan) -> sqlx::Result<()>;

    async fn tracked_clan_ids(&self) -> sqlx::Result<Vec<i64>>;

    /// The stored clan and its stored roster, `None` if never seen.
    async fn stored_clan(&self, clan_id: i64) -> sqlx::Result<Option<StoredClan>>;

    async fn players(&self, ids: &[i64]) -> sqlx::Result<Vec<Player>>;

    /// Clear the clan association of `ids` if they still point at `clan_id`.
    async fn detach_players(&self, clan_id: i64, ids: &[i64]) -> sqlx::Result<()>;

    async fn clan_count(&self) -> sqlx::Result<i64>;

    async fn filters(&self) -> sqlx::Result<Vec<Filter>>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn upsert_clan(&self, clan: &Clan) -> sqlx::Result<()> {
        clan_repo::upsert_clan(&self.pool, clan).await
    }

    async fn upsert_player(&self, player: &Player) -> sqlx::Result<()> {
        player_repo::upsert_player(&self.pool, player).await
    }

    async fn insert_previous_clan(&self, entry: &PreviousClan) -> sqlx::Result<()> {
        player_repo::insert_previous_clan(&self.pool, entry).await
    }

    async fn tracked_clan_ids(&self) -> sqlx::Result<Vec<i64>> {
        clan_repo::tracked_clan_ids(&self.pool).await
    }

    async fn stored_clan(&self, clan_id: i64) -> sqlx::Result<Option<StoredClan>> {
        let Some(mut clan) = clan_repo::find_clan(&self.pool, clan_id).await? else {
            return Ok(None);
        };
        let members = player_repo::members_of(&self.pool, clan_id).await?;
        clan.member_ids = members.iter().map(|p| p.id).collect();
        Ok(Some(StoredClan { clan, members }))
    }

    async fn players(&self, ids: &[i64]) -> sqlx::Result<Vec<Player>> {
        player_repo::players_by_ids(&self.pool, ids).await
    }

    async fn detach_players(&self, clan_id: i64, ids: &[i64]) -> sqlx::Result<()> {
        player_repo::detach_players(&self.pool, clan_id, ids).await?;
        Ok(())
    }

    async fn clan_count(&self) -> sqlx::Result<i64> {
        clan_repo::clan_count(&self.pool).await
    }

    async fn filters(&self) -> sqlx::Result<Vec<Filter>> {
        filter_repo::all_filters(&self.pool).await
    }
}
