use std::collections::HashMap;

use anyhow::{Context, Result};
use sqlx::PgPool;

use super::clan_repo;
use super::models::{Clan, Filter};

const FILTER_COLUMNS: &str = "channel_id, guild_id, min_win_rate, max_days_since_last_battle, \
                              min_top_tier_count, min_battles";

/// Every filter with its tracked clan ids.
pub async fn all_filters(db: &PgPool) -> sqlx::Result<Vec<Filter>> {
    let mut filters =
        sqlx::query_as::<_, Filter>(&format!("SELECT {FILTER_COLUMNS} FROM filters"))
            .fetch_all(db)
            .await?;

    let links: Vec<(String, i64)> =
        sqlx::query_as("SELECT channel_id, clan_id FROM filter_tracked_clans")
            .fetch_all(db)
            .await?;
    let mut by_channel: HashMap<String, Vec<i64>> = HashMap::new();
    for (channel, clan) in links {
        by_channel.entry(channel).or_default().push(clan);
    }
    for filter in &mut filters {
        if let Some(ids) = by_channel.remove(&filter.channel_id) {
            filter.tracked_clan_ids.extend(ids);
        }
    }
    Ok(filters)
}

pub async fn get_filter(db: &PgPool, channel_id: &str) -> Result<Option<Filter>> {
    let filter = sqlx::query_as::<_, Filter>(&format!(
        "SELECT {FILTER_COLUMNS} FROM filters WHERE channel_id = $1"
    ))
    .bind(channel_id)
    .fetch_optional(db)
    .await
    .context("fetching filter")?;

    let Some(mut filter) = filter else {
        return Ok(None);
    };
    let ids: Vec<i64> =
        sqlx::query_scalar("SELECT clan_id FROM filter_tracked_clans WHERE channel_id = $1")
            .bind(channel_id)
            .fetch_all(db)
            .await
            .context("fetching tracked clan ids")?;
    filter.tracked_clan_ids.extend(ids);
    Ok(Some(filter))
}

/// Replace the thresholds of a filter; its tracked clans are kept.
pub async fn upsert_filter(db: &PgPool, filter: &Filter) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO filters (channel_id, guild_id, min_win_rate, max_days_since_last_battle,
                             min_top_tier_count, min_battles)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (channel_id) DO UPDATE
           SET guild_id                   = EXCLUDED.guild_id,
               min_win_rate               = EXCLUDED.min_win_rate,
               max_days_since_last_battle = EXCLUDED.max_days_since_last_battle,
               min_top_tier_count         = EXCLUDED.min_top_tier_count,
               min_battles                = EXCLUDED.min_battles
        "#,
    )
    .bind(&filter.channel_id)
    .bind(&filter.guild_id)
    .bind(filter.min_win_rate)
    .bind(filter.max_days_since_last_battle)
    .bind(filter.min_top_tier_count)
    .bind(filter.min_battles)
    .execute(db)
    .await
    .context("upserting filter")?;
    Ok(())
}

pub async fn tracked_clans(db: &PgPool, channel_id: &str) -> Result<Vec<Clan>> {
    sqlx::query_as::<_, Clan>(
        r#"
        SELECT c.id, c.name, c.tag, c.language, c.created_at, c.updated_at, c.leader_id, c.tracked
          FROM clans c
          JOIN filter_tracked_clans f ON f.clan_id = c.id
         WHERE f.channel_id = $1
         ORDER BY c.tag
        "#,
    )
    .bind(channel_id)
    .fetch_all(db)
    .await
    .context("listing tracked clans")
}

pub async fn track_clan(db: &PgPool, channel_id: &str, clan_id: i64) -> Result<()> {
    sqlx::query(
        "INSERT INTO filter_tracked_clans (channel_id, clan_id) VALUES ($1, $2)
         ON CONFLICT DO NOTHING",
    )
    .bind(channel_id)
    .bind(clan_id)
    .execute(db)
    .await
    .context("tracking clan")?;
    clan_repo::refresh_tracked(db, clan_id)
        .await
        .context("flagging clan as tracked")
}

/// Returns false if the channel was not tracking the clan.
pub async fn untrack_clan(db: &PgPool, channel_id: &str, clan_id: i64) -> Result<bool> {
    let rows = sqlx::query(
        "DELETE FROM filter_tracked_clans WHERE channel_id = $1 AND clan_id = $2",
    )
    .bind(channel_id)
    .bind(clan_id)
    .execute(db)
    .await
    .context("untracking clan")?
    .rows_affected();
    clan_repo::refresh_tracked(db, clan_id)
        .await
        .context("refreshing tracked flag")?;
    Ok(rows > 0)
}

/// Swap the whole tracked set of a channel for `clan_ids` (transactional).
pub async fn replace_tracked_clans(db: &PgPool, channel_id: &str, clan_ids: &[i64]) -> Result<()> {
    let mut tx = db.begin().await?;

    let previous: Vec<i64> = sqlx::query_scalar(
        "DELETE FROM filter_tracked_clans WHERE channel_id = $1 RETURNING clan_id",
    )
    .bind(channel_id)
    .fetch_all(&mut *tx)
    .await
    .context("clearing tracked clans")?;

    sqlx::query(
        "INSERT INTO filter_tracked_clans (channel_id, clan_id)
         SELECT $1, UNNEST($2::BIGINT[])
         ON CONFLICT DO NOTHING",
    )
    .bind(channel_id)
    .bind(clan_ids)
    .execute(&mut *tx)
    .await
    .context("inserting tracked clans")?;

    sqlx::query(
        r#"
        UPDATE clans c
           SET tracked = EXISTS(SELECT 1 FROM filter_tracked_clans f WHERE f.clan_id = c.id)
         WHERE c.id = ANY($1) OR c.id = ANY($2)
        "#,
    )
    .bind(&previous)
    .bind(clan_ids)
    .execute(&mut *tx)
    .await
    .context("refreshing tracked flags")?;

    tx.commit().await?;
    Ok(())
}
