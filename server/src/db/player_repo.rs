use sqlx::PgPool;

use super::models::{Player, PreviousClan};

const PLAYER_COLUMNS: &str = "id, nick, account_created_at, last_battle_at, last_logout_at, \
                              battles, win_rate, top_tier_count, hidden_profile, clan_id, \
                              clan_joined_at";

/// Insert or overwrite every column of a player (last write wins).
pub async fn upsert_player(db: &PgPool, player: &Player) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO players (id, nick, account_created_at, last_battle_at, last_logout_at,
                             battles, win_rate, top_tier_count, hidden_profile, clan_id,
                             clan_joined_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (id) DO UPDATE
           SET nick               = EXCLUDED.nick,
               account_created_at = EXCLUDED.account_created_at,
               last_battle_at     = EXCLUDED.last_battle_at,
               last_logout_at     = EXCLUDED.last_logout_at,
               battles            = EXCLUDED.battles,
               win_rate           = EXCLUDED.win_rate,
               top_tier_count     = EXCLUDED.top_tier_count,
               hidden_profile     = EXCLUDED.hidden_profile,
               clan_id            = EXCLUDED.clan_id,
               clan_joined_at     = EXCLUDED.clan_joined_at
        "#,
    )
    .bind(player.id)
    .bind(&player.nick)
    .bind(player.account_created_at)
    .bind(player.last_battle_at)
    .bind(player.last_logout_at)
    .bind(player.battles)
    .bind(player.win_rate)
    .bind(player.top_tier_count)
    .bind(player.hidden_profile)
    .bind(player.clan_id)
    .bind(player.clan_joined_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn players_by_ids(db: &PgPool, ids: &[i64]) -> sqlx::Result<Vec<Player>> {
    sqlx::query_as::<_, Player>(&format!(
        "SELECT {PLAYER_COLUMNS} FROM players WHERE id = ANY($1) ORDER BY id"
    ))
    .bind(ids)
    .fetch_all(db)
    .await
}

/// Players currently pointing at `clan_id`.
pub async fn members_of(db: &PgPool, clan_id: i64) -> sqlx::Result<Vec<Player>> {
    sqlx::query_as::<_, Player>(&format!(
        "SELECT {PLAYER_COLUMNS} FROM players WHERE clan_id = $1 ORDER BY id"
    ))
    .bind(clan_id)
    .fetch_all(db)
    .await
}

pub async fn detach_players(db: &PgPool, clan_id: i64, ids: &[i64]) -> sqlx::Result<u64> {
    let rows = sqlx::query(
        r#"
        UPDATE players
           SET clan_id = NULL,
               clan_joined_at = NULL
         WHERE clan_id = $1
           AND id = ANY($2)
        "#,
    )
    .bind(clan_id)
    .bind(ids)
    .execute(db)
    .await?
    .rows_affected();
    Ok(rows)
}

pub async fn insert_previous_clan(db: &PgPool, entry: &PreviousClan) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO previous_clans (player_id, clan_id, joined_at, left_at)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(entry.player_id)
    .bind(entry.clan_id)
    .bind(entry.joined_at)
    .bind(entry.left_at)
    .execute(db)
    .await?;
    Ok(())
}

/// Weakest player above `min_win_rate`, used for synthetic notifications.
pub async fn player_above_win_rate(db: &PgPool, min_win_rate: f64) -> sqlx::Result<Option<Player>> {
    sqlx::query_as::<_, Player>(&format!(
        "SELECT {PLAYER_COLUMNS} FROM players WHERE win_rate > $1 ORDER BY win_rate LIMIT 1"
    ))
    .bind(min_win_rate)
    .fetch_optional(db)
    .await
}
