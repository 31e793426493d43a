use sqlx::PgPool;

use super::models::Clan;

const CLAN_COLUMNS: &str = "id, name, tag, language, created_at, updated_at, leader_id, tracked";

/// Insert or fully overwrite the remote-observed columns of a clan.
/// `tracked` is subscription state and survives the overwrite.
pub async fn upsert_clan(db: &PgPool, clan: &Clan) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO clans (id, name, tag, language, created_at, updated_at, leader_id, tracked)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (id) DO UPDATE
           SET name       = EXCLUDED.name,
               tag        = EXCLUDED.tag,
               language   = EXCLUDED.language,
               created_at = EXCLUDED.created_at,
               updated_at = EXCLUDED.updated_at,
               leader_id  = EXCLUDED.leader_id
        "#,
    )
    .bind(clan.id)
    .bind(&clan.name)
    .bind(&clan.tag)
    .bind(&clan.language)
    .bind(clan.created_at)
    .bind(clan.updated_at)
    .bind(clan.leader_id)
    .bind(clan.tracked)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn find_clan(db: &PgPool, id: i64) -> sqlx::Result<Option<Clan>> {
    sqlx::query_as::<_, Clan>(&format!("SELECT {CLAN_COLUMNS} FROM clans WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Tags are not unique upstream; the oldest id wins.
pub async fn find_clan_by_tag(db: &PgPool, tag: &str) -> sqlx::Result<Option<Clan>> {
    sqlx::query_as::<_, Clan>(&format!(
        "SELECT {CLAN_COLUMNS} FROM clans WHERE tag = $1 ORDER BY id LIMIT 1"
    ))
    .bind(tag)
    .fetch_optional(db)
    .await
}

pub async fn tracked_clan_ids(db: &PgPool) -> sqlx::Result<Vec<i64>> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM clans WHERE tracked ORDER BY id")
        .fetch_all(db)
        .await
}

pub async fn clan_count(db: &PgPool) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clans")
        .fetch_one(db)
        .await
}

/// Recompute the `tracked` flag from the filters referencing the clan.
pub async fn refresh_tracked(db: &PgPool, clan_id: i64) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE clans
           SET tracked = EXISTS(SELECT 1 FROM filter_tracked_clans WHERE clan_id = $1)
         WHERE id = $1
        "#,
    )
    .bind(clan_id)
    .execute(db)
    .await?;
    Ok(())
}
