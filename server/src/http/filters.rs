//! Per-channel filter management (set / get / tracked clans / test message)

use std::collections::HashSet;

use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::db::models::{Clan, Filter, UNKNOWN_LANGUAGE};
use crate::db::{clan_repo, filter_repo, player_repo};
use crate::notify::{format, Notifier};

const FILTER_NOT_SET: &str = "filter not set";
/// A century; anything longer means "any time".
pub const MAX_DAYS_LAST_BATTLE: i32 = 36_500;

//////////////////////////////////////////////////
// Data transfer objects
//////////////////////////////////////////////////

#[derive(Debug, Deserialize)]
pub struct FilterReq {
    pub min_t10: i32,
    pub max_days_last_battle: i32,
    pub min_battles: i32,
    /// Percent, 0..=100.
    pub min_winrate: i32,
    #[serde(default)]
    pub guild_id: Option<String>,
}

impl FilterReq {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.min_t10 < 0 {
            return Err("min_t10 must be >= 0");
        }
        if !(0..=MAX_DAYS_LAST_BATTLE).contains(&self.max_days_last_battle) {
            return Err("max_days_last_battle must be between 0 and 36500");
        }
        if self.min_battles < 0 {
            return Err("min_battles must be >= 0");
        }
        if !(0..=100).contains(&self.min_winrate) {
            return Err("min_winrate must be between 0 and 100");
        }
        Ok(())
    }

    pub fn into_filter(self, channel_id: String) -> Filter {
        Filter {
            channel_id,
            guild_id: self.guild_id,
            min_win_rate: f64::from(self.min_winrate) / 100.0,
            max_days_since_last_battle: self.max_days_last_battle,
            min_top_tier_count: self.min_t10,
            min_battles: self.min_battles,
            tracked_clan_ids: HashSet::new(),
        }
    }
}

#[derive(Serialize)]
pub struct FilterView {
    pub filter: Filter,
    pub summary: String,
}

#[derive(Serialize)]
pub struct ReplaceReport {
    pub tracked: usize,
    pub unknown_tags: Vec<String>,
}

//////////////////////////////////////////////////
// CSV helpers
//////////////////////////////////////////////////

/// Clan tags from the first column of a CSV document, blanks and duplicates
/// dropped, first occurrence order kept.
pub fn parse_clan_tags(body: &str) -> Result<Vec<String>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut seen = HashSet::new();
    let mut tags = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(tag) = record.get(0).filter(|t| !t.is_empty()) {
            if seen.insert(tag.to_string()) {
                tags.push(tag.to_string());
            }
        }
    }
    Ok(tags)
}

/// `tag,name,language,created_at,id`, one clan per line.
pub fn clans_csv(clans: &[Clan]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for clan in clans {
        let created_at = clan
            .created_at
            .map(|d| d.to_rfc3339())
            .unwrap_or_default();
        writer.write_record([
            clan.tag.as_str(),
            clan.name.as_str(),
            clan.language.as_str(),
            created_at.as_str(),
            clan.id.to_string().as_str(),
        ])?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

//////////////////////////////////////////////////
// Handlers
//////////////////////////////////////////////////

/// Every mutating endpoint needs the filter to exist first.
async fn filter_exists(db: &PgPool, channel_id: &str) -> Result<bool, HttpResponse> {
    match filter_repo::get_filter(db, channel_id).await {
        Ok(f) => Ok(f.is_some()),
        Err(e) => {
            log::warn!("http: filter lookup for '{channel_id}' failed: {e:#}");
            Err(HttpResponse::InternalServerError().body("DB error"))
        }
    }
}

/// GET /api/filters/{channel}
#[get("/filters/{channel}")]
pub async fn get_filter(path: web::Path<String>, db: web::Data<PgPool>) -> impl Responder {
    let channel_id = path.into_inner();
    match filter_repo::get_filter(&db, &channel_id).await {
        Ok(Some(filter)) => {
            let summary = format::filter_summary(&filter);
            HttpResponse::Ok().json(FilterView { filter, summary })
        }
        Ok(None) => HttpResponse::NotFound().body(FILTER_NOT_SET),
        Err(_) => HttpResponse::InternalServerError().body("DB error"),
    }
}

/// PUT /api/filters/{channel}
#[put("/filters/{channel}")]
pub async fn set_filter(
    path: web::Path<String>,
    body: web::Json<FilterReq>,
    db: web::Data<PgPool>,
) -> impl Responder {
    let req = body.into_inner();
    if let Err(msg) = req.validate() {
        return HttpResponse::BadRequest().body(msg);
    }
    let filter = req.into_filter(path.into_inner());
    if let Err(e) = filter_repo::upsert_filter(&db, &filter).await {
        log::warn!("http: saving filter '{}' failed: {e:#}", filter.channel_id);
        return HttpResponse::InternalServerError().body("DB error");
    }
    HttpResponse::Ok().body(format::filter_summary(&filter))
}

/// GET /api/filters/{channel}/clans
#[get("/filters/{channel}/clans")]
pub async fn list_clans(path: web::Path<String>, db: web::Data<PgPool>) -> impl Responder {
    let channel_id = path.into_inner();
    match filter_exists(&db, &channel_id).await {
        Ok(true) => {}
        Ok(false) => return HttpResponse::NotFound().body(FILTER_NOT_SET),
        Err(resp) => return resp,
    }

    let clans = match filter_repo::tracked_clans(&db, &channel_id).await {
        Ok(c) => c,
        Err(_) => return HttpResponse::InternalServerError().body("DB error"),
    };
    match clans_csv(&clans) {
        Ok(body) => HttpResponse::Ok().content_type("text/csv").body(body),
        Err(_) => HttpResponse::InternalServerError().body("Serialization error"),
    }
}

/// PUT /api/filters/{channel}/clans, body: CSV whose first column is a tag
#[put("/filters/{channel}/clans")]
pub async fn replace_clans(
    path: web::Path<String>,
    body: String,
    db: web::Data<PgPool>,
) -> impl Responder {
    let channel_id = path.into_inner();
    match filter_exists(&db, &channel_id).await {
        Ok(true) => {}
        Ok(false) => return HttpResponse::NotFound().body(FILTER_NOT_SET),
        Err(resp) => return resp,
    }

    let tags = match parse_clan_tags(&body) {
        Ok(t) => t,
        Err(_) => return HttpResponse::BadRequest().body("invalid csv"),
    };

    let mut clan_ids = Vec::with_capacity(tags.len());
    let mut unknown_tags = Vec::new();
    for tag in tags {
        match clan_repo::find_clan_by_tag(&db, &tag).await {
            Ok(Some(clan)) => clan_ids.push(clan.id),
            Ok(None) => unknown_tags.push(tag),
            Err(_) => return HttpResponse::InternalServerError().body("DB error"),
        }
    }

    if let Err(e) = filter_repo::replace_tracked_clans(&db, &channel_id, &clan_ids).await {
        log::warn!("http: replacing clans of '{channel_id}' failed: {e:#}");
        return HttpResponse::InternalServerError().body("DB error");
    }
    HttpResponse::Ok().json(ReplaceReport {
        tracked: clan_ids.len(),
        unknown_tags,
    })
}

/// POST /api/filters/{channel}/clans/{tag}
#[post("/filters/{channel}/clans/{tag}")]
pub async fn add_clan(path: web::Path<(String, String)>, db: web::Data<PgPool>) -> impl Responder {
    let (channel_id, tag) = path.into_inner();
    match filter_exists(&db, &channel_id).await {
        Ok(true) => {}
        Ok(false) => return HttpResponse::NotFound().body(FILTER_NOT_SET),
        Err(resp) => return resp,
    }

    let clan = match clan_repo::find_clan_by_tag(&db, &tag).await {
        Ok(Some(c)) => c,
        Ok(None) => return HttpResponse::NotFound().body(format!("clan [{tag}] doesn't seem to exist")),
        Err(_) => return HttpResponse::InternalServerError().body("DB error"),
    };
    match filter_repo::track_clan(&db, &channel_id, clan.id).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "clan_id": clan.id, "tag": clan.tag })),
        Err(_) => HttpResponse::InternalServerError().body("DB error"),
    }
}

/// DELETE /api/filters/{channel}/clans/{tag}
#[delete("/filters/{channel}/clans/{tag}")]
pub async fn remove_clan(path: web::Path<(String, String)>, db: web::Data<PgPool>) -> impl Responder {
    let (channel_id, tag) = path.into_inner();
    match filter_exists(&db, &channel_id).await {
        Ok(true) => {}
        Ok(false) => return HttpResponse::NotFound().body(FILTER_NOT_SET),
        Err(resp) => return resp,
    }

    let clan = match clan_repo::find_clan_by_tag(&db, &tag).await {
        Ok(Some(c)) => c,
        Ok(None) => return HttpResponse::NotFound().body(format!("clan [{tag}] doesn't seem to exist")),
        Err(_) => return HttpResponse::InternalServerError().body("DB error"),
    };
    match filter_repo::untrack_clan(&db, &channel_id, clan.id).await {
        Ok(true) => HttpResponse::NoContent().finish(),
        Ok(false) => HttpResponse::NotFound().body(format!("clan [{tag}] is not tracked here")),
        Err(_) => HttpResponse::InternalServerError().body("DB error"),
    }
}

/// POST /api/filters/{channel}/test
///
/// Sends a made-up departure of a stored player to the channel.
#[post("/filters/{channel}/test")]
pub async fn send_test(
    path: web::Path<String>,
    db: web::Data<PgPool>,
    notifier: web::Data<dyn Notifier>,
) -> impl Responder {
    let channel_id = path.into_inner();
    match filter_exists(&db, &channel_id).await {
        Ok(true) => {}
        Ok(false) => return HttpResponse::NotFound().body(FILTER_NOT_SET),
        Err(resp) => return resp,
    }

    let floor = rand::rng().random_range(0.30..0.60);

    let player = match player_repo::player_above_win_rate(&db, floor).await {
        Ok(Some(p)) => p,
        Ok(None) => return HttpResponse::NotFound().body("no player above the drawn win rate"),
        Err(_) => return HttpResponse::InternalServerError().body("DB error"),
    };
    let clan = Clan {
        id: 0,
        name: String::new(),
        tag: "TEST".into(),
        language: UNKNOWN_LANGUAGE.into(),
        created_at: None,
        updated_at: None,
        leader_id: None,
        tracked: false,
        member_ids: Vec::new(),
    };

    let message = format::departure_message(&player, &clan);
    match notifier.send_message(&channel_id, &message).await {
        Ok(()) => HttpResponse::Ok().body(message),
        Err(e) => {
            log::warn!("http: test message to '{channel_id}' failed: {e}");
            HttpResponse::BadGateway().body("delivery failed")
        }
    }
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_filter)
        .service(set_filter)
        .service(list_clans)
        .service(replace_clans)
        .service(add_clan)
        .service(remove_clan)
        .service(send_test);
}
