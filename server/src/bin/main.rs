use std::process;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{middleware::Logger, web, App, HttpServer};
use redis::Client as RedisClient;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::{oneshot, watch};
use wows_recruiter::cache::TierCache;
use wows_recruiter::config::Settings;
use wows_recruiter::db::{PgStore, Store};
use wows_recruiter::language::WhatlangClassifier;
use wows_recruiter::notify::consumer::Consumer;
use wows_recruiter::notify::discord::DiscordNotifier;
use wows_recruiter::notify::{self, Notifier};
use wows_recruiter::sync::scheduler::{self, Cadence};
use wows_recruiter::sync::Scraper;
use wows_recruiter::wows::{StatsApi, WowsClient};
use wows_recruiter::{http, metrics};

const SCAN_GRACE: Duration = Duration::from_secs(30);

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("configuration error: {e}");
            process::exit(1);
        }
    };
    let default_level = if settings.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
    log::info!("starting recruiter for realm {}", settings.realm);

    // Postgres pool
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    let redis_client = settings
        .redis_url
        .as_deref()
        .map(RedisClient::open)
        .transpose()?;

    let api: Arc<dyn StatsApi> = Arc::new(WowsClient::new(&settings.api_key, settings.realm)?);
    let store: Arc<dyn Store> = Arc::new(PgStore::new(db_pool.clone()));
    let notifier: Arc<dyn Notifier> = Arc::new(DiscordNotifier::new(&settings.discord_token)?);

    // Reference data first: no scan may start without it
    let tiers = Arc::new(TierCache::load(api.as_ref()).await?);

    let (events_tx, events_rx) = notify::channel(settings.event_buffer);
    let (consumer_stop, consumer_stop_rx) = oneshot::channel();
    let (scan_stop, scan_stop_rx) = watch::channel(false);

    let consumer = Consumer::new(store.clone(), notifier.clone(), redis_client.clone())
        .start(events_rx, consumer_stop_rx);

    let scraper = Scraper::new(
        api,
        store,
        tiers,
        Arc::new(WhatlangClassifier),
        events_tx,
        scan_stop_rx.clone(),
    );
    let cadence = Cadence {
        full_scan_every: settings.full_scan_every,
        monitored_scan_every: settings.monitored_scan_every,
        bootstrap_threshold: settings.bootstrap_clan_threshold,
    };
    let scans = scheduler::start(scraper, cadence, scan_stop_rx);

    let notifier_data = web::Data::from(notifier);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(metrics::METRICS.clone())
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(web::Data::new(redis_client.clone()))
            .app_data(notifier_data.clone())
            .configure(http::routes::init_routes)
    })
    .bind(&settings.server_addr)?
    .run()
    .await?;

    log::info!("http server stopped, shutting down background tasks");
    scan_stop.send(true).ok();
    consumer_stop.send(()).ok();
    consumer.await.ok();

    // A pass stops at its next chunk boundary; don't wait forever on a slow request
    let mut scans = scans;
    if tokio::time::timeout(SCAN_GRACE, &mut scans).await.is_err() {
        log::warn!("scan still running after {SCAN_GRACE:?}, aborting");
        scans.abort();
    }
    Ok(())
}
