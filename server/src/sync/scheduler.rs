//! Timer loop driving the two scan cadences.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::Scraper;

#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    pub full_scan_every: Duration,
    pub monitored_scan_every: Duration,
    /// Run a full scan right away when fewer clans than this are stored.
    pub bootstrap_threshold: i64,
}

async fn bootstrap(scraper: &Scraper, threshold: i64) {
    let stored = match scraper.store().clan_count().await {
        Ok(n) => n,
        Err(e) => {
            log::warn!("scheduler: could not count stored clans: {e}");
            return;
        }
    };
    if stored >= threshold {
        log::info!("scheduler: {stored} clans stored, no bootstrap scan needed");
        return;
    }
    log::info!("scheduler: only {stored} clans stored, running bootstrap scan");
    if let Err(e) = scraper.scan_all_clans().await {
        log::error!("scheduler: bootstrap scan failed: {e}");
    }
}

pub async fn run(scraper: Scraper, cadence: Cadence, mut shutdown: watch::Receiver<bool>) {
    bootstrap(&scraper, cadence.bootstrap_threshold).await;

    let now = Instant::now();
    let mut full = interval_at(now + cadence.full_scan_every, cadence.full_scan_every);
    let mut monitored = interval_at(now + cadence.monitored_scan_every, cadence.monitored_scan_every);
    full.set_missed_tick_behavior(MissedTickBehavior::Delay);
    monitored.set_missed_tick_behavior(MissedTickBehavior::Delay);

    log::info!(
        "scheduler: full scan every {:?}, monitored scan every {:?}",
        cadence.full_scan_every,
        cadence.monitored_scan_every
    );
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = full.tick() => {
                if let Err(e) = scraper.scan_all_clans().await {
                    log::error!("scheduler: full scan failed: {e}");
                }
            }
            _ = monitored.tick() => {
                if let Err(e) = scraper.scan_monitored_clans().await {
                    log::error!("scheduler: monitored scan failed: {e}");
                }
            }
        }
    }
    log::info!("scheduler: stopped");
}

pub fn start(scraper: Scraper, cadence: Cadence, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(run(scraper, cadence, shutdown))
}
