//! Departure notifications: the scraper → consumer hand-off and chat delivery.
//
//  The channel is a bounded tokio mpsc. A full channel makes the scraper wait,
//  so scraping never outruns delivery by more than the buffer.
//
//  Redis pub/sub (optional)
//  ------------------------
//  clan:<clan_id>:departures – JSON `DepartureEvent` per departure

pub mod consumer;
pub mod discord;
pub mod format;
pub mod matcher;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::db::models::{Clan, Player};
use crate::error::NotifyError;

/// A player observed leaving a clan, with fresh stats.
#[derive(Debug, Clone, Serialize)]
pub struct DepartureEvent {
    pub player: Player,
    /// The clan as it was stored before the departure.
    pub clan: Clan,
}

pub fn channel(capacity: usize) -> (mpsc::Sender<DepartureEvent>, mpsc::Receiver<DepartureEvent>) {
    mpsc::channel(capacity)
}

/// Outbound chat messages keyed by channel id.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), NotifyError>;
}
