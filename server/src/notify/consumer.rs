//! Long-running task matching departure events against every stored filter.

use std::sync::Arc;

use chrono::Utc;
use redis::{AsyncCommands, Client as RedisClient};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::{format, matcher, DepartureEvent, Notifier};
use crate::db::Store;
use crate::metrics::NOTIFICATIONS_SENT;

pub struct Consumer {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    redis: Option<RedisClient>,
}

impl Consumer {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>, redis: Option<RedisClient>) -> Self {
        Self {
            store,
            notifier,
            redis,
        }
    }

    /// Spawn the consumer loop as a Tokio task.
    pub fn start(
        self,
        events: mpsc::Receiver<DepartureEvent>,
        shutdown: oneshot::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(events, shutdown))
    }

    /// Read events in order until shutdown is requested or every sender is
    /// gone. Events still buffered at shutdown are not delivered.
    pub async fn run(
        self,
        mut events: mpsc::Receiver<DepartureEvent>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        log::info!("notifier: starting main loop");
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    log::info!("notifier: received exit signal");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => {
                        self.dispatch(&event).await;
                    }
                    None => {
                        log::info!("notifier: event channel closed");
                        break;
                    }
                },
            }
        }
    }

    /// Send one message per matching filter; returns how many were delivered.
    pub async fn dispatch(&self, event: &DepartureEvent) -> usize {
        self.publish(event).await;

        let filters = match self.store.filters().await {
            Ok(f) => f,
            Err(e) => {
                log::warn!("notifier: could not load filters: {e}");
                return 0;
            }
        };

        let now = Utc::now();
        let message = format::departure_message(&event.player, &event.clan);
        let mut sent = 0;
        for filter in filters.iter().filter(|f| matcher::matches(f, event, now)) {
            log::info!(
                "notifier: sending <{message}> on channel '{}'",
                filter.channel_id
            );
            match self.notifier.send_message(&filter.channel_id, &message).await {
                Ok(()) => {
                    sent += 1;
                    NOTIFICATIONS_SENT.inc();
                }
                Err(e) => log::warn!("notifier: delivery to '{}' failed: {e}", filter.channel_id),
            }
        }
        sent
    }

    /// Mirror the event on Redis pub/sub for other consumers.
    async fn publish(&self, event: &DepartureEvent) {
        let Some(redis) = &self.redis else {
            return;
        };
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("notifier: could not serialize departure: {e}");
                return;
            }
        };
        match redis.get_multiplexed_async_connection().await {
            Ok(mut conn) => {
                let channel = format!("clan:{}:departures", event.clan.id);
                if let Err(e) = conn.publish::<_, _, ()>(&channel, payload).await {
                    log::warn!("notifier: publish on '{channel}' failed: {e}");
                }
            }
            Err(e) => log::warn!("notifier: redis unavailable: {e}"),
        }
    }
}
