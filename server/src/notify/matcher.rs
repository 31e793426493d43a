//! Filter predicate for departure events.

use chrono::{DateTime, TimeDelta, Utc};

use super::DepartureEvent;
use crate::db::models::Filter;

/// True when the departing player meets every threshold of `filter` and left
/// a clan the filter tracks. Checks short-circuit in order.
pub fn matches(filter: &Filter, event: &DepartureEvent, now: DateTime<Utc>) -> bool {
    let player = &event.player;

    if player.win_rate < filter.min_win_rate {
        log::debug!(
            "notifier: player '{}' did not match WR for filter '{}'",
            player.nick,
            filter.channel_id
        );
        return false;
    }

    // A window reaching past the representable range has no lower bound
    let min_last_battle = TimeDelta::try_hours(24 * i64::from(filter.max_days_since_last_battle))
        .and_then(|window| now.checked_sub_signed(window));
    if min_last_battle.is_some_and(|min| player.last_battle_at < min) {
        log::debug!(
            "notifier: player '{}' did not match last battle date for filter '{}'",
            player.nick,
            filter.channel_id
        );
        return false;
    }

    if player.top_tier_count < filter.min_top_tier_count {
        log::debug!(
            "notifier: player '{}' did not match min T10s for filter '{}'",
            player.nick,
            filter.channel_id
        );
        return false;
    }

    if player.battles < filter.min_battles {
        log::debug!(
            "notifier: player '{}' did not match min battles for filter '{}'",
            player.nick,
            filter.channel_id
        );
        return false;
    }

    if !filter.tracked_clan_ids.contains(&event.clan.id) {
        log::debug!(
            "notifier: player '{}' did not leave a clan tracked by filter '{}'",
            player.nick,
            filter.channel_id
        );
        return false;
    }

    true
}
