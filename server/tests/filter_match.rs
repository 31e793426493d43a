//! Departure filter predicate.

mod common;

use chrono::{DateTime, Duration, Utc};
use common::filter;
use wows_recruiter::db::models::{Clan, Filter, Player};
use wows_recruiter::notify::matcher::matches;
use wows_recruiter::notify::DepartureEvent;

fn event(now: DateTime<Utc>, win_rate: f64) -> DepartureEvent {
    DepartureEvent {
        player: Player {
            id: 42,
            nick: "leaver".into(),
            account_created_at: now - Duration::days(900),
            last_battle_at: now - Duration::days(2),
            last_logout_at: now - Duration::days(2),
            battles: 3000,
            win_rate,
            top_tier_count: 4,
            hidden_profile: false,
            clan_id: None,
            clan_joined_at: None,
        },
        clan: Clan {
            id: 10,
            name: "Alpha".into(),
            tag: "ALPHA".into(),
            language: "English".into(),
            created_at: None,
            updated_at: None,
            leader_id: None,
            tracked: true,
            member_ids: vec![],
        },
    }
}

fn strict(channel: &str) -> Filter {
    Filter {
        min_top_tier_count: 4,
        min_battles: 3000,
        max_days_since_last_battle: 2,
        ..filter(channel, 0.5, &[10])
    }
}

#[test]
fn all_thresholds_met_matches() {
    let now = Utc::now();
    assert!(matches(&strict("c"), &event(now, 0.5), now));
}

#[test]
fn low_win_rate_never_matches() {
    let now = Utc::now();
    assert!(!matches(&strict("c"), &event(now, 0.4), now));
}

#[test]
fn stale_last_battle_does_not_match() {
    let now = Utc::now();
    let mut e = event(now, 0.6);
    e.player.last_battle_at = now - Duration::days(2) - Duration::minutes(1);
    assert!(!matches(&strict("c"), &e, now));
}

#[test]
fn too_few_top_tier_ships_does_not_match() {
    let now = Utc::now();
    let mut e = event(now, 0.6);
    e.player.top_tier_count = 3;
    assert!(!matches(&strict("c"), &e, now));
}

#[test]
fn too_few_battles_does_not_match() {
    let now = Utc::now();
    let mut e = event(now, 0.6);
    e.player.battles = 2999;
    assert!(!matches(&strict("c"), &e, now));
}

#[test]
fn untracked_clan_does_not_match() {
    let now = Utc::now();
    let f = Filter {
        tracked_clan_ids: [11, 12].into_iter().collect(),
        ..strict("c")
    };
    assert!(!matches(&f, &event(now, 0.9), now));
}

#[test]
fn zero_thresholds_match_any_recent_departure_from_tracked_clan() {
    let now = Utc::now();
    let f = filter("c", 0.0, &[10]);
    let mut e = event(now, 0.0);
    e.player.battles = 1;
    e.player.top_tier_count = 0;
    assert!(matches(&f, &e, now));
}

#[test]
fn huge_day_window_matches_without_lower_bound() {
    let now = Utc::now();
    let f = Filter {
        max_days_since_last_battle: i32::MAX,
        ..strict("c")
    };
    let mut e = event(now, 0.6);
    e.player.last_battle_at = DateTime::<Utc>::default();
    assert!(matches(&f, &e, now));
}
