//! Chat message rendering.

use chrono::{TimeZone, Utc};
use wows_recruiter::db::models::{Clan, Filter, Player};
use wows_recruiter::notify::format::{departure_message, escape_markdown, filter_summary};

#[test]
fn inline_markers_are_escaped() {
    assert_eq!(escape_markdown("__bob__"), r"\_\_bob\_\_");
    assert_eq!(escape_markdown("*star*"), r"\*star\*");
    assert_eq!(escape_markdown("[tag]"), r"\[tag\]");
    assert_eq!(escape_markdown("`code`"), r"\`code\`");
}

#[test]
fn line_prefixes_are_escaped() {
    assert_eq!(escape_markdown("# title"), r"\# title");
    assert_eq!(escape_markdown("> quote"), r"\> quote");
    assert_eq!(escape_markdown("- item"), r"\- item");
    assert_eq!(escape_markdown("1. first"), r"1\. first");
}

#[test]
fn backslashes_are_doubled() {
    assert_eq!(escape_markdown(r"a\b"), r"a\\b");
}

#[test]
fn plain_text_is_unchanged() {
    assert_eq!(escape_markdown("Player123"), "Player123");
}

#[test]
fn departure_message_layout() {
    let player = Player {
        id: 5001,
        nick: "sea_wolf".into(),
        account_created_at: Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap(),
        last_battle_at: Utc.with_ymd_and_hms(2024, 3, 9, 18, 30, 0).unwrap(),
        last_logout_at: Utc.with_ymd_and_hms(2024, 3, 9, 19, 0, 0).unwrap(),
        battles: 4321,
        win_rate: 0.5678,
        top_tier_count: 12,
        hidden_profile: false,
        clan_id: None,
        clan_joined_at: None,
    };
    let clan = Clan {
        id: 10,
        name: "Alpha".into(),
        tag: "A_B".into(),
        language: "English".into(),
        created_at: None,
        updated_at: None,
        leader_id: None,
        tracked: true,
        member_ids: vec![],
    };

    assert_eq!(
        departure_message(&player, &clan),
        r"sea\_wolf left clan [A\_B] | WR: 56.78% | Battles: 4321 | T10s: 12 | Last Battle: 2024-03-09 | Stats: https://wows-numbers.com/player/5001,sea_wolf/"
    );
}

#[test]
fn filter_summary_shows_percent() {
    let filter = Filter {
        channel_id: "c".into(),
        guild_id: None,
        min_win_rate: 0.55,
        max_days_since_last_battle: 14,
        min_top_tier_count: 3,
        min_battles: 2000,
        tracked_clan_ids: Default::default(),
    };
    assert_eq!(
        filter_summary(&filter),
        "Minimum Win Rate: 55% | Minimum number of battles: 2000 | Minimum number of T10s: 3 | Maximum number of days since last battle: 14"
    );
}
