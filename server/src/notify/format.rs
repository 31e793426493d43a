//! Chat message rendering.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::db::models::{Clan, Filter, Player};

static BACKSLASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\(\S)").expect("backslash regex"));
static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^(#{1,6} )").expect("heading regex"));
static RULE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^(- *){3,}$").expect("rule regex"));
static ORDERED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(\W* {0,3})(\d+)\. ").expect("ordered list regex"));
static UNORDERED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([^\\\w]*)([+-]) ").expect("unordered list regex"));
static QUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^(\W* {0,3})> ").expect("quote regex"));
static INLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[*_`\[\]]").expect("inline regex"));

/// Escape chat markdown in user-controlled text (nicknames, tags).
pub fn escape_markdown(text: &str) -> String {
    let text = BACKSLASH.replace_all(text, r"\\${1}");
    let text = HEADING.replace_all(&text, r"\${1}");
    let text = RULE.replace_all(&text, |caps: &Captures| caps[0].replacen('-', r"\-", 3));
    let text = ORDERED.replace_all(&text, r"${1}${2}\. ");
    let text = UNORDERED.replace_all(&text, r"${1}\${2} ");
    let text = QUOTE.replace_all(&text, r"${1}\> ");
    INLINE.replace_all(&text, r"\${0}").into_owned()
}

/// One line announcing a departure.
pub fn departure_message(player: &Player, clan: &Clan) -> String {
    format!(
        "{} left clan [{}] | WR: {:.2}% | Battles: {} | T10s: {} | Last Battle: {} | Stats: https://wows-numbers.com/player/{},{}/",
        escape_markdown(&player.nick),
        escape_markdown(&clan.tag),
        player.win_rate * 100.0,
        player.battles,
        player.top_tier_count,
        player.last_battle_at.format("%Y-%m-%d"),
        player.id,
        player.nick,
    )
}

pub fn filter_summary(filter: &Filter) -> String {
    format!(
        "Minimum Win Rate: {}% | Minimum number of battles: {} | Minimum number of T10s: {} | Maximum number of days since last battle: {}",
        (filter.min_win_rate * 100.0).round() as i64,
        filter.min_battles,
        filter.min_top_tier_count,
        filter.max_days_since_last_battle,
    )
}
