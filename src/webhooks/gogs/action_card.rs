//! Gogs can be configured to emit DingTalk messages directly. When such a message is pointed at
//! us, the only structure left is the markdown text of the card, which we pick apart with regexes.
//!
//! This is best effort: any text that happens to look like the card will be accepted.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, trace};

use crate::{
    event::{Commit, Event, EventKind, Platform, Pusher, Repository, UNKNOWN},
    webhooks::payload::str_field,
};

static REPO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Repo: \*\*\[([^\]]+)\]\(([^)]+)\)\*\*").unwrap());
static REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"Ref: \*\*\[([^\]]+)\]\([^)]+\)\*\*").unwrap());
static PUSHER: Lazy<Regex> = Lazy::new(|| Regex::new(r"Pusher: \*\*([^*]+)\*\*").unwrap());
static TOTAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"Total (\d+) commits?\(s\)").unwrap());
static COMMIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"> (\d+)\. \[([^\]]+)\]\(([^)]+)\) ([^-]+) - (.+)").unwrap()
});

pub(super) fn parse_action_card(payload: &Value) -> Option<Event> {
    if str_field(payload, "msgtype") != Some("actionCard") {
        return None;
    }
    let card = payload.get("actionCard").filter(|card| card.is_object())?;
    let text = str_field(card, "text").unwrap_or_default();
    trace!("parsing ActionCard text: {}", text);

    let repo = match REPO.captures(text) {
        Some(repo) => repo,
        None => {
            debug!("couldn't find the repository in ActionCard text");
            return None;
        }
    };
    let name = repo[1].to_owned();
    let url = repo[2].to_owned();

    let branch = REF
        .captures(text)
        .map_or_else(|| UNKNOWN.to_owned(), |r#ref| r#ref[1].to_owned());
    let pusher = PUSHER
        .captures(text)
        .map_or_else(|| UNKNOWN.to_owned(), |pusher| pusher[1].to_owned());

    let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    let commits: Vec<Commit> = COMMIT
        .captures_iter(text)
        .map(|commit| Commit {
            id: commit[2].to_owned(),
            message: commit[5].trim().to_owned(),
            author: commit[4].trim().to_owned(),
            url: commit[3].to_owned(),
            timestamp: now.clone(),
        })
        .collect();

    if let Some(total) = TOTAL.captures(text) {
        trace!(
            "card announces {} commits, found {}",
            &total[1],
            commits.len()
        );
    }

    let compare_url = str_field(card, "singleURL").map_or_else(|| url.clone(), str::to_owned);

    Some(Event {
        platform: Platform::Generic,
        kind: EventKind::Push,
        action: EventKind::Push.to_string(),
        repository: Repository {
            full_name: name.clone(),
            name,
            url,
        },
        branch,
        pusher: Pusher {
            name: pusher,
            email: String::new(),
        },
        commits,
        compare_url,
        detail: None,
    })
}
