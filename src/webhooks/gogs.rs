//! Gogs style webhooks don't say what they contain, so we try a list of known payload shapes in
//! order and keep the first one that yields an event.

use std::slice;

use serde_json::Value;
use tracing::{debug, trace};

use crate::{
    event::{branch_name, Event, EventKind, Platform},
    webhooks::payload::{has_name, parse, str_field, to_commits, to_pusher, RawRepository, RawUser},
};

mod action_card;

type ShapeMatcher = fn(&Value) -> Option<Event>;

const SHAPES: [(&str, ShapeMatcher); 5] = [
    ("DingTalk ActionCard", action_card::parse_action_card),
    ("standard Gogs", standard),
    ("head commit", head_commit),
    ("loose keys", loose_keys),
    ("heuristic", heuristic),
];

const REPOSITORY_CANDIDATES: [&str; 4] = ["repository", "repo", "project", "target"];
const PUSHER_CANDIDATES: [&str; 5] = ["pusher", "sender", "user", "author", "actor"];
const COMMITS_CANDIDATES: [&str; 3] = ["commits", "changeset", "changes"];

pub fn normalize_gogs(payload: &Value) -> Option<Event> {
    if !payload.is_object() {
        debug!("payload isn't a JSON object");
        return None;
    }

    for (name, matcher) in SHAPES {
        match matcher(payload) {
            Some(event) => {
                debug!("recognized {} payload", name);
                return Some(event);
            }
            None => trace!("payload isn't a {} payload", name),
        }
    }

    debug!("no known payload shape matched");
    None
}

/// The pieces of a push we managed to locate in a payload.
struct PushParts<'a> {
    repository: &'a Value,
    pusher: Option<&'a Value>,
    commits: &'a [Value],
    r#ref: Option<&'a str>,
    compare_url: Option<&'a str>,
}

impl PushParts<'_> {
    fn into_event(self) -> Option<Event> {
        let repository = parse::<RawRepository>(self.repository)?.to_repository()?;
        let pusher = to_pusher(self.pusher.and_then(parse::<RawUser>).as_ref());
        let commits = to_commits(self.commits, &pusher);
        let compare_url = self
            .compare_url
            .map_or_else(|| repository.url.clone(), str::to_owned);

        Some(Event {
            platform: Platform::Gogs,
            kind: EventKind::Push,
            action: EventKind::Push.to_string(),
            branch: branch_name(self.r#ref),
            repository,
            pusher,
            commits,
            compare_url,
            detail: None,
        })
    }
}

/// Gogs pushes. Gogs sends `"commits": null` for a push without commits, so the list is optional.
/// Payloads carrying a `head_commit` are left to the next shape.
fn standard(payload: &Value) -> Option<Event> {
    if !has_name(payload, "repository") || has_object(payload, "head_commit") {
        return None;
    }

    PushParts {
        repository: &payload["repository"],
        pusher: payload.get("pusher"),
        commits: commit_list(payload, "commits"),
        r#ref: str_field(payload, "ref"),
        compare_url: str_field(payload, "compare_url"),
    }
    .into_event()
}

/// GitHub compatible pushes, which may only carry a `head_commit`.
fn head_commit(payload: &Value) -> Option<Event> {
    let repository = payload.get("repository").filter(|repo| repo.is_object())?;
    let head_commit = payload.get("head_commit").filter(|commit| commit.is_object())?;

    let commits = match payload.get("commits").and_then(Value::as_array) {
        Some(commits) => commits.as_slice(),
        None => slice::from_ref(head_commit),
    };

    PushParts {
        repository,
        pusher: first_object(payload, &["pusher", "sender"]),
        commits,
        r#ref: str_field(payload, "ref"),
        compare_url: first_str(payload, &["compare", "compare_url"]),
    }
    .into_event()
}

/// Hand-written senders which use `repo`/`project` and `user`/`author`.
fn loose_keys(payload: &Value) -> Option<Event> {
    let repository = first_object(payload, &["repo", "project"])?;

    PushParts {
        repository,
        pusher: first_object(payload, &["user", "author"]),
        commits: commit_list(payload, "commits"),
        r#ref: first_str(payload, &["ref", "branch"]),
        compare_url: first_str(payload, &["compare_url", "url"]),
    }
    .into_event()
}

/// Last resort: try a few likely field names for each part. This is a guess and may pick up
/// unrelated data.
fn heuristic(payload: &Value) -> Option<Event> {
    let repository = REPOSITORY_CANDIDATES
        .iter()
        .find(|key| has_name(payload, key))
        .map(|key| &payload[*key])?;
    let pusher = PUSHER_CANDIDATES
        .iter()
        .find(|key| has_name(payload, key))
        .map(|key| &payload[*key]);
    let commits = COMMITS_CANDIDATES
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_array))
        .map_or(&[][..], Vec::as_slice);

    PushParts {
        repository,
        pusher,
        commits,
        r#ref: first_str(payload, &["ref", "branch", "target_branch"]),
        compare_url: first_str(payload, &["compare_url", "compare", "url"]),
    }
    .into_event()
}

fn has_object(payload: &Value, key: &str) -> bool {
    payload.get(key).map_or(false, Value::is_object)
}

fn first_object<'a>(payload: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| payload.get(*key).filter(|value| value.is_object()))
}

fn first_str<'a>(payload: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| str_field(payload, key))
}

fn commit_list<'a>(payload: &'a Value, key: &str) -> &'a [Value] {
    payload
        .get(key)
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice)
}
