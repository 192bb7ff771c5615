//! Loosely typed views over webhook payloads.
//!
//! Senders disagree on which fields they include, so every field is optional here and the
//! conversions into [`crate::event`] types fill in placeholders.

use chrono::{SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;

use crate::event::{Commit, Pusher, Repository, NO_URL, UNKNOWN};

const NO_COMMIT_MESSAGE: &str = "(no commit message)";

#[derive(Debug, Default, Deserialize)]
pub struct RawRepository {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub html_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub clone_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub default_branch: Option<String>,
}

impl RawRepository {
    /// `None` when the repository has no name, which makes the whole webhook unusable.
    pub fn to_repository(&self) -> Option<Repository> {
        let name = present(&self.name)?;

        Some(Repository {
            name: name.to_owned(),
            full_name: present(&self.full_name).unwrap_or(name).to_owned(),
            url: present(&self.html_url)
                .or_else(|| present(&self.url))
                .or_else(|| present(&self.clone_url))
                .unwrap_or(NO_URL)
                .to_owned(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RawUser {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub login: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub email: Option<String>,
}

impl RawUser {
    pub fn display_name(&self) -> Option<&str> {
        present(&self.name)
            .or_else(|| present(&self.login))
            .or_else(|| present(&self.username))
    }
}

pub fn to_pusher(user: Option<&RawUser>) -> Pusher {
    Pusher {
        name: user
            .and_then(RawUser::display_name)
            .unwrap_or(UNKNOWN)
            .to_owned(),
        email: user
            .and_then(|user| present(&user.email))
            .unwrap_or_default()
            .to_owned(),
    }
}

/// Reads one commit object. Each field is looked up on its own, and a field of an unexpected
/// type counts as missing, so a commit is never dropped because of one odd field.
fn to_commit(commit: &Value, pusher: &Pusher) -> Commit {
    let author = person_name(commit.get("author"))
        .or_else(|| person_name(commit.get("committer")))
        .unwrap_or(pusher.name.as_str());

    Commit {
        id: str_field(commit, "id")
            .or_else(|| str_field(commit, "sha"))
            .unwrap_or(UNKNOWN)
            .to_owned(),
        message: str_field(commit, "message")
            .unwrap_or(NO_COMMIT_MESSAGE)
            .to_owned(),
        author: author.to_owned(),
        url: str_field(commit, "url").unwrap_or(NO_URL).to_owned(),
        timestamp: str_field(commit, "timestamp")
            .or_else(|| str_field(commit, "date"))
            .map(str::to_owned)
            .unwrap_or_else(now),
    }
}

/// Converts a JSON list of commits, skipping entries that aren't objects.
pub fn to_commits(commits: &[Value], pusher: &Pusher) -> Vec<Commit> {
    commits
        .iter()
        .filter(|commit| commit.is_object())
        .map(|commit| to_commit(commit, pusher))
        .collect()
}

/// Authors are usually `{ "name": .. }` objects, but some senders only give the name.
fn person_name(person: Option<&Value>) -> Option<&str> {
    match person? {
        Value::String(name) if !name.is_empty() => Some(name.as_str()),
        other => str_field(other, "name"),
    }
}

/// Best effort deserialization of a payload fragment. Only objects are considered.
pub fn parse<T: DeserializeOwned>(value: &Value) -> Option<T> {
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}

/// Non-empty string under `key`.
pub fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Whether `value[key]` is an object with a non-empty `name`.
pub fn has_name(value: &Value, key: &str) -> bool {
    value
        .get(key)
        .map_or(false, |inner| str_field(inner, "name").is_some())
}

/// Keeps a field only when it has the expected type. Anything else reads as absent instead of
/// failing the whole object.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

pub fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
