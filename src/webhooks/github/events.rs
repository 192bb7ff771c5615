use serde::Deserialize;
use serde_json::Value;

use crate::webhooks::payload::{RawRepository, RawUser};

#[derive(Debug, Deserialize)]
pub struct PushEvent {
    pub repository: RawRepository,
    pub pusher: Option<RawUser>,
    pub sender: Option<RawUser>,
    pub commits: Option<Vec<Value>>,
    pub r#ref: Option<String>,
    pub compare: Option<String>,
    #[serde(default)]
    pub created: bool,
    #[serde(default)]
    pub deleted: bool,
}

/// Payload of both `create` and `delete` events.
#[derive(Debug, Deserialize)]
pub struct RefEvent {
    pub repository: RawRepository,
    pub sender: Option<RawUser>,
    pub r#ref: Option<String>,
    /// `branch` or `tag`
    pub ref_type: Option<String>,
}

impl RefEvent {
    /// Rebuilds a full git ref, e.g. `refs/tags/v1`.
    pub fn full_ref(&self) -> Option<String> {
        match (&self.ref_type, &self.r#ref) {
            (Some(ref_type), Some(r#ref)) => Some(format!("refs/{}s/{}", ref_type, r#ref)),
            (None, Some(r#ref)) => Some(r#ref.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PullRequestEvent {
    pub action: Option<String>,
    pub repository: RawRepository,
    pub sender: Option<RawUser>,
    pub pull_request: PullRequest,
}

#[derive(Debug, Deserialize)]
pub struct PullRequest {
    pub number: Option<u64>,
    pub html_url: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub state: Option<String>,
    pub merged: Option<bool>,
    pub base: Option<PrRef>,
    pub head: Option<PrRef>,
}

#[derive(Debug, Deserialize)]
pub struct PrRef {
    pub r#ref: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IssuesEvent {
    pub action: Option<String>,
    pub repository: RawRepository,
    pub sender: Option<RawUser>,
    pub issue: Issue,
}

#[derive(Debug, Deserialize)]
pub struct Issue {
    pub number: Option<u64>,
    pub html_url: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub state: Option<String>,
    pub assignee: Option<RawUser>,
    pub labels: Option<Vec<Label>>,
}

#[derive(Debug, Deserialize)]
pub struct Label {
    pub name: String,
}
