use std::fmt::Display;

/// Where a webhook came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Gogs,
    GitHub,
    /// Payloads that were already rendered upstream, e.g. a DingTalk ActionCard.
    Generic,
}

impl Platform {
    pub fn label(self) -> &'static str {
        match self {
            Self::Gogs => "Gogs",
            Self::GitHub => "GitHub",
            Self::Generic => "Webhook",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Push,
    Create,
    Delete,
    PullRequest,
    Issues,
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Push => "push",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::PullRequest => "pull_request",
            Self::Issues => "issues",
            Self::Other(other) => other,
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pusher {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub id: String,
    pub message: String,
    pub author: String,
    pub url: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestDetail {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub state: String,
    pub merged: bool,
    pub base_branch: String,
    pub head_branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDetail {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub state: String,
    pub assignee: Option<String>,
    pub labels: Vec<String>,
}

/// Extra information carried by pull request and issue events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDetail {
    PullRequest(PullRequestDetail),
    Issue(IssueDetail),
}

/// A webhook, normalized into a platform independent shape.
///
/// Every field is populated, possibly with placeholders; normalizers return `None` instead of a
/// half-filled event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub platform: Platform,
    pub kind: EventKind,
    pub action: String,
    pub repository: Repository,
    pub branch: String,
    pub pusher: Pusher,
    pub commits: Vec<Commit>,
    pub compare_url: String,
    pub detail: Option<EventDetail>,
}

impl Event {
    pub fn pull_request(&self) -> Option<&PullRequestDetail> {
        match &self.detail {
            Some(EventDetail::PullRequest(pr)) => Some(pr),
            _ => None,
        }
    }

    pub fn issue(&self) -> Option<&IssueDetail> {
        match &self.detail {
            Some(EventDetail::Issue(issue)) => Some(issue),
            _ => None,
        }
    }
}

pub const UNKNOWN: &str = "unknown";
pub const NO_URL: &str = "#";

/// Strips a leading `refs/heads/` or `refs/tags/` from a git ref.
pub fn branch_name(r#ref: Option<&str>) -> String {
    match r#ref {
        Some(r#ref) => r#ref
            .strip_prefix("refs/heads/")
            .or_else(|| r#ref.strip_prefix("refs/tags/"))
            .unwrap_or(r#ref)
            .to_owned(),
        None => UNKNOWN.to_owned(),
    }
}
