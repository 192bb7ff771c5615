use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::{
    event::{
        branch_name, Event, EventDetail, EventKind, IssueDetail, Platform, PullRequestDetail,
        Repository, UNKNOWN,
    },
    webhooks::payload::{parse, to_commits, to_pusher, RawRepository, RawUser},
};

pub mod events;
pub use events::*;

pub const X_GITHUB_EVENT: &str = "X-GitHub-Event";

const UNTITLED: &str = "(untitled)";

/// Normalizes a webhook whose type was given in the `X-GitHub-Event` header.
///
/// Returns `None` for unsupported event types and for payloads without a repository name.
pub fn normalize_github(payload: &Value, event_type: &str) -> Option<Event> {
    let raw_repository = payload.get("repository").and_then(parse::<RawRepository>);
    let repository = match raw_repository.as_ref().and_then(RawRepository::to_repository) {
        Some(repository) => repository,
        None => {
            debug!("GitHub {} payload has no repository name", event_type);
            return None;
        }
    };

    match event_type {
        "push" => handle_push(payload_as(payload, event_type)?, repository),
        "create" => handle_ref(payload_as(payload, event_type)?, repository, EventKind::Create),
        "delete" => handle_ref(payload_as(payload, event_type)?, repository, EventKind::Delete),
        "pull_request" => handle_pull_request(payload_as(payload, event_type)?, repository),
        "issues" => handle_issues(payload_as(payload, event_type)?, repository),
        other => {
            debug!("unsupported GitHub event type `{}`", other);
            None
        }
    }
}

fn payload_as<T: DeserializeOwned>(payload: &Value, event_type: &str) -> Option<T> {
    match serde_json::from_value(payload.clone()) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!("couldn't read GitHub {} payload: {}", event_type, e);
            None
        }
    }
}

fn handle_push(event: PushEvent, repository: Repository) -> Option<Event> {
    let pusher = to_pusher(event.pusher.as_ref().or(event.sender.as_ref()));

    let (action, commits) = if event.deleted {
        (EventKind::Delete, Vec::new())
    } else {
        let commits = to_commits(event.commits.as_deref().unwrap_or_default(), &pusher);
        let action = if event.created {
            EventKind::Create
        } else {
            EventKind::Push
        };
        (action, commits)
    };

    let compare_url = event
        .compare
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| repository.url.clone());

    Some(Event {
        platform: Platform::GitHub,
        kind: EventKind::Push,
        action: action.to_string(),
        branch: branch_name(event.r#ref.as_deref()),
        repository,
        pusher,
        commits,
        compare_url,
        detail: None,
    })
}

fn handle_ref(event: RefEvent, repository: Repository, kind: EventKind) -> Option<Event> {
    Some(Event {
        platform: Platform::GitHub,
        action: kind.to_string(),
        kind,
        branch: branch_name(event.full_ref().as_deref()),
        pusher: to_pusher(event.sender.as_ref()),
        commits: Vec::new(),
        compare_url: repository.url.clone(),
        repository,
        detail: None,
    })
}

fn handle_pull_request(event: PullRequestEvent, repository: Repository) -> Option<Event> {
    let pr = event.pull_request;
    let ref_name = |pr_ref: Option<PrRef>| {
        pr_ref
            .and_then(|pr_ref| pr_ref.r#ref)
            .unwrap_or_else(|| UNKNOWN.to_owned())
    };
    let head_branch = ref_name(pr.head);
    let base_branch = ref_name(pr.base);

    Some(Event {
        platform: Platform::GitHub,
        kind: EventKind::PullRequest,
        action: event
            .action
            .unwrap_or_else(|| EventKind::PullRequest.to_string()),
        branch: branch_name(Some(head_branch.as_str())),
        pusher: to_pusher(event.sender.as_ref()),
        commits: Vec::new(),
        compare_url: pr.html_url.unwrap_or_else(|| repository.url.clone()),
        repository,
        detail: Some(EventDetail::PullRequest(PullRequestDetail {
            number: pr.number.unwrap_or_default(),
            title: pr.title.unwrap_or_else(|| UNTITLED.to_owned()),
            body: pr.body,
            state: pr.state.unwrap_or_else(|| UNKNOWN.to_owned()),
            merged: pr.merged.unwrap_or(false),
            base_branch,
            head_branch,
        })),
    })
}

fn handle_issues(event: IssuesEvent, repository: Repository) -> Option<Event> {
    let issue = event.issue;
    let default_branch = event.repository.default_branch;

    Some(Event {
        platform: Platform::GitHub,
        kind: EventKind::Issues,
        action: event.action.unwrap_or_else(|| EventKind::Issues.to_string()),
        branch: default_branch.unwrap_or_else(|| UNKNOWN.to_owned()),
        pusher: to_pusher(event.sender.as_ref()),
        commits: Vec::new(),
        compare_url: issue.html_url.unwrap_or_else(|| repository.url.clone()),
        repository,
        detail: Some(EventDetail::Issue(IssueDetail {
            number: issue.number.unwrap_or_default(),
            title: issue.title.unwrap_or_else(|| UNTITLED.to_owned()),
            body: issue.body,
            state: issue.state.unwrap_or_else(|| UNKNOWN.to_owned()),
            assignee: issue
                .assignee
                .as_ref()
                .and_then(RawUser::display_name)
                .map(str::to_owned),
            labels: issue
                .labels
                .unwrap_or_default()
                .into_iter()
                .map(|label| label.name)
                .collect(),
        })),
    })
}
