use std::fmt::Write;

use crate::{
    bot::{
        message_builder::{Link, MessageBuilder},
        utils::{short_id, shorten_content},
    },
    config::MessageTemplate,
    event::{Event, EventKind, IssueDetail, PullRequestDetail},
};

const PREVIEW_LENGTH: usize = 200;
const SHORT_ID_LENGTH: usize = 8;

const PUSH: &str = "📦";
const BRANCH_CREATED: &str = "🌱";
const REF_CREATED: &str = "✨";
const DELETED: &str = "🗑️";
const PR_OPENED: &str = "🔄";
const PR_MERGED: &str = "✅";
const PR_CLOSED: &str = "❌";
const ISSUE_OPENED: &str = "🔥";
const ISSUE_CLOSED: &str = "✅";
const ISSUE_REOPENED: &str = "🔄";
const ISSUE_OTHER: &str = "📝";
const OTHER: &str = "🔔";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub title: String,
    pub body: String,
}

/// Renders the markdown notification for `event`.
pub fn render(event: &Event, template: &MessageTemplate) -> RenderedMessage {
    let mut message = MessageBuilder::new();

    match (&event.kind, event.action.as_str()) {
        (EventKind::Push, "delete") => {
            header(&mut message, event, template, DELETED, "branch deleted");
            repository_field(&mut message, event);
            message.field("Deleted by", &event.pusher.name);
            message.field("Deleted branch", &event.branch);
        }
        (EventKind::Push, "create") => {
            header(&mut message, event, template, BRANCH_CREATED, "new branch created");
            repository_field(&mut message, event);
            message.field("Created by", &event.pusher.name);
            message.field("New branch", &event.branch);
        }
        (EventKind::Push, _) => render_push(&mut message, event, template),
        (EventKind::Create, _) => {
            header(&mut message, event, template, REF_CREATED, "branch/tag created");
            repository_field(&mut message, event);
            message.field("Created by", &event.pusher.name);
            message.field("Name", &event.branch);
        }
        (EventKind::Delete, _) => {
            header(&mut message, event, template, DELETED, "branch/tag deleted");
            repository_field(&mut message, event);
            message.field("Deleted by", &event.pusher.name);
            message.field("Name", &event.branch);
        }
        (EventKind::PullRequest, _) if event.pull_request().is_some() => {
            render_pull_request(&mut message, event, template)
        }
        (EventKind::Issues, _) if event.issue().is_some() => {
            render_issue(&mut message, event, template)
        }
        _ => {
            let platform = event.platform.label();
            header(&mut message, event, template, OTHER, &format!("{} event", platform));
            repository_field(&mut message, event);
            message.field("Actor", &event.pusher.name);
            message.field("Event", format!("{} ({})", event.kind, event.action));
        }
    }

    let label = match (&event.kind, event.action.as_str()) {
        (EventKind::Push, "push") => "View full changes",
        _ => "View details",
    };
    message.main_link(label, &event.compare_url);

    RenderedMessage {
        title: format!(
            "{} {} notification",
            event.repository.name,
            event.platform.label()
        ),
        body: message.build(),
    }
}

fn header(
    message: &mut MessageBuilder,
    event: &Event,
    template: &MessageTemplate,
    glyph: &str,
    what: &str,
) {
    message.heading(format!(
        "{} {} {} {}",
        template.title_prefix, glyph, event.repository.name, what
    ));
}

fn repository_field(message: &mut MessageBuilder, event: &Event) {
    message.field(
        "Repository",
        Link {
            text: &event.repository.full_name,
            href: &event.repository.url,
        },
    );
}

fn render_push(message: &mut MessageBuilder, event: &Event, template: &MessageTemplate) {
    header(message, event, template, PUSH, "has a new push");
    repository_field(message, event);
    message.field("Pusher", &event.pusher.name);
    message.field("Branch", &event.branch);

    if !template.show_commit_details || event.commits.is_empty() {
        return;
    }

    write!(message, "**Commits** ({}):\n\n", event.commits.len()).unwrap();
    for commit in event.commits.iter().take(template.max_commits_display) {
        message.list_item(format!(
            "{} {} - {}",
            Link {
                text: short_id(&commit.id, SHORT_ID_LENGTH),
                href: &commit.url,
            },
            commit.message,
            commit.author
        ));
    }

    let remaining = event
        .commits
        .len()
        .saturating_sub(template.max_commits_display);
    if remaining > 0 {
        message.list_item(format!("... and {} more commits", remaining));
    }
}

fn pull_request_glyph(action: &str, pr: &PullRequestDetail) -> &'static str {
    match action {
        "closed" if pr.merged => PR_MERGED,
        "closed" => PR_CLOSED,
        "merged" => PR_MERGED,
        _ => PR_OPENED,
    }
}

fn render_pull_request(message: &mut MessageBuilder, event: &Event, template: &MessageTemplate) {
    let pr = match event.pull_request() {
        Some(pr) => pr,
        None => return,
    };

    let glyph = pull_request_glyph(&event.action, pr);
    header(
        message,
        event,
        template,
        glyph,
        &format!("Pull Request {}", event.action),
    );
    repository_field(message, event);
    message.field("Actor", &event.pusher.name);
    message.field(
        format!("PR #{}", pr.number),
        Link {
            text: &pr.title,
            href: &event.compare_url,
        },
    );
    message.field("State", &pr.state);
    message.field(
        "Branch",
        format!("{} → {}", pr.base_branch, pr.head_branch),
    );
    description_field(message, pr.body.as_deref());
}

fn issue_glyph(action: &str) -> &'static str {
    match action {
        "opened" => ISSUE_OPENED,
        "closed" => ISSUE_CLOSED,
        "reopened" => ISSUE_REOPENED,
        _ => ISSUE_OTHER,
    }
}

fn render_issue(message: &mut MessageBuilder, event: &Event, template: &MessageTemplate) {
    let issue: &IssueDetail = match event.issue() {
        Some(issue) => issue,
        None => return,
    };

    header(
        message,
        event,
        template,
        issue_glyph(&event.action),
        &format!("Issue {}", event.action),
    );
    repository_field(message, event);
    message.field("Actor", &event.pusher.name);
    message.field(
        format!("Issue #{}", issue.number),
        Link {
            text: &issue.title,
            href: &event.compare_url,
        },
    );
    message.field("State", &issue.state);

    if let Some(assignee) = &issue.assignee {
        message.field("Assignee", assignee);
    }
    if !issue.labels.is_empty() {
        message.field("Labels", issue.labels.join(", "));
    }
    description_field(message, issue.body.as_deref());
}

fn description_field(message: &mut MessageBuilder, body: Option<&str>) {
    if let Some(body) = body.filter(|body| !body.trim().is_empty()) {
        message.field("Description", shorten_content(body, PREVIEW_LENGTH));
    }
}
