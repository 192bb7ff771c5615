use crate::{
    config::FilterRules,
    event::{Event, EventKind},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub accept: bool,
    pub reason: String,
}

impl Decision {
    fn accept() -> Self {
        Self {
            accept: true,
            reason: "passed all filters".to_owned(),
        }
    }

    fn reject(reason: String) -> Self {
        Self {
            accept: false,
            reason,
        }
    }
}

/// Decides whether `event` should be relayed. Rules are checked in a fixed order and the first
/// failing one is reported.
///
/// Branch and commit rules only apply to push events.
pub fn decide(event: &Event, rules: &FilterRules) -> Decision {
    let event_type = event.kind.as_str();
    if !rules.allowed_event_types.is_empty() && !rules.allowed_event_types.contains(event_type) {
        return Decision::reject(format!("event type {} is not in the allowed list", event_type));
    }

    let full_name = &event.repository.full_name;
    if !rules.repositories.is_empty() && !rules.repositories.contains(full_name) {
        return Decision::reject(format!("repository {} is not in the allowed list", full_name));
    }

    if event.kind != EventKind::Push {
        return Decision::accept();
    }

    let branch = &event.branch;
    if !rules.branches.is_empty() && !rules.branches.contains(branch) {
        return Decision::reject(format!("branch {} is not in the allowed list", branch));
    }

    if rules.ignore_branches.contains(branch) {
        return Decision::reject(format!("branch {} is in the ignored list", branch));
    }

    for commit in &event.commits {
        if let Some(keyword) = rules
            .ignore_commit_keywords
            .iter()
            .find(|keyword| commit.message.contains(keyword.as_str()))
        {
            return Decision::reject(format!(
                "commit message contains ignored keyword: {}",
                keyword
            ));
        }
    }

    Decision::accept()
}
