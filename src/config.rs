use std::{collections::HashSet, net::IpAddr};

use serde::Deserialize;
use url::Url;

#[derive(Debug, Deserialize)]
pub struct PushbellConfig {
    /// Address the HTTP server listens on
    #[serde(default = "default_address")]
    pub address: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Log at debug level by default, and report full error chains in responses
    #[serde(default)]
    pub verbose: bool,
    pub dingtalk: DingTalkConfig,
    #[serde(default)]
    pub template: MessageTemplate,
    #[serde(default)]
    pub filter: FilterRules,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DingTalkConfig {
    /// Robot webhook URL, including its `access_token`
    pub webhook_url: Url,
    /// Signing secret, if the robot was created with the "sign" security setting
    pub secret: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessageTemplate {
    /// Glyph put in front of every message header
    pub title_prefix: String,
    pub show_commit_details: bool,
    pub max_commits_display: usize,
    pub mentions: Mentions,
}

impl Default for MessageTemplate {
    fn default() -> Self {
        Self {
            title_prefix: "📦".to_owned(),
            show_commit_details: true,
            max_commits_display: 5,
            mentions: Mentions::default(),
        }
    }
}

/// Who the chat bot should mention. Only the notifier looks at these.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Mentions {
    pub is_at_all: bool,
    pub at_mobiles: Vec<String>,
    pub at_user_ids: Vec<String>,
}

/// Accept/reject policy applied to normalized events. Empty allow lists allow everything.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterRules {
    pub allowed_event_types: HashSet<String>,
    /// Full names (`owner/repo`) of the repositories to relay
    pub repositories: HashSet<String>,
    pub branches: HashSet<String>,
    pub ignore_branches: HashSet<String>,
    /// Case sensitive substrings, checked in order
    pub ignore_commit_keywords: Vec<String>,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            allowed_event_types: default_event_types(),
            repositories: HashSet::new(),
            branches: HashSet::new(),
            ignore_branches: HashSet::new(),
            ignore_commit_keywords: DEFAULT_IGNORED_KEYWORDS
                .iter()
                .map(|kw| kw.to_string())
                .collect(),
        }
    }
}

const DEFAULT_IGNORED_KEYWORDS: [&str; 4] = ["[skip ci]", "[ci skip]", "WIP:", "wip:"];

pub const SUPPORTED_EVENTS: [&str; 5] = ["push", "create", "delete", "pull_request", "issues"];

fn default_event_types() -> HashSet<String> {
    SUPPORTED_EVENTS.iter().map(|ev| ev.to_string()).collect()
}

fn default_address() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    3000
}

fn default_timeout_secs() -> u64 {
    10
}
