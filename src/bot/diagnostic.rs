//! Sanity checks on the DingTalk robot settings, and what the robot's error codes mean.

use serde::Serialize;

use crate::{bot::utils::shorten_content, config::DingTalkConfig};

const ROBOT_URL_PREFIX: &str = "https://oapi.dingtalk.com/robot/send?access_token=";
const ACCESS_TOKEN_LENGTH: usize = 64;
const SECRET_LENGTH: usize = 43;
const URL_PREVIEW_LENGTH: usize = 50;

#[derive(Debug, Default, Serialize)]
pub struct Diagnosis {
    pub has_issues: bool,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
    pub config: ConfigSummary,
}

#[derive(Debug, Default, Serialize)]
pub struct ConfigSummary {
    pub has_secret: bool,
    pub url_preview: String,
}

impl Diagnosis {
    fn found(&mut self, issue: impl Into<String>, suggestion: impl Into<String>) {
        self.issues.push(issue.into());
        self.suggestions.push(suggestion.into());
        self.has_issues = true;
    }
}

/// Checks the robot URL and secret for the usual copy and paste mistakes.
pub fn diagnose(config: &DingTalkConfig) -> Diagnosis {
    let mut diagnosis = Diagnosis::default();
    let url = config.webhook_url.as_str();

    if !url.starts_with(ROBOT_URL_PREFIX) {
        diagnosis.found(
            "robot URL has an unexpected format",
            format!("the URL should start with {}", ROBOT_URL_PREFIX),
        );
    }

    let token = config
        .webhook_url
        .query_pairs()
        .find(|(key, _)| key == "access_token")
        .map(|(_, token)| token.chars().count());
    match token {
        Some(ACCESS_TOKEN_LENGTH) => {}
        Some(len) => diagnosis.found(
            format!(
                "access_token has {} characters, expected {}",
                len, ACCESS_TOKEN_LENGTH
            ),
            "check that the access_token was copied completely",
        ),
        None => diagnosis.found(
            "robot URL has no access_token",
            "make sure the URL carries the access_token query parameter",
        ),
    }

    let secret = config
        .secret
        .as_deref()
        .filter(|secret| !secret.trim().is_empty());
    if let Some(secret) = secret {
        let len = secret.chars().count();
        if len != SECRET_LENGTH {
            diagnosis.found(
                format!(
                    "signing secret has {} characters, expected {}",
                    len, SECRET_LENGTH
                ),
                "check that the signing secret was copied completely",
            );
        }
    }

    diagnosis.config = ConfigSummary {
        has_secret: secret.is_some(),
        url_preview: shorten_content(url, URL_PREVIEW_LENGTH),
    };
    diagnosis
}

/// Known robot error codes.
pub fn explain_errcode(errcode: i64) -> Option<&'static str> {
    match errcode {
        310000 => Some("signature check failed, check the `secret` setting"),
        300001 => Some("invalid access_token"),
        300002 => Some("the robot is disabled"),
        300003 => Some("malformed message"),
        300004 => Some("empty message"),
        300005 => Some("message exceeds the length limit"),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
pub struct CommonProblem {
    pub problem: &'static str,
    pub possible_causes: &'static [&'static str],
    pub solutions: &'static [&'static str],
}

pub static COMMON_PROBLEMS: [CommonProblem; 3] = [
    CommonProblem {
        problem: "messages are accepted but never show up in the group",
        possible_causes: &[
            "the robot was never added to the group",
            "the robot was removed by a group admin",
            "the group was dissolved or the robot disabled",
            "the robot's permissions are restricted",
        ],
        solutions: &[
            "add the robot to the group again",
            "check that the robot is listed among the group members",
            "mention the robot in the group and see whether it answers",
            "create a new robot and update the access_token",
        ],
    },
    CommonProblem {
        problem: "signature check failed (errcode 310000)",
        possible_causes: &[
            "wrong signing secret",
            "the robot does not use the \"sign\" security setting",
            "clock skew between this host and DingTalk",
        ],
        solutions: &[
            "check `dingtalk.secret`",
            "copy the secret from the robot settings again",
            "remove `dingtalk.secret` if the robot isn't signed",
        ],
    },
    CommonProblem {
        problem: "invalid access_token (errcode 300001)",
        possible_causes: &[
            "wrong or expired access_token",
            "the robot was deleted",
            "malformed robot URL",
        ],
        solutions: &[
            "check the access_token",
            "create a new robot and use its access_token",
            "check the format of `dingtalk.webhook_url`",
        ],
    },
];

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;

    fn config(url: &str, secret: Option<&str>) -> DingTalkConfig {
        DingTalkConfig {
            webhook_url: Url::parse(url).unwrap(),
            secret: secret.map(str::to_owned),
            timeout_secs: 10,
        }
    }

    #[test]
    fn valid_settings() {
        let token = "a".repeat(64);
        let secret = format!("SEC{}", "b".repeat(40));
        let diagnosis = diagnose(&config(
            &format!("{}{}", ROBOT_URL_PREFIX, token),
            Some(&secret),
        ));

        assert!(!diagnosis.has_issues, "{:?}", diagnosis.issues);
        assert!(diagnosis.config.has_secret);
        assert_eq!(
            diagnosis.config.url_preview,
            format!("{}...", &ROBOT_URL_PREFIX[..50])
        );
    }

    #[test]
    fn short_token_and_secret() {
        let diagnosis = diagnose(&config(
            "https://oapi.dingtalk.com/robot/send?access_token=abc",
            Some("SECshort"),
        ));

        assert!(diagnosis.has_issues);
        assert_eq!(
            diagnosis.issues,
            vec![
                "access_token has 3 characters, expected 64",
                "signing secret has 8 characters, expected 43",
            ]
        );
        assert_eq!(diagnosis.suggestions.len(), 2);
    }

    #[test]
    fn foreign_url_without_token() {
        let diagnosis = diagnose(&config("https://chat.example.com/hook", Some("  ")));

        assert_eq!(diagnosis.issues.len(), 2);
        assert_eq!(diagnosis.issues[0], "robot URL has an unexpected format");
        assert_eq!(diagnosis.issues[1], "robot URL has no access_token");
        assert!(!diagnosis.config.has_secret);
    }

    #[test]
    fn errcodes() {
        assert_eq!(
            explain_errcode(310000),
            Some("signature check failed, check the `secret` setting")
        );
        assert_eq!(explain_errcode(300005), Some("message exceeds the length limit"));
        assert_eq!(explain_errcode(0), None);
        assert_eq!(explain_errcode(42), None);
    }
}
