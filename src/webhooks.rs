use std::convert::Infallible;

use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    serde::json::Json,
    Build, Request, Rocket, State,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    bot::{
        diagnostic::{diagnose, explain_errcode, CommonProblem, Diagnosis, COMMON_PROBLEMS},
        DeliveryReceipt,
    },
    config::{DingTalkConfig, SUPPORTED_EVENTS},
    event::Event,
    relay::{EventSummary, FormatCheck, Relay, RelayOutcome},
};

pub mod github;
use github::{normalize_github, X_GITHUB_EVENT};

pub mod gogs;
use gogs::normalize_gogs;

pub(crate) mod payload;
mod samples;

const X_GITHUB_DELIVERY: &str = "X-GitHub-Delivery";

/// How the sender of a webhook identified itself.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    /// No event type given, the payload shape has to be guessed
    Gogs,
    /// Event type given out of band, in the `X-GitHub-Event` header
    GitHub(&'a str),
}

/// Turns a raw webhook payload into an [`Event`], or `None` if it isn't understood.
pub fn normalize(payload: &Value, source: Source<'_>) -> Option<Event> {
    match source {
        Source::Gogs => normalize_gogs(payload),
        Source::GitHub(event_type) => normalize_github(payload, event_type),
    }
}

pub fn mount(rocket: Rocket<Build>, relay: Relay, dingtalk: DingTalkConfig) -> Rocket<Build> {
    rocket
        .mount(
            "/webhook",
            rocket::routes![
                gogs_webhook,
                github_webhook,
                test_gogs_webhook,
                test_github_webhook,
                test_dingtalk,
                test_dingtalk_formats,
                dingtalk_diagnostic,
                health
            ],
        )
        .register("/", rocket::catchers![bad_request, internal_error])
        .manage(relay)
        .manage(dingtalk)
}

#[derive(Debug, Default, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<EventSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dingtalk_response: Option<DeliveryReceipt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<DebugInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Hint about what a robot error code means
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DebugInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    pub received_keys: Vec<String>,
    pub payload_preview: String,
}

type Response = (Status, Json<WebhookResponse>);

fn respond(outcome: RelayOutcome, source: Source<'_>, verbose: bool) -> Response {
    let (platform, event_type) = match source {
        Source::Gogs => ("Gogs".to_owned(), None),
        Source::GitHub(event_type) => (
            format!("GitHub {}", event_type),
            Some(event_type.to_owned()),
        ),
    };

    let response = match outcome {
        RelayOutcome::Unrecognized {
            received_keys,
            payload_preview,
        } => WebhookResponse {
            success: false,
            message: format!("couldn't parse {} webhook payload", platform),
            debug_info: Some(DebugInfo {
                event_type,
                received_keys,
                payload_preview,
            }),
            ..Default::default()
        },
        RelayOutcome::Filtered { reason } => WebhookResponse {
            success: true,
            message: format!("{} webhook filtered: {}", platform, reason),
            filtered: Some(true),
            ..Default::default()
        },
        RelayOutcome::Delivered { summary, receipt } => WebhookResponse {
            success: true,
            message: format!("{} webhook forwarded to DingTalk", platform),
            data: Some(summary),
            dingtalk_response: Some(receipt),
            ..Default::default()
        },
        RelayOutcome::Failed { summary, error } => {
            return (
                Status::BadGateway,
                Json(WebhookResponse {
                    success: false,
                    message: format!("couldn't forward {} webhook", platform),
                    data: Some(summary),
                    dingtalk_response: error.receipt(),
                    error: Some(error.report(verbose)),
                    ..Default::default()
                }),
            );
        }
    };

    (Status::Ok, Json(response))
}

#[rocket::post("/gogs", data = "<payload>")]
pub(crate) async fn gogs_webhook(payload: Json<Value>, relay: &State<Relay>) -> Response {
    info!("received Gogs webhook");

    let outcome = relay.process(&payload, Source::Gogs).await;
    respond(outcome, Source::Gogs, relay.verbose)
}

/// Value of the `X-GitHub-Event` header, if any.
pub struct GitHubEventType(Option<String>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for GitHubEventType {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        if let Some(delivery) = request.headers().get_one(X_GITHUB_DELIVERY) {
            debug!("GitHub delivery {}", delivery);
        }

        let event_type = request
            .headers()
            .get_one(X_GITHUB_EVENT)
            .map(str::to_owned);
        Outcome::Success(GitHubEventType(event_type))
    }
}

#[rocket::post("/github", data = "<payload>")]
pub(crate) async fn github_webhook(
    event_type: GitHubEventType,
    payload: Json<Value>,
    relay: &State<Relay>,
) -> Response {
    let event_type = match event_type.0 {
        Some(event_type) => event_type,
        None => {
            info!("GitHub webhook without {} header", X_GITHUB_EVENT);
            return (
                Status::BadRequest,
                Json(WebhookResponse {
                    message: format!("missing {} header", X_GITHUB_EVENT),
                    ..Default::default()
                }),
            );
        }
    };
    info!("received GitHub {} webhook", event_type);

    let source = Source::GitHub(&event_type);
    let outcome = relay.process(&payload, source).await;
    respond(outcome, source, relay.verbose)
}

/// Runs a canned Gogs push through the whole pipeline, including delivery.
#[rocket::post("/test-gogs-webhook")]
pub(crate) async fn test_gogs_webhook(relay: &State<Relay>) -> Response {
    info!("relaying sample Gogs push");

    let outcome = relay.process(&samples::gogs_push(), Source::Gogs).await;
    respond(outcome, Source::Gogs, relay.verbose)
}

/// Runs a canned GitHub push through the whole pipeline, including delivery.
#[rocket::post("/test-github-webhook")]
pub(crate) async fn test_github_webhook(relay: &State<Relay>) -> Response {
    info!("relaying sample GitHub push");

    let source = Source::GitHub("push");
    let outcome = relay.process(&samples::github_push(), source).await;
    respond(outcome, source, relay.verbose)
}

fn local_time() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[rocket::post("/test-dingtalk")]
pub(crate) async fn test_dingtalk(relay: &State<Relay>) -> Response {
    let text = format!(
        "🤖 Test message: {} is connected!\n\nTime: {}",
        env!("CARGO_PKG_NAME"),
        local_time()
    );

    let response = match relay.send_test_message(&text).await {
        Ok(receipt) => WebhookResponse {
            success: true,
            message: "test message sent".to_owned(),
            dingtalk_response: Some(receipt),
            detail: Some(
                "if nothing shows up, check that the robot was added to the group".to_owned(),
            ),
            ..Default::default()
        },
        Err(error) => WebhookResponse {
            success: false,
            message: "couldn't send test message".to_owned(),
            detail: error
                .receipt()
                .and_then(|receipt| explain_errcode(receipt.errcode))
                .map(str::to_owned),
            dingtalk_response: error.receipt(),
            error: Some(error.report(relay.verbose)),
            ..Default::default()
        },
    };

    let status = if response.success {
        Status::Ok
    } else {
        Status::BadGateway
    };
    (status, Json(response))
}

#[derive(Debug, Serialize)]
pub struct FormatReport {
    success: bool,
    message: String,
    results: Vec<FormatCheck>,
    timestamp: String,
}

/// Sends one message of each kind the relay knows, to tell formatting problems from
/// connectivity problems.
#[rocket::post("/test-dingtalk-formats")]
pub(crate) async fn test_dingtalk_formats(relay: &State<Relay>) -> Json<FormatReport> {
    let results = relay.check_formats(&local_time()).await;
    let delivered = results.iter().filter(|check| check.success).count();
    info!("format test: {}/{} delivered", delivered, results.len());

    Json(FormatReport {
        success: delivered > 0,
        message: format!("{} of {} message kinds delivered", delivered, results.len()),
        results,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct DiagnosticReport {
    success: bool,
    message: &'static str,
    diagnostic: Diagnosis,
    common_problems: &'static [CommonProblem],
    recommendations: [&'static str; 2],
    timestamp: String,
}

#[rocket::get("/dingtalk-diagnostic")]
pub(crate) fn dingtalk_diagnostic(dingtalk: &State<DingTalkConfig>) -> Json<DiagnosticReport> {
    let diagnostic = diagnose(dingtalk);
    if diagnostic.has_issues {
        info!("DingTalk settings look wrong: {:?}", diagnostic.issues);
    }

    Json(DiagnosticReport {
        success: !diagnostic.has_issues,
        message: if diagnostic.has_issues {
            "found configuration issues"
        } else {
            "configuration looks fine"
        },
        diagnostic,
        common_problems: &COMMON_PROBLEMS,
        recommendations: [
            "POST /webhook/test-dingtalk-formats sends one message of each kind",
            "if nothing helps, create the robot again",
        ],
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct Health {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: String,
    supported_events: [&'static str; 5],
    supported_platforms: [&'static str; 2],
    filter_enabled: FilterStatus,
}

#[derive(Debug, Serialize)]
pub struct FilterStatus {
    event_types: bool,
    repositories: bool,
    branches: bool,
    ignore_branches: bool,
    ignore_keywords: bool,
}

#[rocket::get("/health")]
pub(crate) fn health(relay: &State<Relay>) -> Json<Health> {
    let rules = &relay.rules;

    Json(Health {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        supported_events: SUPPORTED_EVENTS,
        supported_platforms: ["Gogs", "GitHub"],
        filter_enabled: FilterStatus {
            event_types: !rules.allowed_event_types.is_empty(),
            repositories: !rules.repositories.is_empty(),
            branches: !rules.branches.is_empty(),
            ignore_branches: !rules.ignore_branches.is_empty(),
            ignore_keywords: !rules.ignore_commit_keywords.is_empty(),
        },
    })
}

fn failure(message: &str) -> Json<WebhookResponse> {
    Json(WebhookResponse {
        message: message.to_owned(),
        ..Default::default()
    })
}

/// Also covers bodies that aren't valid JSON.
#[rocket::catch(400)]
fn bad_request() -> Json<WebhookResponse> {
    failure("malformed request")
}

#[rocket::catch(500)]
fn internal_error() -> Json<WebhookResponse> {
    failure("internal error while handling webhook")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rocket::{
        http::{ContentType, Header},
        local::blocking::Client,
    };
    use serde_json::json;
    use url::Url;

    use super::*;
    use crate::{
        bot::testing::RecordingNotifier,
        config::{FilterRules, MessageTemplate},
    };

    const ROBOT_URL: &str = "https://oapi.dingtalk.com/robot/send?access_token=abc";

    fn relay_rocket(notifier: Arc<RecordingNotifier>, rules: FilterRules) -> Rocket<Build> {
        let relay = Relay {
            rules,
            template: MessageTemplate::default(),
            notifier,
            verbose: false,
        };
        let dingtalk = DingTalkConfig {
            webhook_url: Url::parse(ROBOT_URL).unwrap(),
            secret: None,
            timeout_secs: 10,
        };
        mount(rocket::build(), relay, dingtalk)
    }

    fn client(notifier: Arc<RecordingNotifier>, rules: FilterRules) -> Client {
        Client::tracked(relay_rocket(notifier, rules)).expect("valid rocket instance")
    }

    fn gogs_push() -> Value {
        json!({
            "ref": "refs/heads/main",
            "compare_url": "https://git.example.com/team/demo/compare/a...b",
            "commits": [{ "id": "0123456789", "message": "fix bug", "timestamp": "t" }],
            "repository": { "name": "demo", "full_name": "team/demo" },
            "pusher": { "username": "alice" }
        })
    }

    #[test]
    fn gogs_push_is_forwarded() {
        let notifier = Arc::new(RecordingNotifier::answering(0));
        let client = client(notifier.clone(), FilterRules::default());

        let response = client.post("/webhook/gogs").json(&gogs_push()).dispatch();
        assert_eq!(response.status(), Status::Ok);

        let body: Value = response.into_json().unwrap();
        assert_eq!(body["success"], json!(true));
        assert_eq!(
            body["data"],
            json!({ "event_type": "push", "repository": "demo", "branch": "main", "commits": 1 })
        );
        assert_eq!(body["dingtalk_response"]["errcode"], json!(0));
        assert_eq!(notifier.markdown.lock().unwrap().len(), 1);
    }

    #[test]
    fn filtered_webhook_is_a_success() {
        let notifier = Arc::new(RecordingNotifier::answering(0));
        let rules = FilterRules {
            repositories: ["team/other".to_owned()].into_iter().collect(),
            ..Default::default()
        };
        let client = client(notifier.clone(), rules);

        let response = client.post("/webhook/gogs").json(&gogs_push()).dispatch();
        assert_eq!(response.status(), Status::Ok);

        let body: Value = response.into_json().unwrap();
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["filtered"], json!(true));
        assert!(notifier.markdown.lock().unwrap().is_empty());
    }

    #[test]
    fn unsupported_github_event() {
        let client = client(
            Arc::new(RecordingNotifier::answering(0)),
            FilterRules::default(),
        );

        let response = client
            .post("/webhook/github")
            .header(Header::new(X_GITHUB_EVENT, "fork"))
            .json(&json!({ "repository": { "name": "demo" }, "forkee": {} }))
            .dispatch();
        assert_eq!(response.status(), Status::Ok);

        let body: Value = response.into_json().unwrap();
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["debug_info"]["event_type"], json!("fork"));
        assert!(body["debug_info"]["received_keys"]
            .as_array()
            .unwrap()
            .contains(&json!("forkee")));
    }

    #[test]
    fn github_without_event_header() {
        let client = client(
            Arc::new(RecordingNotifier::answering(0)),
            FilterRules::default(),
        );

        let response = client
            .post("/webhook/github")
            .json(&json!({ "repository": { "name": "demo" } }))
            .dispatch();
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[test]
    fn delivery_failure_is_reported() {
        let client = client(
            Arc::new(RecordingNotifier::answering(300001)),
            FilterRules::default(),
        );

        let response = client.post("/webhook/gogs").json(&gogs_push()).dispatch();
        assert_eq!(response.status(), Status::BadGateway);

        let body: Value = response.into_json().unwrap();
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["dingtalk_response"]["errcode"], json!(300001));
        assert_eq!(
            body["error"],
            json!("chat bot returned error (300001): rejected")
        );
    }

    #[test]
    fn malformed_body() {
        let client = client(
            Arc::new(RecordingNotifier::answering(0)),
            FilterRules::default(),
        );

        let response = client
            .post("/webhook/gogs")
            .header(ContentType::JSON)
            .body("{ not json")
            .dispatch();
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[test]
    fn test_message_and_health() {
        let notifier = Arc::new(RecordingNotifier::answering(0));
        let client = client(notifier.clone(), FilterRules::default());

        let response = client.post("/webhook/test-dingtalk").dispatch();
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(notifier.text.lock().unwrap().len(), 1);

        let response = client.get("/webhook/health").dispatch();
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().unwrap();
        assert_eq!(body["status"], json!("ok"));
        assert_eq!(body["filter_enabled"]["branches"], json!(false));
    }

    #[test]
    fn sample_webhooks_go_through_the_pipeline() {
        let notifier = Arc::new(RecordingNotifier::answering(0));
        let client = client(notifier.clone(), FilterRules::default());

        let response = client.post("/webhook/test-gogs-webhook").dispatch();
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().unwrap();
        assert_eq!(body["success"], json!(true));
        assert_eq!(
            body["data"],
            json!({ "event_type": "push", "repository": "test-repo", "branch": "master", "commits": 1 })
        );

        let response = client.post("/webhook/test-github-webhook").dispatch();
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().unwrap();
        assert_eq!(body["message"], json!("GitHub push webhook forwarded to DingTalk"));
        assert_eq!(body["data"]["branch"], json!("main"));

        let sent = notifier.markdown.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].title, "test-repo Gogs notification");
        assert_eq!(sent[1].title, "test-repo GitHub notification");
    }

    #[test]
    fn test_message_failure_is_explained() {
        let client = client(
            Arc::new(RecordingNotifier::answering(310000)),
            FilterRules::default(),
        );

        let response = client.post("/webhook/test-dingtalk").dispatch();
        assert_eq!(response.status(), Status::BadGateway);

        let body: Value = response.into_json().unwrap();
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["dingtalk_response"]["errcode"], json!(310000));
        assert_eq!(
            body["detail"],
            json!("signature check failed, check the `secret` setting")
        );
    }

    #[test]
    fn format_test_route() {
        let notifier = Arc::new(RecordingNotifier::answering(0));
        let client = client(notifier.clone(), FilterRules::default());

        let response = client.post("/webhook/test-dingtalk-formats").dispatch();
        assert_eq!(response.status(), Status::Ok);

        let body: Value = response.into_json().unwrap();
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["message"], json!("3 of 3 message kinds delivered"));
        assert_eq!(body["results"][2]["format"], json!("link"));
        assert_eq!(notifier.links.lock().unwrap().len(), 1);
    }

    #[test]
    fn diagnostic_route() {
        let client = client(
            Arc::new(RecordingNotifier::answering(0)),
            FilterRules::default(),
        );

        let response = client.get("/webhook/dingtalk-diagnostic").dispatch();
        assert_eq!(response.status(), Status::Ok);

        let body: Value = response.into_json().unwrap();
        assert_eq!(body["success"], json!(false));
        assert_eq!(
            body["diagnostic"]["issues"],
            json!(["access_token has 3 characters, expected 64"])
        );
        assert_eq!(body["common_problems"].as_array().unwrap().len(), 3);
    }

    #[rocket::get("/explode")]
    fn explode() -> &'static str {
        panic!("handler bug")
    }

    #[test]
    fn internal_errors_use_the_json_catcher() {
        let rocket = relay_rocket(
            Arc::new(RecordingNotifier::answering(0)),
            FilterRules::default(),
        )
        .mount("/", rocket::routes![explode]);
        let client = Client::tracked(rocket).expect("valid rocket instance");

        let response = client.get("/explode").dispatch();
        assert_eq!(response.status(), Status::InternalServerError);

        let body: Value = response.into_json().unwrap();
        assert_eq!(body["success"], json!(false));
        assert_eq!(
            body["message"],
            json!("internal error while handling webhook")
        );
    }
}
