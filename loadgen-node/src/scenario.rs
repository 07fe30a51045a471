//! Declarative registration/login scenario: per-user session state, header
//! bundles, and the ordered step list interpreted by the runner.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::{LoadgenError, Result};
use crate::feeder::UserRecord;

/// Per-virtual-user session state. Owned exclusively by that user's task.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub username: String,
    pub password: String,
    /// Saved from the register response `message` field, when present
    pub register_message: Option<String>,
    /// Saved from the login response `token` field, when present
    pub auth_token: Option<String>,
}

impl Session {
    pub fn for_user(record: &UserRecord) -> Self {
        Self {
            username: record.username.clone(),
            password: record.password.clone(),
            register_message: None,
            auth_token: None,
        }
    }
}

/// Session slots an HTTP step may save an extracted value into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSlot {
    RegisterMessage,
    AuthToken,
}

impl Session {
    pub fn set(&mut self, slot: SessionSlot, value: String) {
        match slot {
            SessionSlot::RegisterMessage => self.register_message = Some(value),
            SessionSlot::AuthToken => self.auth_token = Some(value),
        }
    }
}

/// Status check attached to an HTTP step
#[derive(Debug, Clone)]
pub enum StatusCheck {
    /// Implicit check for steps without an explicit one: any 2xx or a
    /// 304 passes, everything else fails the step
    EngineDefault,
    /// Status must equal the given code exactly
    Is(u16),
    /// Status must be one of the given codes
    OneOf(&'static [u16]),
}

impl StatusCheck {
    pub fn matches(&self, status: u16) -> bool {
        match self {
            StatusCheck::EngineDefault => (200..=299).contains(&status) || status == 304,
            StatusCheck::Is(code) => status == *code,
            StatusCheck::OneOf(codes) => codes.contains(&status),
        }
    }
}

/// Optional JSON extraction attached to an HTTP step
#[derive(Debug, Clone)]
pub struct Extract {
    /// Field name searched at any depth of the response body
    pub field: &'static str,
    /// Session slot the first match is saved into
    pub save_as: SessionSlot,
}

/// Which of the two static header bundles a step sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderBundle {
    /// CORS preflight headers
    Preflight,
    /// JSON content headers
    Json,
}

/// A single HTTP request step
#[derive(Debug, Clone)]
pub struct HttpStep {
    pub name: &'static str,
    pub method: Method,
    pub path: &'static str,
    pub headers: HeaderBundle,
    /// Send the JSON credentials body built from session data
    pub send_credentials: bool,
    pub check: StatusCheck,
    pub extract: Option<Extract>,
}

/// Observational logging steps. Pure observation, no session mutation.
#[derive(Debug, Clone, Copy)]
pub enum LogStep {
    RegisterOutcome,
    LoginOutcome,
}

/// One step of the per-user flow, interpreted sequentially by the runner
#[derive(Debug, Clone)]
pub enum Step {
    Http(HttpStep),
    Log(LogStep),
    Pause(Duration),
}

/// Build the fixed registration/login flow:
/// preflight + register, log, pause, preflight + login, log.
pub fn registration_flow(inter_phase_pause: Duration) -> Vec<Step> {
    vec![
        Step::Http(HttpStep {
            name: "Preflight Request - Register",
            method: Method::OPTIONS,
            path: "/adduser",
            headers: HeaderBundle::Preflight,
            send_credentials: false,
            check: StatusCheck::EngineDefault,
            extract: None,
        }),
        Step::Http(HttpStep {
            name: "Register User",
            method: Method::POST,
            path: "/adduser",
            headers: HeaderBundle::Json,
            send_credentials: true,
            check: StatusCheck::OneOf(&[200, 201]),
            extract: Some(Extract {
                field: "message",
                save_as: SessionSlot::RegisterMessage,
            }),
        }),
        Step::Log(LogStep::RegisterOutcome),
        Step::Pause(inter_phase_pause),
        Step::Http(HttpStep {
            name: "Preflight Request - Login",
            method: Method::OPTIONS,
            path: "/login",
            headers: HeaderBundle::Preflight,
            send_credentials: false,
            check: StatusCheck::EngineDefault,
            extract: None,
        }),
        Step::Http(HttpStep {
            name: "Login User",
            method: Method::POST,
            path: "/login",
            headers: HeaderBundle::Json,
            send_credentials: true,
            check: StatusCheck::Is(200),
            extract: Some(Extract {
                field: "token",
                save_as: SessionSlot::AuthToken,
            }),
        }),
        Step::Log(LogStep::LoginOutcome),
    ]
}

/// CORS preflight header bundle, shared read-only by all users
pub fn preflight_headers(origin: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("access-control-request-headers"),
        HeaderValue::from_static("content-type"),
    );
    headers.insert(
        HeaderName::from_static("access-control-request-method"),
        HeaderValue::from_static("POST"),
    );
    headers.insert(reqwest::header::ORIGIN, origin_value(origin)?);
    headers.insert(
        HeaderName::from_static("priority"),
        HeaderValue::from_static("u=4"),
    );
    Ok(headers)
}

/// JSON content header bundle, shared read-only by all users
pub fn json_headers(origin: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(
        reqwest::header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(reqwest::header::ORIGIN, origin_value(origin)?);
    headers.insert(
        HeaderName::from_static("priority"),
        HeaderValue::from_static("u=0"),
    );
    Ok(headers)
}

fn origin_value(origin: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(origin)
        .map_err(|e| LoadgenError::Config(format!("Invalid origin header value: {}", e)))
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

/// Build the JSON credentials body from session data.
/// Field order matches the wire format the gateway was tested against.
pub fn credentials_body(session: &Session) -> String {
    serde_json::to_string(&Credentials {
        username: &session.username,
        password: &session.password,
    })
    .unwrap_or_default()
}

/// Depth-first recursive search for `field` anywhere in the response body.
/// First match wins. Null values are treated as absent.
pub fn extract_field(value: &Value, field: &str) -> Option<String> {
    match value {
        Value::Object(map) => {
            if let Some(found) = map.get(field) {
                match found {
                    Value::Null => {}
                    Value::String(s) => return Some(s.clone()),
                    other => return Some(other.to_string()),
                }
            }
            map.values().find_map(|v| extract_field(v, field))
        }
        Value::Array(items) => items.iter().find_map(|v| extract_field(v, field)),
        _ => None,
    }
}

/// Apply a response to the session: evaluate the status check and run the
/// optional extraction. Returns whether the step's check passed. Extraction
/// absence is tolerated silently.
pub fn apply_response(
    step: &HttpStep,
    status: u16,
    body: Option<&Value>,
    session: &mut Session,
) -> bool {
    if let (Some(extract), Some(body)) = (&step.extract, body) {
        if let Some(value) = extract_field(body, extract.field) {
            session.set(extract.save_as, value);
        }
    }
    step.check.matches(status)
}

/// Registration outcome line; None when no message was extracted,
/// in which case the logging step stays silent for that user.
pub fn register_outcome_line(session: &Session) -> Option<String> {
    session
        .register_message
        .as_ref()
        .map(|msg| format!("Registration response: {}", msg))
}

/// Login outcome line: success when a token was extracted, failure otherwise.
pub fn login_outcome_line(session: &Session) -> String {
    match session.auth_token {
        Some(_) => format!("User {} logged in successfully", session.username),
        None => format!("Login failed for user {}", session.username),
    }
}
