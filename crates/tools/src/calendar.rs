//! Google Calendar context provider.
//!
//! Lists events from every calendar in the user's calendar list over a time
//! window chosen from the question ("today", "tomorrow", "week", "year").
//! Authenticates with an OAuth token stored by a prior consent flow and
//! refreshes it when expired; the interactive consent flow itself is out of
//! scope.

use std::path::PathBuf;

use aide_config::CalendarConfig;
use aide_core::context::{ContextProvider, ContextResult};
use aide_core::error::ProviderError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::http::send_json;

const SOURCE: &str = "Calendar";

/// Refresh this long before the recorded expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

pub struct CalendarProvider {
    api_url: String,
    token_url: String,
    token_path: PathBuf,
    max_results: u32,
    client: reqwest::Client,
}

impl CalendarProvider {
    pub fn new(
        api_url: impl Into<String>,
        token_url: impl Into<String>,
        token_path: impl Into<PathBuf>,
        max_results: u32,
    ) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token_url: token_url.into(),
            token_path: token_path.into(),
            max_results,
            client: reqwest::Client::new(),
        }
    }

    /// Build from the `[calendar]` section. Fails when disabled or when no
    /// stored token exists yet.
    pub fn from_config(config: &CalendarConfig) -> Result<Self, ProviderError> {
        if !config.enabled {
            return Err(ProviderError::NotConfigured {
                source_name: SOURCE.into(),
                reason: "disabled in [calendar]".into(),
            });
        }

        let token_path = config.token_file();
        if !token_path.exists() {
            return Err(ProviderError::NotConfigured {
                source_name: SOURCE.into(),
                reason: format!(
                    "no stored Google token at {}; complete the consent flow first",
                    token_path.display()
                ),
            });
        }

        Ok(Self::new(
            &config.api_url,
            &config.token_url,
            token_path,
            config.max_results,
        ))
    }

    /// A valid access token, refreshing and persisting it if needed.
    async fn access_token(&self, now: DateTime<Utc>) -> Result<String, ProviderError> {
        let raw = tokio::fs::read_to_string(&self.token_path)
            .await
            .map_err(|e| ProviderError::Io {
                source_name: SOURCE.into(),
                reason: format!("{}: {e}", self.token_path.display()),
            })?;
        let mut token: StoredToken =
            serde_json::from_str(&raw).map_err(|e| ProviderError::InvalidResponse {
                source_name: SOURCE.into(),
                reason: format!("stored token is malformed: {e}"),
            })?;

        if !token.is_expired(now) {
            return Ok(token.token);
        }

        self.refresh(&mut token, now).await?;

        match serde_json::to_string_pretty(&token) {
            Ok(json) => {
                if let Err(e) = tokio::fs::write(&self.token_path, json).await {
                    warn!(path = %self.token_path.display(), error = %e, "Could not persist refreshed token");
                }
            }
            Err(e) => warn!(error = %e, "Could not serialize refreshed token"),
        }

        Ok(token.token)
    }

    async fn refresh(&self, token: &mut StoredToken, now: DateTime<Utc>) -> Result<(), ProviderError> {
        let (Some(refresh_token), Some(client_id), Some(client_secret)) = (
            token.refresh_token.as_deref(),
            token.client_id.as_deref(),
            token.client_secret.as_deref(),
        ) else {
            return Err(ProviderError::NotConfigured {
                source_name: SOURCE.into(),
                reason: "stored token expired and cannot be refreshed; repeat the consent flow"
                    .into(),
            });
        };

        debug!("Refreshing Google access token");

        let body = send_json(
            SOURCE,
            self.client.post(&self.token_url).form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ]),
        )
        .await?;

        let access = body
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::InvalidResponse {
                source_name: SOURCE.into(),
                reason: "token endpoint returned no access_token".into(),
            })?;
        let expires_in = body.get("expires_in").and_then(Value::as_i64).unwrap_or(3600);

        token.token = access.to_string();
        token.expiry = Some(now + Duration::seconds(expires_in));
        info!("Google access token refreshed");
        Ok(())
    }

    async fn calendar_ids(&self, access_token: &str) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/users/me/calendarList", self.api_url);
        let body = send_json(SOURCE, self.client.get(url).bearer_auth(access_token)).await?;

        Ok(body
            .get("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|c| c.get("id").and_then(Value::as_str).map(String::from))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn events(
        &self,
        access_token: &str,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<Value>, ProviderError> {
        let invalid_url = |reason: String| ProviderError::InvalidQuery {
            source_name: SOURCE.into(),
            reason,
        };

        let mut url = reqwest::Url::parse(&self.api_url).map_err(|e| invalid_url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid_url(format!("{} cannot be a base URL", self.api_url)))?
            .pop_if_empty()
            .extend(["calendars", calendar_id, "events"]);

        let max_results = self.max_results.to_string();
        let time_min = time_min.to_rfc3339();
        let time_max = time_max.to_rfc3339();
        let request = self.client.get(url).bearer_auth(access_token).query(&[
            ("timeMin", time_min.as_str()),
            ("timeMax", time_max.as_str()),
            ("maxResults", max_results.as_str()),
            ("singleEvents", "true"),
            ("orderBy", "startTime"),
        ]);

        let body = send_json(SOURCE, request).await?;
        Ok(body
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ContextProvider for CalendarProvider {
    fn name(&self) -> &str {
        "calendar"
    }

    fn source_name(&self) -> &str {
        SOURCE
    }

    async fn fetch(&self, query: &str) -> Result<ContextResult, ProviderError> {
        let now = Utc::now();
        let (time_min, time_max) = window_for(query, now);
        let access_token = self.access_token(now).await?;

        let mut events = Vec::new();
        for calendar_id in self.calendar_ids(&access_token).await? {
            match self.events(&access_token, &calendar_id, time_min, time_max).await {
                Ok(items) => events.extend(items),
                Err(e) => warn!(calendar = %calendar_id, error = %e, "Skipping calendar"),
            }
        }

        debug!(count = events.len(), "Calendar events fetched");
        Ok(ContextResult::found(
            SOURCE,
            format_events(&events, time_min, time_max),
        ))
    }
}

/// The OAuth token as written by Google's client libraries. Unknown fields
/// are kept so a rewrite does not lose them.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredToken {
    #[serde(alias = "access_token")]
    token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiry: Option<DateTime<Utc>>,
    #[serde(flatten)]
    extra: serde_json::Map<String, Value>,
}

impl StoredToken {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry
            .is_some_and(|expiry| expiry <= now + Duration::seconds(EXPIRY_SKEW_SECS))
    }
}

/// Pick the event window for a question. Checked in order: "today",
/// "tomorrow", "year", "week"; anything else covers the next seven days.
pub fn window_for(query: &str, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let query = query.to_lowercase();
    let next_midnight = (now + Duration::days(1))
        .date_naive()
        .and_time(NaiveTime::default())
        .and_utc();

    if query.contains("today") {
        (now, next_midnight)
    } else if query.contains("tomorrow") {
        (next_midnight, next_midnight + Duration::days(1))
    } else if query.contains("year") {
        (now, now + Duration::days(365))
    } else {
        // "week" and the default are the same span
        (now, now + Duration::days(7))
    }
}

/// Start of an event: `dateTime` for timed events, `date` for all-day ones.
fn event_start(event: &Value) -> Option<DateTime<FixedOffset>> {
    let start = event.get("start")?;
    if let Some(date_time) = start.get("dateTime").and_then(Value::as_str) {
        return DateTime::parse_from_rfc3339(date_time).ok();
    }
    let date = start.get("date").and_then(Value::as_str)?;
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some(day.and_time(NaiveTime::default()).and_utc().fixed_offset())
}

/// Render events sorted by start time as `- Mon, Jan 05 @ 09:00 AM: Summary`.
pub fn format_events(events: &[Value], time_min: DateTime<Utc>, time_max: DateTime<Utc>) -> String {
    let window = format!(
        "{} to {} (UTC)",
        time_min.format("%a, %b %d %I:%M %p"),
        time_max.format("%a, %b %d %I:%M %p")
    );

    let mut dated: Vec<(DateTime<FixedOffset>, &str)> = events
        .iter()
        .filter_map(|event| {
            let start = event_start(event)?;
            let summary = event
                .get("summary")
                .and_then(Value::as_str)
                .unwrap_or("(no title)");
            Some((start, summary))
        })
        .collect();

    if dated.is_empty() {
        return format!("No upcoming events found from {window}.");
    }

    dated.sort_by_key(|(start, _)| start.with_timezone(&Utc));

    let mut out = format!("Events from {window}:\n");
    for (start, summary) in dated {
        out.push_str(&format!("- {}: {summary}\n", start.format("%a, %b %d @ %I:%M %p")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn today_runs_until_next_midnight() {
        let now = at(2025, 1, 5, 14, 30);
        let (min, max) = window_for("What's on today?", now);
        assert_eq!(min, now);
        assert_eq!(max, at(2025, 1, 6, 0, 0));
    }

    #[test]
    fn tomorrow_is_the_whole_next_day() {
        let (min, max) = window_for("am I busy tomorrow", at(2025, 1, 5, 14, 30));
        assert_eq!(min, at(2025, 1, 6, 0, 0));
        assert_eq!(max, at(2025, 1, 7, 0, 0));
    }

    #[test]
    fn year_and_week_spans() {
        let now = at(2025, 3, 1, 8, 0);
        assert_eq!(window_for("plans this year", now).1, now + Duration::days(365));
        assert_eq!(window_for("this week", now).1, now + Duration::days(7));
        assert_eq!(window_for("any meetings?", now).1, now + Duration::days(7));
    }

    #[test]
    fn events_are_sorted_and_formatted() {
        let events = vec![
            serde_json::json!({"summary": "Review", "start": {"dateTime": "2025-01-05T15:00:00Z"}}),
            serde_json::json!({"summary": "Standup", "start": {"dateTime": "2025-01-05T09:00:00Z"}}),
            serde_json::json!({"summary": "Holiday", "start": {"date": "2025-01-04"}}),
            serde_json::json!({"start": {"dateTime": "2025-01-06T10:30:00Z"}}),
        ];
        let text = format_events(&events, at(2025, 1, 4, 0, 0), at(2025, 1, 11, 0, 0));
        let lines: Vec<&str> = text.lines().skip(1).collect();
        assert_eq!(
            lines,
            vec![
                "- Sat, Jan 04 @ 12:00 AM: Holiday",
                "- Sun, Jan 05 @ 09:00 AM: Standup",
                "- Sun, Jan 05 @ 03:00 PM: Review",
                "- Mon, Jan 06 @ 10:30 AM: (no title)",
            ]
        );
    }

    #[test]
    fn no_events_is_an_explicit_sentence() {
        let text = format_events(&[], at(2025, 1, 5, 0, 0), at(2025, 1, 6, 0, 0));
        assert!(text.starts_with("No upcoming events found"));
    }

    #[test]
    fn token_expiry_uses_skew() {
        let now = at(2025, 1, 5, 12, 0);
        let mut token: StoredToken =
            serde_json::from_value(serde_json::json!({"token": "t"})).unwrap();
        assert!(!token.is_expired(now));
        token.expiry = Some(now + Duration::seconds(30));
        assert!(token.is_expired(now));
        token.expiry = Some(now + Duration::hours(1));
        assert!(!token.is_expired(now));
    }

    #[test]
    fn disabled_calendar_is_not_configured() {
        let config = CalendarConfig {
            enabled: false,
            ..CalendarConfig::default()
        };
        assert!(matches!(
            CalendarProvider::from_config(&config),
            Err(ProviderError::NotConfigured { .. })
        ));
    }

    #[test]
    fn missing_token_file_is_not_configured() {
        let dir = tempfile::tempdir().unwrap();
        let config = CalendarConfig {
            token_path: dir.path().join("absent.json").display().to_string(),
            ..CalendarConfig::default()
        };
        let err = CalendarProvider::from_config(&config).err().unwrap();
        assert!(err.to_string().contains("consent flow"));
    }

    // --- Mock Google API ---

    #[derive(Clone, Default)]
    struct MockGoogle {
        bearer_tokens: Arc<Mutex<Vec<String>>>,
        refreshes: Arc<Mutex<u32>>,
    }

    async fn calendar_list(State(mock): State<MockGoogle>, headers: HeaderMap) -> Json<Value> {
        if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
            mock.bearer_tokens.lock().unwrap().push(auth.to_string());
        }
        Json(serde_json::json!({
            "items": [{"id": "primary"}, {"id": "team#holidays@group.calendar.google.com"}]
        }))
    }

    async fn events(
        Path(calendar_id): Path<String>,
        Query(params): Query<HashMap<String, String>>,
    ) -> (StatusCode, Json<Value>) {
        assert_eq!(params.get("singleEvents").map(String::as_str), Some("true"));
        assert_eq!(params.get("orderBy").map(String::as_str), Some("startTime"));
        let items = match calendar_id.as_str() {
            "primary" => serde_json::json!([
                {"summary": "Lunch", "start": {"dateTime": "2030-01-07T12:00:00Z"}},
                {"summary": "Standup", "start": {"dateTime": "2030-01-07T09:00:00Z"}}
            ]),
            "team#holidays@group.calendar.google.com" => serde_json::json!([
                {"summary": "Team offsite", "start": {"date": "2030-01-06"}}
            ]),
            _ => return (StatusCode::NOT_FOUND, Json(serde_json::json!({}))),
        };
        (StatusCode::OK, Json(serde_json::json!({"items": items})))
    }

    async fn token(State(mock): State<MockGoogle>) -> Json<Value> {
        *mock.refreshes.lock().unwrap() += 1;
        Json(serde_json::json!({"access_token": "fresh-token", "expires_in": 3600}))
    }

    async fn serve(mock: MockGoogle) -> String {
        let app = Router::new()
            .route("/users/me/calendarList", get(calendar_list))
            .route("/calendars/{calendar_id}/events", get(events))
            .route("/token", post(token))
            .with_state(mock);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn write_token(dir: &std::path::Path, expiry: DateTime<Utc>) -> PathBuf {
        let path = dir.join("google_token.json");
        let token = serde_json::json!({
            "token": "stored-token",
            "refresh_token": "refresh-me",
            "client_id": "cid",
            "client_secret": "csecret",
            "scopes": ["https://www.googleapis.com/auth/calendar.readonly"],
            "expiry": expiry.to_rfc3339(),
        });
        std::fs::write(&path, token.to_string()).unwrap();
        path
    }

    #[tokio::test]
    async fn fetches_events_from_every_calendar() {
        let mock = MockGoogle::default();
        let tokens = mock.bearer_tokens.clone();
        let refreshes = mock.refreshes.clone();
        let base = serve(mock).await;
        let dir = tempfile::tempdir().unwrap();
        let token_path = write_token(dir.path(), Utc::now() + Duration::hours(1));

        let provider = CalendarProvider::new(&base, format!("{base}/token"), token_path, 25);
        let result = provider.fetch("what's on my calendar this year").await.unwrap();

        assert!(result.found);
        assert_eq!(result.source_name, "Calendar");
        let lines: Vec<&str> = result.text.lines().skip(1).collect();
        assert_eq!(
            lines,
            vec![
                "- Sun, Jan 06 @ 12:00 AM: Team offsite",
                "- Mon, Jan 07 @ 09:00 AM: Standup",
                "- Mon, Jan 07 @ 12:00 PM: Lunch",
            ]
        );
        assert_eq!(tokens.lock().unwrap()[0], "Bearer stored-token");
        assert_eq!(*refreshes.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_persisted() {
        let mock = MockGoogle::default();
        let tokens = mock.bearer_tokens.clone();
        let refreshes = mock.refreshes.clone();
        let base = serve(mock).await;
        let dir = tempfile::tempdir().unwrap();
        let token_path = write_token(dir.path(), Utc::now() - Duration::hours(1));

        let provider = CalendarProvider::new(&base, format!("{base}/token"), &token_path, 25);
        provider.fetch("today").await.unwrap();

        assert_eq!(*refreshes.lock().unwrap(), 1);
        assert_eq!(tokens.lock().unwrap()[0], "Bearer fresh-token");

        let saved: Value =
            serde_json::from_str(&std::fs::read_to_string(&token_path).unwrap()).unwrap();
        assert_eq!(saved["token"], "fresh-token");
        assert_eq!(saved["refresh_token"], "refresh-me");
        assert!(saved["scopes"].is_array());
    }

    #[tokio::test]
    async fn expired_token_without_refresh_token_fails() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("google_token.json");
        let expired = (Utc::now() - Duration::hours(1)).to_rfc3339();
        std::fs::write(
            &token_path,
            serde_json::json!({"token": "old", "expiry": expired}).to_string(),
        )
        .unwrap();

        let provider = CalendarProvider::new("http://127.0.0.1:1", "http://127.0.0.1:1/token", token_path, 25);
        let err = provider.fetch("today").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured { .. }));
    }
}
