//! Records and request payloads.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::http::error::ApiError;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Event {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventCreate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub location: String,
    #[serde(deserialize_with = "timestamp")]
    pub start_time: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp")]
    pub end_time: DateTime<Utc>,
    pub capacity: u32,
}

impl EventCreate {
    pub fn validate(&self) -> Result<(), ApiError> {
        check_len("title", &self.title, 1, 200)?;
        if let Some(description) = &self.description {
            check_len("description", description, 0, 1000)?;
        }
        check_len("location", &self.location, 1, 200)?;
        check_order(self.start_time, self.end_time)
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub end_time: Option<DateTime<Utc>>,
    pub capacity: Option<u32>,
}

impl EventUpdate {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(title) = &self.title {
            check_len("title", title, 1, 200)?;
        }
        if let Some(description) = &self.description {
            check_len("description", description, 0, 1000)?;
        }
        if let Some(location) = &self.location {
            check_len("location", location, 1, 200)?;
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            check_order(start, end)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Attendee {
    pub id: u64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttendeeCreate {
    pub name: String,
    pub email: String,
}

impl AttendeeCreate {
    pub fn validate(&self) -> Result<(), ApiError> {
        check_len("name", &self.name, 1, 120)?;
        check_len("email", &self.email, 3, 255)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RsvpStatus {
    Going,
    Maybe,
    NotGoing,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Rsvp {
    pub id: u64,
    pub event_id: u64,
    pub attendee_id: u64,
    pub status: RsvpStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RsvpCreate {
    pub attendee_id: u64,
    pub status: RsvpStatus,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EventStats {
    pub event_id: u64,
    pub going: u32,
    pub maybe: u32,
    pub not_going: u32,
    pub remaining_capacity: u32,
}

/// Stored account. The hash never leaves the process.
#[derive(Debug, Clone)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserOut {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserOut {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserCreate {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl UserCreate {
    pub fn validate(&self) -> Result<(), ApiError> {
        check_len("username", &self.username, 3, 50)?;
        if !self.email.contains('@') {
            return Err(ApiError::Validation("email must be a valid address".into()));
        }
        if self.password.chars().count() < 6 {
            return Err(ApiError::Validation(
                "password must be at least 6 characters".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeasonalityItem {
    /// `YYYY-MM` of the event start.
    pub month: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Seasonality {
    pub items: Vec<SeasonalityItem>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrendingItem {
    pub event_id: u64,
    pub title: String,
    pub trending_score: f64,
    pub recent_rsvps: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecommendationItem {
    pub event_id: u64,
    pub title: String,
    pub score: f64,
    pub reason: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recommendations {
    pub recommendations: Vec<RecommendationItem>,
    pub user_id: u64,
}

/// Where imported events come from.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DataSource {
    pub id: u64,
    pub name: String,
    pub url: String,
    pub license: String,
    pub retrieved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Success,
    PartialSuccess,
    Failed,
}

/// A CSV row that could not be imported. `row` counts data rows from 1.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImportRowError {
    pub row: usize,
    pub error: String,
}

/// Provenance record for one import attempt.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImportRun {
    pub id: u64,
    pub data_source_id: u64,
    pub status: ImportStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rows_read: usize,
    pub rows_inserted: usize,
    pub rows_updated: usize,
    pub errors: Vec<ImportRowError>,
    pub sha256_hash: Option<String>,
    pub parser_version: &'static str,
}

/// One parsed row, keyed by the id it carries in its source.
#[derive(Debug, Clone)]
pub struct ImportRecord {
    pub record_id: String,
    pub event: EventCreate,
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), ApiError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ApiError::Validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

fn check_order(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ApiError> {
    if end <= start {
        return Err(ApiError::Validation(
            "end_time must be after start_time".into(),
        ));
    }
    Ok(())
}

/// Parse RFC 3339, or a naive ISO-8601 timestamp taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc())
}

fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid datetime: {raw}")))
}

fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid datetime: {raw}"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_naive_and_offset_timestamps() {
        let naive = parse_timestamp("2026-01-01T10:00:00").unwrap();
        let aware = parse_timestamp("2026-01-01T11:00:00+01:00").unwrap();
        assert_eq!(naive, aware);
        assert!(parse_timestamp("tomorrow").is_none());
    }

    #[test]
    fn event_create_rejects_inverted_times() {
        let payload: EventCreate = serde_json::from_value(json!({
            "title": "Launch",
            "location": "Leeds",
            "start_time": "2026-01-01T12:00:00",
            "end_time": "2026-01-01T10:00:00",
            "capacity": 10
        }))
        .unwrap();
        assert!(matches!(payload.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn event_create_rejects_empty_title() {
        let payload: EventCreate = serde_json::from_value(json!({
            "title": "",
            "location": "Leeds",
            "start_time": "2026-01-01T10:00:00",
            "end_time": "2026-01-01T12:00:00",
            "capacity": 10
        }))
        .unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn negative_capacity_fails_to_parse() {
        let parsed: Result<EventCreate, _> = serde_json::from_value(json!({
            "title": "t",
            "location": "l",
            "start_time": "2026-01-01T10:00:00",
            "end_time": "2026-01-01T12:00:00",
            "capacity": -1
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn rsvp_status_uses_snake_case() {
        let payload: RsvpCreate =
            serde_json::from_value(json!({ "attendee_id": 1, "status": "not_going" })).unwrap();
        assert_eq!(payload.status, RsvpStatus::NotGoing);
        assert!(serde_json::from_value::<RsvpCreate>(json!({ "attendee_id": 1, "status": "yes" })).is_err());
    }

    #[test]
    fn user_out_omits_password() {
        let user = User {
            id: 1,
            username: "ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$...".into(),
            is_admin: false,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(UserOut::from(&user)).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["username"], "ada");
    }
}
