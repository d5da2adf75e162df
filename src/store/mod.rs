//! In-memory data store for events, attendees, RSVPs and users.
//!
//! # Design Decisions
//! - One `RwLock` over all tables keeps cross-table checks (RSVP uniqueness,
//!   cascade on event delete) atomic
//! - Ids are per-table counters starting at 1, never reused
//! - Lock guards never cross an `.await`

mod analytics;
mod imports;
pub mod models;

pub use self::imports::{ImportBatch, PARSER_VERSION};

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;

use self::models::{
    Attendee, AttendeeCreate, DataSource, Event, EventCreate, EventStats, EventUpdate, ImportRun,
    Page, Rsvp, RsvpCreate, RsvpStatus, User,
};
use crate::http::error::ApiError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} already exists")]
    Conflict(&'static str),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(subject) => ApiError::NotFound(subject.to_string()),
            StoreError::Conflict(subject) => ApiError::Duplicate(subject.to_string()),
        }
    }
}

/// Sort orders accepted by [`Store::list_events`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventSort {
    #[default]
    StartAsc,
    StartDesc,
    TitleAsc,
    TitleDesc,
}

impl EventSort {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "start_time" => Some(EventSort::StartAsc),
            "-start_time" => Some(EventSort::StartDesc),
            "title" => Some(EventSort::TitleAsc),
            "-title" => Some(EventSort::TitleDesc),
            _ => None,
        }
    }
}

/// Filters for event listings. Text matches are case-insensitive substrings.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub q: Option<String>,
    pub location: Option<String>,
    pub start_after: Option<DateTime<Utc>>,
    pub start_before: Option<DateTime<Utc>>,
    pub sort: EventSort,
    pub limit: usize,
    pub offset: usize,
}

impl EventFilter {
    fn matches(&self, event: &Event) -> bool {
        contains_ci(&event.title, self.q.as_deref())
            && contains_ci(&event.location, self.location.as_deref())
            && self.start_after.map_or(true, |t| event.start_time >= t)
            && self.start_before.map_or(true, |t| event.start_time <= t)
    }
}

fn contains_ci(haystack: &str, needle: Option<&str>) -> bool {
    match needle {
        Some(needle) if !needle.is_empty() => {
            haystack.to_lowercase().contains(&needle.to_lowercase())
        }
        _ => true,
    }
}

#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<u64, T>,
    next_id: u64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 0,
        }
    }
}

impl<T> Table<T> {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
struct Tables {
    events: Table<Event>,
    attendees: Table<Attendee>,
    rsvps: Table<Rsvp>,
    users: Table<User>,
    sources: Table<DataSource>,
    imports: Table<ImportRun>,
    /// (source id, record id in that source) to event id.
    provenance: HashMap<(u64, String), u64>,
}

impl Tables {
    fn insert_event(&mut self, data: EventCreate) -> Event {
        let id = self.events.allocate();
        let event = Event {
            id,
            title: data.title,
            description: data.description,
            location: data.location,
            start_time: data.start_time,
            end_time: data.end_time,
            capacity: data.capacity,
            created_at: Utc::now(),
        };
        self.events.rows.insert(id, event.clone());
        event
    }
}

#[derive(Debug, Default)]
pub struct Store {
    tables: RwLock<Tables>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Events =====

    pub fn create_event(&self, data: EventCreate) -> Event {
        self.tables.write().insert_event(data)
    }

    pub fn get_event(&self, id: u64) -> Result<Event, StoreError> {
        self.tables
            .read()
            .events
            .rows
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound("event"))
    }

    pub fn list_events(&self, filter: &EventFilter) -> Page<Event> {
        let tables = self.tables.read();
        let mut matched: Vec<&Event> = tables
            .events
            .rows
            .values()
            .filter(|e| filter.matches(e))
            .collect();

        match filter.sort {
            EventSort::StartAsc => matched.sort_by(|a, b| (a.start_time, a.id).cmp(&(b.start_time, b.id))),
            EventSort::StartDesc => matched.sort_by(|a, b| (b.start_time, b.id).cmp(&(a.start_time, a.id))),
            EventSort::TitleAsc => matched.sort_by(|a, b| (&a.title, a.id).cmp(&(&b.title, b.id))),
            EventSort::TitleDesc => matched.sort_by(|a, b| (&b.title, b.id).cmp(&(&a.title, a.id))),
        }

        let total = matched.len();
        let items = matched
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .cloned()
            .collect();

        Page {
            items,
            total,
            limit: filter.limit,
            offset: filter.offset,
        }
    }

    pub fn update_event(&self, id: u64, patch: EventUpdate) -> Result<Event, ApiError> {
        let mut tables = self.tables.write();
        let event = tables
            .events
            .rows
            .get_mut(&id)
            .ok_or(StoreError::NotFound("event"))?;

        let start = patch.start_time.unwrap_or(event.start_time);
        let end = patch.end_time.unwrap_or(event.end_time);
        if end <= start {
            return Err(ApiError::Validation(
                "end_time must be after start_time".into(),
            ));
        }

        if let Some(title) = patch.title {
            event.title = title;
        }
        if let Some(description) = patch.description {
            event.description = Some(description);
        }
        if let Some(location) = patch.location {
            event.location = location;
        }
        if let Some(capacity) = patch.capacity {
            event.capacity = capacity;
        }
        event.start_time = start;
        event.end_time = end;

        Ok(event.clone())
    }

    /// Remove an event, every RSVP that points at it and its import
    /// provenance.
    pub fn delete_event(&self, id: u64) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        tables
            .events
            .rows
            .remove(&id)
            .ok_or(StoreError::NotFound("event"))?;
        tables.rsvps.rows.retain(|_, r| r.event_id != id);
        tables.provenance.retain(|_, event_id| *event_id != id);
        Ok(())
    }

    pub fn event_stats(&self, id: u64) -> Result<EventStats, StoreError> {
        let tables = self.tables.read();
        let event = tables
            .events
            .rows
            .get(&id)
            .ok_or(StoreError::NotFound("event"))?;

        let (mut going, mut maybe, mut not_going) = (0u32, 0u32, 0u32);
        for rsvp in tables.rsvps.rows.values().filter(|r| r.event_id == id) {
            match rsvp.status {
                RsvpStatus::Going => going += 1,
                RsvpStatus::Maybe => maybe += 1,
                RsvpStatus::NotGoing => not_going += 1,
            }
        }

        Ok(EventStats {
            event_id: id,
            going,
            maybe,
            not_going,
            remaining_capacity: event.capacity.saturating_sub(going),
        })
    }

    // ===== Attendees =====

    pub fn create_attendee(&self, data: AttendeeCreate) -> Result<Attendee, StoreError> {
        let mut tables = self.tables.write();
        if tables
            .attendees
            .rows
            .values()
            .any(|a| a.email.eq_ignore_ascii_case(&data.email))
        {
            return Err(StoreError::Conflict("email"));
        }
        let id = tables.attendees.allocate();
        let attendee = Attendee {
            id,
            name: data.name,
            email: data.email,
        };
        tables.attendees.rows.insert(id, attendee.clone());
        Ok(attendee)
    }

    pub fn get_attendee(&self, id: u64) -> Result<Attendee, StoreError> {
        self.tables
            .read()
            .attendees
            .rows
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound("attendee"))
    }

    // ===== RSVPs =====

    pub fn create_rsvp(&self, event_id: u64, data: RsvpCreate) -> Result<Rsvp, StoreError> {
        let mut tables = self.tables.write();
        if !tables.events.rows.contains_key(&event_id) {
            return Err(StoreError::NotFound("event"));
        }
        if !tables.attendees.rows.contains_key(&data.attendee_id) {
            return Err(StoreError::NotFound("attendee"));
        }
        if tables
            .rsvps
            .rows
            .values()
            .any(|r| r.event_id == event_id && r.attendee_id == data.attendee_id)
        {
            return Err(StoreError::Conflict("RSVP"));
        }

        let id = tables.rsvps.allocate();
        let rsvp = Rsvp {
            id,
            event_id,
            attendee_id: data.attendee_id,
            status: data.status,
            created_at: Utc::now(),
        };
        tables.rsvps.rows.insert(id, rsvp.clone());
        Ok(rsvp)
    }

    /// RSVPs for one event in creation order.
    pub fn list_rsvps(&self, event_id: u64) -> Result<Vec<Rsvp>, StoreError> {
        let tables = self.tables.read();
        if !tables.events.rows.contains_key(&event_id) {
            return Err(StoreError::NotFound("event"));
        }
        Ok(tables
            .rsvps
            .rows
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect())
    }

    pub fn delete_rsvp(&self, event_id: u64, rsvp_id: u64) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        if !tables.events.rows.contains_key(&event_id) {
            return Err(StoreError::NotFound("event"));
        }
        match tables.rsvps.rows.get(&rsvp_id) {
            Some(r) if r.event_id == event_id => {
                tables.rsvps.rows.remove(&rsvp_id);
                Ok(())
            }
            _ => Err(StoreError::NotFound("rsvp")),
        }
    }

    // ===== Users =====

    /// Insert a user; username and email must both be unused.
    pub fn create_user(
        &self,
        username: String,
        email: String,
        password_hash: String,
        is_admin: bool,
    ) -> Result<User, StoreError> {
        let mut tables = self.tables.write();
        if tables.users.rows.values().any(|u| u.username == username) {
            return Err(StoreError::Conflict("username"));
        }
        if tables
            .users
            .rows
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&email))
        {
            return Err(StoreError::Conflict("email"));
        }

        let id = tables.users.allocate();
        let user = User {
            id,
            username,
            email,
            password_hash,
            is_admin,
            created_at: Utc::now(),
        };
        tables.users.rows.insert(id, user.clone());
        Ok(user)
    }

    pub fn find_user(&self, username: &str) -> Option<User> {
        self.tables
            .read()
            .users
            .rows
            .values()
            .find(|u| u.username == username)
            .cloned()
    }
}
