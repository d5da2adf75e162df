//! Read-only aggregate queries over events and RSVPs.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, Utc};

use super::models::{
    Event, RecommendationItem, Recommendations, Seasonality, SeasonalityItem, TrendingItem,
};
use super::Store;

const RECENT_WEIGHT: f64 = 1.5;
const TOTAL_WEIGHT: f64 = 0.5;
const COLD_START_LIMIT: usize = 5;

impl Store {
    /// Event counts per start month, oldest month first.
    pub fn seasonality(&self) -> Seasonality {
        let tables = self.tables.read();
        let mut months: BTreeMap<String, usize> = BTreeMap::new();
        for event in tables.events.rows.values() {
            *months
                .entry(event.start_time.format("%Y-%m").to_string())
                .or_default() += 1;
        }
        Seasonality {
            items: months
                .into_iter()
                .map(|(month, count)| SeasonalityItem { month, count })
                .collect(),
        }
    }

    /// Events ranked by `recent * 1.5 + total * 0.5`, where `recent` counts
    /// RSVPs created within `window_days` of `now`. Events scoring zero are
    /// left out; equal scores keep id order.
    pub fn trending(&self, now: DateTime<Utc>, window_days: u32, limit: usize) -> Vec<TrendingItem> {
        let cutoff = now - Duration::days(i64::from(window_days));
        let tables = self.tables.read();

        let mut counts: BTreeMap<u64, (usize, usize)> = BTreeMap::new();
        for rsvp in tables.rsvps.rows.values() {
            let (total, recent) = counts.entry(rsvp.event_id).or_default();
            *total += 1;
            if rsvp.created_at >= cutoff {
                *recent += 1;
            }
        }

        let mut ranked: Vec<TrendingItem> = tables
            .events
            .rows
            .values()
            .filter_map(|event| {
                let (total, recent) = counts.get(&event.id).copied().unwrap_or_default();
                let score = recent as f64 * RECENT_WEIGHT + total as f64 * TOTAL_WEIGHT;
                (score > 0.0).then(|| TrendingItem {
                    event_id: event.id,
                    title: event.title.clone(),
                    trending_score: score,
                    recent_rsvps: recent,
                })
            })
            .collect();

        ranked.sort_by(|a, b| b.trending_score.total_cmp(&a.trending_score));
        ranked.truncate(limit);
        ranked
    }

    /// Suggestions for the account `user_id`, linked to RSVP history through
    /// the attendee sharing its email.
    ///
    /// Without such an attendee, the next upcoming events are returned.
    /// Otherwise future events at locations the attendee has RSVP'd to,
    /// minus events already RSVP'd, soonest first.
    pub fn recommendations(&self, user_id: u64, email: &str, now: DateTime<Utc>) -> Recommendations {
        let tables = self.tables.read();
        let mut upcoming: Vec<&Event> = tables
            .events
            .rows
            .values()
            .filter(|e| e.start_time > now)
            .collect();
        upcoming.sort_by_key(|e| (e.start_time, e.id));

        let attendee = tables
            .attendees
            .rows
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email));

        let recommendations = match attendee {
            None => upcoming
                .into_iter()
                .take(COLD_START_LIMIT)
                .map(|e| recommend(e, 1.0, "Top upcoming event".into()))
                .collect(),
            Some(attendee) => {
                let attended: HashSet<u64> = tables
                    .rsvps
                    .rows
                    .values()
                    .filter(|r| r.attendee_id == attendee.id)
                    .map(|r| r.event_id)
                    .collect();
                let locations: HashSet<&str> = attended
                    .iter()
                    .filter_map(|id| tables.events.rows.get(id))
                    .map(|e| e.location.as_str())
                    .collect();

                upcoming
                    .into_iter()
                    .filter(|e| locations.contains(e.location.as_str()))
                    .filter(|e| !attended.contains(&e.id))
                    .map(|e| recommend(e, 0.9, format!("Based on your interest in {}", e.location)))
                    .collect()
            }
        };

        Recommendations {
            recommendations,
            user_id,
        }
    }
}

fn recommend(event: &Event, score: f64, reason: String) -> RecommendationItem {
    RecommendationItem {
        event_id: event.id,
        title: event.title.clone(),
        score,
        reason,
        location: event.location.clone(),
        start_time: event.start_time,
    }
}
