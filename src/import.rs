use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::{College, Event, Host, Rating, ReservationMode};
use crate::reservation::check_rating;

#[derive(Debug, Deserialize)]
pub struct HostRow {
    pub id: Uuid,
    pub full_name: String,
    pub college: String,
    pub verified: bool,
}

#[derive(Debug, Deserialize)]
pub struct EventRow {
    pub id: Uuid,
    pub title: String,
    pub host_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub reservation_required: bool,
    pub capacity: Option<u32>,
    pub reserved_count: u32,
}

#[derive(Debug, Deserialize)]
pub struct RatingRow {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub stars: u8,
    pub vibe: u8,
    pub safety: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RatingRow {
    pub fn into_rating(self) -> Result<(Uuid, Rating), ValidationError> {
        let rating = Rating::new(
            self.user_id,
            self.stars,
            self.vibe,
            self.safety,
            self.comment,
            self.created_at,
        )?;
        Ok((self.event_id, rating))
    }
}

impl From<HostRow> for Host {
    fn from(row: HostRow) -> Self {
        Host {
            id: row.id,
            name: row.full_name,
            college: College::new(row.college),
            verified: row.verified,
            host_score: 0.0,
        }
    }
}

impl TryFrom<EventRow> for Event {
    type Error = ValidationError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        if row.end_at < row.start_at {
            return Err(ValidationError::EndsBeforeStart);
        }

        Ok(Event {
            id: row.id,
            title: row.title,
            host_id: row.host_id,
            start_at: row.start_at,
            end_at: row.end_at,
            reservation_mode: if row.reservation_required {
                ReservationMode::ReservationRequired
            } else {
                ReservationMode::Open
            },
            capacity: row.capacity,
            reserved_count: row.reserved_count,
            ratings: Vec::new(),
        })
    }
}

pub fn read_hosts<R: Read>(reader: R) -> anyhow::Result<Vec<Host>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut hosts = Vec::new();
    for result in reader.deserialize::<HostRow>() {
        hosts.push(result.context("malformed host row")?.into());
    }
    Ok(hosts)
}

pub fn read_events<R: Read>(reader: R) -> anyhow::Result<Vec<Event>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut events = Vec::new();
    for result in reader.deserialize::<EventRow>() {
        let row = result.context("malformed event row")?;
        let id = row.id;
        events.push(Event::try_from(row).with_context(|| format!("event {id}"))?);
    }
    Ok(events)
}

pub fn read_ratings<R: Read>(reader: R) -> anyhow::Result<Vec<RatingRow>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for result in reader.deserialize::<RatingRow>() {
        rows.push(result.context("malformed rating row")?);
    }
    Ok(rows)
}

/// Hangs each rating off its event. Ratings for unknown events or events
/// that have not ended yet are skipped. A user keeps only their first rating
/// per event.
pub fn attach_ratings(
    events: &mut [Event],
    ratings: Vec<RatingRow>,
    now: DateTime<Utc>,
) -> anyhow::Result<usize> {
    let index: HashMap<Uuid, usize> = events
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id, i))
        .collect();
    let mut seen: HashSet<(Uuid, Uuid)> = events
        .iter()
        .flat_map(|e| e.ratings.iter().map(move |r| (e.id, r.user_id)))
        .collect();
    let mut attached = 0usize;

    for row in ratings {
        let (event_id, rating) = row.into_rating()?;
        let Some(&i) = index.get(&event_id) else {
            warn!(%event_id, "rating for unknown event skipped");
            continue;
        };
        if let Err(e) = check_rating(&events[i], now) {
            warn!(%event_id, user_id = %rating.user_id, "rating skipped: {e}");
            continue;
        }
        if !seen.insert((event_id, rating.user_id)) {
            debug!(%event_id, user_id = %rating.user_id, "duplicate rating skipped");
            continue;
        }

        events[i].ratings.push(rating);
        attached += 1;
    }

    Ok(attached)
}

/// Loads hosts, events and ratings from three CSV files.
pub fn load_csv(
    hosts: &Path,
    events: &Path,
    ratings: &Path,
) -> anyhow::Result<(Vec<Host>, Vec<Event>)> {
    let open = |path: &Path| {
        std::fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))
    };

    let hosts = read_hosts(open(hosts)?)?;
    let mut events = read_events(open(events)?)?;
    let attached = attach_ratings(&mut events, read_ratings(open(ratings)?)?, Utc::now())?;
    tracing::info!(
        hosts = hosts.len(),
        events = events.len(),
        ratings = attached,
        "loaded CSV data"
    );
    Ok((hosts, events))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mid_february() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-02-15T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    const HOSTS: &str = "\
id,full_name,college,verified
3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2,Howard Zhao,Jones,true
0c22f1f1-9184-4fd4-9b21-28c68a6a89dc,Maya L.,Brown,false
";

    const EVENTS: &str = "\
id,title,host_id,start_at,end_at,reservation_required,capacity,reserved_count
8a1b7f1e-46a4-4c1f-9d7a-0b5a3c2f9e01,Neon Kitchen,0c22f1f1-9184-4fd4-9b21-28c68a6a89dc,2026-02-01T20:00:00Z,2026-02-01T23:00:00Z,false,60,0
8a1b7f1e-46a4-4c1f-9d7a-0b5a3c2f9e02,Winter Glow,3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2,2026-03-01T20:00:00Z,2026-03-01T23:00:00Z,true,,64
";

    const RATINGS: &str = "\
event_id,user_id,stars,vibe,safety,comment,created_at
8a1b7f1e-46a4-4c1f-9d7a-0b5a3c2f9e01,3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2,5,5,4,Dumplings were elite.,2026-02-02T01:00:00Z
8a1b7f1e-46a4-4c1f-9d7a-0b5a3c2f9e99,3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2,4,4,4,,2026-02-02T01:00:00Z
";

    #[test]
    fn reads_hosts_and_events() {
        let hosts = read_hosts(HOSTS.as_bytes()).unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[1].college, College::new("Brown"));
        assert!(!hosts[1].verified);

        let events = read_events(EVENTS.as_bytes()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].reservation_mode, ReservationMode::Open);
        assert_eq!(events[1].reservation_mode, ReservationMode::ReservationRequired);
        assert_eq!(events[1].capacity, None);
        assert_eq!(events[1].reserved_count, 64);
    }

    #[test]
    fn attaches_ratings_to_known_events() {
        let mut events = read_events(EVENTS.as_bytes()).unwrap();
        let ratings = read_ratings(RATINGS.as_bytes()).unwrap();
        let attached = attach_ratings(&mut events, ratings, mid_february()).unwrap();
        assert_eq!(attached, 1);
        assert_eq!(events[0].ratings.len(), 1);
        assert_eq!(events[0].ratings[0].safety, 4);
        assert!(events[1].ratings.is_empty());
    }

    #[test]
    fn rejects_out_of_range_rating() {
        let csv = "\
event_id,user_id,stars,vibe,safety,comment,created_at
8a1b7f1e-46a4-4c1f-9d7a-0b5a3c2f9e01,3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2,7,5,4,,2026-02-02T01:00:00Z
";
        let mut events = read_events(EVENTS.as_bytes()).unwrap();
        let ratings = read_ratings(csv.as_bytes()).unwrap();
        assert!(attach_ratings(&mut events, ratings, mid_february()).is_err());
    }

    #[test]
    fn skips_ratings_before_the_event_ends() {
        let csv = "\
event_id,user_id,stars,vibe,safety,comment,created_at
8a1b7f1e-46a4-4c1f-9d7a-0b5a3c2f9e02,0c22f1f1-9184-4fd4-9b21-28c68a6a89dc,1,1,1,,2026-02-10T01:00:00Z
";
        let mut events = read_events(EVENTS.as_bytes()).unwrap();
        let ratings = read_ratings(csv.as_bytes()).unwrap();
        let attached = attach_ratings(&mut events, ratings, mid_february()).unwrap();
        assert_eq!(attached, 0);
        assert!(events[1].ratings.is_empty());
        assert_eq!(crate::scoring::scored_event(&events[1]), crate::scoring::NEUTRAL_EVENT_SCORE);
    }

    #[test]
    fn keeps_first_rating_per_user() {
        let csv = "\
event_id,user_id,stars,vibe,safety,comment,created_at
8a1b7f1e-46a4-4c1f-9d7a-0b5a3c2f9e01,3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2,2,3,4,first,2026-02-02T01:00:00Z
8a1b7f1e-46a4-4c1f-9d7a-0b5a3c2f9e01,3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2,5,5,5,,2026-02-02T02:00:00Z
8a1b7f1e-46a4-4c1f-9d7a-0b5a3c2f9e01,3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2,5,5,5,,2026-02-02T03:00:00Z
8a1b7f1e-46a4-4c1f-9d7a-0b5a3c2f9e01,0c22f1f1-9184-4fd4-9b21-28c68a6a89dc,5,5,5,,2026-02-02T03:00:00Z
";
        let mut events = read_events(EVENTS.as_bytes()).unwrap();
        let ratings = read_ratings(csv.as_bytes()).unwrap();
        let attached = attach_ratings(&mut events, ratings, mid_february()).unwrap();
        assert_eq!(attached, 2);
        assert_eq!(events[0].ratings.len(), 2);
        assert_eq!(events[0].ratings[0].stars, 2);
        assert_eq!(events[0].ratings[0].comment.as_deref(), Some("first"));

        let again = read_ratings(csv.as_bytes()).unwrap();
        assert_eq!(attach_ratings(&mut events, again, mid_february()).unwrap(), 0);
    }

    #[test]
    fn rejects_inverted_window() {
        let csv = "\
id,title,host_id,start_at,end_at,reservation_required,capacity,reserved_count
8a1b7f1e-46a4-4c1f-9d7a-0b5a3c2f9e01,Backwards,0c22f1f1-9184-4fd4-9b21-28c68a6a89dc,2026-02-01T23:00:00Z,2026-02-01T20:00:00Z,false,,0
";
        assert!(read_events(csv.as_bytes()).is_err());
    }
}
