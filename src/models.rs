use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: Uuid,
    pub stars: u8,
    pub vibe: u8,
    pub safety: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Rating {
    /// Builds a rating, rejecting any dimension outside 1..=5.
    pub fn new(
        user_id: Uuid,
        stars: u8,
        vibe: u8,
        safety: u8,
        comment: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        for (field, value) in [("stars", stars), ("vibe", vibe), ("safety", safety)] {
            if !(MIN_RATING..=MAX_RATING).contains(&value) {
                return Err(ValidationError::OutOfRange { field, value });
            }
        }

        Ok(Self {
            user_id,
            stars,
            vibe,
            safety,
            comment: comment.filter(|c| !c.trim().is_empty()),
            created_at,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationMode {
    Open,
    ReservationRequired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub host_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub reservation_mode: ReservationMode,
    pub capacity: Option<u32>,
    pub reserved_count: u32,
    pub ratings: Vec<Rating>,
}

impl Event {
    pub fn is_rated(&self) -> bool {
        !self.ratings.is_empty()
    }
}

/// Grouping key over hosts. Colleges carry no state of their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct College(pub String);

impl College {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for College {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub id: Uuid,
    pub name: String,
    pub college: College,
    pub verified: bool,
    /// Derived from hosted events; recomputed, never read back from storage.
    #[serde(default)]
    pub host_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollegeStanding {
    pub college: College,
    pub score: f64,
    pub events: usize,
    pub rated_past_events: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HostStanding {
    pub host_id: Uuid,
    pub host_name: String,
    pub college: College,
    pub score: f64,
    pub events: usize,
    pub rated_events: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_accepts_bounds() {
        let rating = Rating::new(Uuid::new_v4(), 1, 5, 3, None, Utc::now()).unwrap();
        assert_eq!(rating.stars, 1);
        assert_eq!(rating.vibe, 5);
    }

    #[test]
    fn rating_rejects_out_of_range() {
        let err = Rating::new(Uuid::new_v4(), 5, 0, 3, None, Utc::now()).unwrap_err();
        assert_eq!(err, ValidationError::OutOfRange { field: "vibe", value: 0 });

        let err = Rating::new(Uuid::new_v4(), 6, 3, 3, None, Utc::now()).unwrap_err();
        assert_eq!(err, ValidationError::OutOfRange { field: "stars", value: 6 });
    }

    #[test]
    fn blank_comment_is_dropped() {
        let rating =
            Rating::new(Uuid::new_v4(), 4, 4, 4, Some("  ".to_string()), Utc::now()).unwrap();
        assert_eq!(rating.comment, None);
    }
}
