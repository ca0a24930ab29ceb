use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventPhase {
    Future,
    Ongoing,
    Past,
}

impl EventPhase {
    /// Both ends of `[start_at, end_at]` count as ongoing.
    pub fn of(event: &Event, now: DateTime<Utc>) -> Self {
        if now < event.start_at {
            EventPhase::Future
        } else if now <= event.end_at {
            EventPhase::Ongoing
        } else {
            EventPhase::Past
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EventPhase::Future => "FUTURE",
            EventPhase::Ongoing => "LIVE",
            EventPhase::Past => "PAST",
        }
    }
}

#[derive(Debug, Default)]
pub struct TimeSplit<'a> {
    pub future: Vec<&'a Event>,
    pub ongoing: Vec<&'a Event>,
    pub past: Vec<&'a Event>,
}

impl TimeSplit<'_> {
    pub fn len(&self) -> usize {
        self.future.len() + self.ongoing.len() + self.past.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partitions events around `now`. Future and ongoing are soonest first,
/// past is most recent first.
pub fn split_by_time(events: &[Event], now: DateTime<Utc>) -> TimeSplit<'_> {
    let mut split = TimeSplit::default();

    for event in events {
        match EventPhase::of(event, now) {
            EventPhase::Future => split.future.push(event),
            EventPhase::Ongoing => split.ongoing.push(event),
            EventPhase::Past => split.past.push(event),
        }
    }

    split.future.sort_by_key(|e| e.start_at);
    split.ongoing.sort_by_key(|e| e.start_at);
    split.past.sort_by(|a, b| b.start_at.cmp(&a.start_at));
    split
}

pub fn split_by_time_now(events: &[Event]) -> TimeSplit<'_> {
    split_by_time(events, Utc::now())
}
