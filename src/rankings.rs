use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::models::{College, CollegeStanding, Event, Host, HostStanding};
use crate::schedule::EventPhase;
use crate::scoring::{college_events, college_score};

fn by_score_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Distinct colleges in first-seen order.
pub fn colleges_of(hosts: &[Host]) -> Vec<College> {
    let mut colleges: Vec<College> = Vec::new();
    for host in hosts {
        if !colleges.contains(&host.college) {
            colleges.push(host.college.clone());
        }
    }
    colleges
}

/// One standing per college represented among `hosts`, best first.
/// `hosts` must already carry their host scores.
pub fn college_leaderboard(
    events: &[Event],
    hosts: &[Host],
    now: DateTime<Utc>,
) -> Vec<CollegeStanding> {
    let mut standings: Vec<CollegeStanding> = colleges_of(hosts)
        .into_iter()
        .map(|college| {
            let events_count = college_events(events, hosts, &college).count();
            let rated_past_events = college_events(events, hosts, &college)
                .filter(|e| e.is_rated() && EventPhase::of(e, now) == EventPhase::Past)
                .count();

            CollegeStanding {
                score: college_score(events, hosts, &college),
                events: events_count,
                rated_past_events,
                college,
            }
        })
        .collect();

    standings.sort_by(|a, b| by_score_desc(a.score, b.score));
    standings
}

/// One standing per host, best first.
pub fn host_leaderboard(events: &[Event], hosts: &[Host]) -> Vec<HostStanding> {
    let mut standings: Vec<HostStanding> = hosts
        .iter()
        .map(|host| {
            let hosted: Vec<&Event> = events.iter().filter(|e| e.host_id == host.id).collect();
            HostStanding {
                host_id: host.id,
                host_name: host.name.clone(),
                college: host.college.clone(),
                score: host.host_score,
                events: hosted.len(),
                rated_events: hosted.iter().filter(|e| e.is_rated()).count(),
            }
        })
        .collect();

    standings.sort_by(|a, b| by_score_desc(a.score, b.score));
    standings
}

pub fn medal(position: usize) -> &'static str {
    match position {
        0 => "🥇",
        1 => "🥈",
        2 => "🥉",
        _ => "•",
    }
}
