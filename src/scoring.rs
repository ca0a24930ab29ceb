use crate::models::{College, Event, Host, Rating};

/// Score given to an event nobody has rated yet. A policy choice with no
/// derivation behind it, kept for compatibility with existing leaderboards.
pub const NEUTRAL_EVENT_SCORE: f64 = 70.0;

const STARS_WEIGHT: f64 = 0.5;
const VIBE_WEIGHT: f64 = 0.3;
const SAFETY_WEIGHT: f64 = 0.2;

const CONFIDENCE_SCALE: f64 = 8.0;
const CONFIDENCE_FLOOR: f64 = 0.65;

const HOST_VOLUME_SCALE: f64 = 6.0;
const COLLEGE_VOLUME_SCALE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingAverages {
    pub stars: f64,
    pub vibe: f64,
    pub safety: f64,
    pub count: usize,
}

impl RatingAverages {
    pub fn from_ratings(ratings: &[Rating]) -> Self {
        let denom = ratings.len().max(1) as f64;
        let avg = |pick: fn(&Rating) -> u8| {
            ratings.iter().map(|r| f64::from(pick(r))).sum::<f64>() / denom
        };

        Self {
            stars: avg(|r| r.stars),
            vibe: avg(|r| r.vibe),
            safety: avg(|r| r.safety),
            count: ratings.len(),
        }
    }
}

pub fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len().max(1) as f64
}

/// Saturating bonus in [0, 100) for how many events were hosted.
pub fn volume_bonus(count: usize, scale: f64) -> f64 {
    100.0 * (1.0 - (-(count as f64) / scale).exp())
}

/// 0..100 quality of a single event. Few ratings pull the score toward 65%
/// of its raw value; the discount fades as ratings accumulate.
pub fn event_score(avg_stars: f64, avg_vibe: f64, avg_safety: f64, ratings: usize) -> f64 {
    let weighted = STARS_WEIGHT * avg_stars + VIBE_WEIGHT * avg_vibe + SAFETY_WEIGHT * avg_safety;
    let base = (weighted - 1.0) / 4.0 * 100.0;
    let confidence = 1.0 - (-(ratings as f64) / CONFIDENCE_SCALE).exp();
    clamp_score(base * (CONFIDENCE_FLOOR + (1.0 - CONFIDENCE_FLOOR) * confidence))
}

/// Event score as used by the aggregators: unrated events count as neutral.
pub fn scored_event(event: &Event) -> f64 {
    if !event.is_rated() {
        return NEUTRAL_EVENT_SCORE;
    }

    let averages = RatingAverages::from_ratings(&event.ratings);
    event_score(
        averages.stars,
        averages.vibe,
        averages.safety,
        averages.count,
    )
}

/// HostScore = 0.7 * avg(event score) + 0.3 * volume bonus.
pub fn host_score<'a, I>(hosted: I) -> f64
where
    I: IntoIterator<Item = &'a Event>,
{
    let scores: Vec<f64> = hosted.into_iter().map(scored_event).collect();
    let avg_event = mean(&scores);
    let volume = volume_bonus(scores.len(), HOST_VOLUME_SCALE);
    clamp_score(0.7 * avg_event + 0.3 * volume)
}

/// Copies of `hosts` with `host_score` recomputed from `events`.
pub fn hosts_with_scores(events: &[Event], hosts: &[Host]) -> Vec<Host> {
    hosts
        .iter()
        .map(|host| Host {
            host_score: host_score(events.iter().filter(|e| e.host_id == host.id)),
            ..host.clone()
        })
        .collect()
}

/// Events whose host belongs to `college`. Events with an unknown host
/// belong to no college.
pub fn college_events<'a>(
    events: &'a [Event],
    hosts: &'a [Host],
    college: &'a College,
) -> impl Iterator<Item = &'a Event> + 'a {
    events.iter().filter(move |event| {
        hosts
            .iter()
            .find(|h| h.id == event.host_id)
            .is_some_and(|h| &h.college == college)
    })
}

/// Blends event quality (45%), host reliability (35%) and volume (20%).
/// `hosts` must already carry their host scores.
pub fn college_score(events: &[Event], hosts: &[Host], college: &College) -> f64 {
    let host_scores: Vec<f64> = hosts
        .iter()
        .filter(|h| &h.college == college)
        .map(|h| h.host_score)
        .collect();
    let host_avg = mean(&host_scores);

    let event_scores: Vec<f64> = college_events(events, hosts, college)
        .map(scored_event)
        .collect();
    let event_avg = mean(&event_scores);
    let volume = volume_bonus(event_scores.len(), COLLEGE_VOLUME_SCALE);

    clamp_score(0.45 * event_avg + 0.35 * host_avg + 0.20 * volume)
}
