use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::{Event, Host};
use crate::rankings::{college_leaderboard, host_leaderboard, medal};
use crate::reservation::reserved_label;
use crate::schedule::split_by_time;
use crate::scoring::{hosts_with_scores, scored_event};

const TOP_N: usize = 10;

pub fn build_report(events: &[Event], hosts: &[Host], now: DateTime<Utc>) -> String {
    let hosts = hosts_with_scores(events, hosts);
    let colleges = college_leaderboard(events, &hosts, now);
    let people = host_leaderboard(events, &hosts);
    let split = split_by_time(events, now);

    let mut output = String::new();

    let _ = writeln!(output, "# Campus Rankings Report");
    let _ = writeln!(
        output,
        "Generated {} from {} events across {} hosts",
        now.format("%Y-%m-%d %H:%M UTC"),
        events.len(),
        hosts.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## College Ranking");
    let _ = writeln!(
        output,
        "Score blends 45% event quality, 35% host reliability, 20% volume."
    );

    if colleges.is_empty() {
        let _ = writeln!(output, "No colleges with hosts yet.");
    } else {
        for (i, row) in colleges.iter().enumerate() {
            let _ = writeln!(
                output,
                "{} {} score {:.0} ({} events, {} rated past events)",
                medal(i),
                row.college,
                row.score,
                row.events,
                row.rated_past_events
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Personal Ranking");
    let _ = writeln!(
        output,
        "HostScore = 70% avg event score + 30% volume bonus."
    );

    if people.is_empty() {
        let _ = writeln!(output, "No hosts yet.");
    } else {
        for (i, row) in people.iter().take(TOP_N).enumerate() {
            let _ = writeln!(
                output,
                "{} {} ({}) score {:.0}: {} hosted, {} rated",
                medal(i),
                row.host_name,
                row.college,
                row.score,
                row.events,
                row.rated_events
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Upcoming");

    if split.future.is_empty() {
        let _ = writeln!(output, "Nothing scheduled.");
    } else {
        for event in split.future.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} on {} ({})",
                event.title,
                event.start_at.format("%a %b %-d %H:%M"),
                reserved_label(event.reservation_mode, event.reserved_count, event.capacity)
            );
        }
    }

    if !split.ongoing.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Live Now");
        for event in &split.ongoing {
            let _ = writeln!(output, "- {} until {}", event.title, event.end_at.format("%H:%M"));
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Events");

    if split.past.is_empty() {
        let _ = writeln!(output, "No past events.");
    } else {
        for event in split.past.iter().take(5) {
            if event.is_rated() {
                let _ = writeln!(
                    output,
                    "- {}: event score {:.0} from {} ratings",
                    event.title,
                    scored_event(event),
                    event.ratings.len()
                );
            } else {
                let _ = writeln!(output, "- {}: not rated yet", event.title);
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use uuid::Uuid;

    use super::*;
    use crate::models::{College, Rating, ReservationMode};

    #[test]
    fn report_lists_sections() {
        let now = Utc::now();
        let host = Host {
            id: Uuid::new_v4(),
            name: "Sam P.".to_string(),
            college: College::new("Will Rice"),
            verified: true,
            host_score: 0.0,
        };
        let start_at = now - Duration::days(9);
        let events = vec![Event {
            id: Uuid::new_v4(),
            title: "Vinyl & Cocoa Night".to_string(),
            host_id: host.id,
            start_at,
            end_at: start_at + Duration::hours(2),
            reservation_mode: ReservationMode::Open,
            capacity: Some(90),
            reserved_count: 0,
            ratings: vec![Rating::new(Uuid::new_v4(), 5, 4, 5, None, now).unwrap()],
        }];

        let report = build_report(&events, &[host], now);
        assert!(report.contains("## College Ranking"));
        assert!(report.contains("🥇 Will Rice"));
        assert!(report.contains("🥇 Sam P. (Will Rice)"));
        assert!(report.contains("Nothing scheduled."));
        assert!(report.contains("Vinyl & Cocoa Night: event score"));
        assert!(!report.contains("## Live Now"));
    }

    #[test]
    fn empty_report() {
        let report = build_report(&[], &[], Utc::now());
        assert!(report.contains("No colleges with hosts yet."));
        assert!(report.contains("No hosts yet."));
        assert!(report.contains("No past events."));
    }
}
