use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{RatingError, ReservationError};
use crate::models::{Event, ReservationMode};
use crate::schedule::EventPhase;

/// The person acting on an event. Passed explicitly by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: Uuid,
    pub verified: bool,
}

/// Reservation-required events are campus-only: a viewer must be verified,
/// the event must not have started and must have room left.
pub fn check_reservation(
    viewer: &Viewer,
    event: &Event,
    now: DateTime<Utc>,
) -> Result<(), ReservationError> {
    if event.reservation_mode != ReservationMode::ReservationRequired {
        return Err(ReservationError::NotReservable);
    }
    if EventPhase::of(event, now) != EventPhase::Future {
        return Err(ReservationError::AlreadyStarted);
    }
    if !viewer.verified {
        return Err(ReservationError::Unverified);
    }
    if let Some(capacity) = event.capacity.filter(|c| *c > 0) {
        if event.reserved_count >= capacity {
            return Err(ReservationError::AtCapacity { capacity });
        }
    }
    Ok(())
}

/// Ratings only count once an event is over, so hosts cannot collect
/// reviews before anyone has attended.
pub fn check_rating(event: &Event, now: DateTime<Utc>) -> Result<(), RatingError> {
    match EventPhase::of(event, now) {
        EventPhase::Past => Ok(()),
        EventPhase::Future | EventPhase::Ongoing => Err(RatingError::NotEnded),
    }
}

/// Checks the policy and takes one seat. Returns the new reserved count.
pub fn reserve(
    viewer: &Viewer,
    event: &mut Event,
    now: DateTime<Utc>,
) -> Result<u32, ReservationError> {
    check_reservation(viewer, event, now)?;
    event.reserved_count += 1;
    tracing::debug!(
        event_id = %event.id,
        user_id = %viewer.user_id,
        reserved = event.reserved_count,
        "reservation taken"
    );
    Ok(event.reserved_count)
}

pub fn reserved_label(mode: ReservationMode, reserved: u32, capacity: Option<u32>) -> String {
    match (mode, capacity.filter(|c| *c > 0)) {
        (ReservationMode::Open, _) => "Open: walk in".to_string(),
        (ReservationMode::ReservationRequired, None) => format!("{reserved} reserved"),
        (ReservationMode::ReservationRequired, Some(capacity)) => {
            format!("{reserved}/{capacity} reserved")
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn upcoming(mode: ReservationMode, capacity: Option<u32>, reserved: u32) -> Event {
        let start_at = Utc::now() + Duration::days(2);
        Event {
            id: Uuid::new_v4(),
            title: "Candlelit Rooftop".to_string(),
            host_id: Uuid::new_v4(),
            start_at,
            end_at: start_at + Duration::hours(3),
            reservation_mode: mode,
            capacity,
            reserved_count: reserved,
            ratings: Vec::new(),
        }
    }

    fn viewer(verified: bool) -> Viewer {
        Viewer {
            user_id: Uuid::new_v4(),
            verified,
        }
    }

    #[test]
    fn verified_viewer_can_reserve() {
        let mut event = upcoming(ReservationMode::ReservationRequired, Some(120), 64);
        let count = reserve(&viewer(true), &mut event, Utc::now()).unwrap();
        assert_eq!(count, 65);
        assert_eq!(event.reserved_count, 65);
    }

    #[test]
    fn unverified_viewer_is_rejected() {
        let mut event = upcoming(ReservationMode::ReservationRequired, Some(120), 64);
        let err = reserve(&viewer(false), &mut event, Utc::now()).unwrap_err();
        assert_eq!(err, ReservationError::Unverified);
        assert_eq!(event.reserved_count, 64);
    }

    #[test]
    fn open_events_are_not_reservable() {
        let event = upcoming(ReservationMode::Open, Some(80), 0);
        assert_eq!(
            check_reservation(&viewer(true), &event, Utc::now()),
            Err(ReservationError::NotReservable)
        );
    }

    #[test]
    fn full_events_are_rejected() {
        let event = upcoming(ReservationMode::ReservationRequired, Some(10), 10);
        assert_eq!(
            check_reservation(&viewer(true), &event, Utc::now()),
            Err(ReservationError::AtCapacity { capacity: 10 })
        );

        let unlimited = upcoming(ReservationMode::ReservationRequired, None, 500);
        assert!(check_reservation(&viewer(true), &unlimited, Utc::now()).is_ok());
    }

    #[test]
    fn started_events_are_rejected() {
        let event = upcoming(ReservationMode::ReservationRequired, None, 0);
        let later = event.start_at + Duration::minutes(5);
        assert_eq!(
            check_reservation(&viewer(true), &event, later),
            Err(ReservationError::AlreadyStarted)
        );
    }

    #[test]
    fn zero_capacity_means_unlimited() {
        let event = upcoming(ReservationMode::ReservationRequired, Some(0), 37);
        assert!(check_reservation(&viewer(true), &event, Utc::now()).is_ok());
        assert_eq!(
            reserved_label(ReservationMode::ReservationRequired, 37, Some(0)),
            "37 reserved"
        );
    }

    #[test]
    fn ratings_wait_for_the_event_to_end() {
        let event = upcoming(ReservationMode::Open, None, 0);
        assert_eq!(check_rating(&event, Utc::now()), Err(RatingError::NotEnded));

        let during = event.start_at + Duration::hours(1);
        assert_eq!(check_rating(&event, during), Err(RatingError::NotEnded));
        assert_eq!(check_rating(&event, event.end_at), Err(RatingError::NotEnded));

        let after = event.end_at + Duration::seconds(1);
        assert!(check_rating(&event, after).is_ok());
    }

    #[test]
    fn labels() {
        assert_eq!(reserved_label(ReservationMode::Open, 3, Some(10)), "Open: walk in");
        assert_eq!(
            reserved_label(ReservationMode::ReservationRequired, 3, None),
            "3 reserved"
        );
        assert_eq!(
            reserved_label(ReservationMode::ReservationRequired, 64, Some(120)),
            "64/120 reserved"
        );
    }
}
