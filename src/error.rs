use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must be between 1 and 5, got {value}")]
    OutOfRange { field: &'static str, value: u8 },

    #[error("event ends before it starts")]
    EndsBeforeStart,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReservationError {
    #[error("Event does not take reservations")]
    NotReservable,

    #[error("Event has already started")]
    AlreadyStarted,

    #[error("Verify your campus email to reserve this event")]
    Unverified,

    #[error("Event is full ({capacity} reserved)")]
    AtCapacity { capacity: u32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RatingError {
    #[error("Ratings unlock after the event ends")]
    NotEnded,
}
