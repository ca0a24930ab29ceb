//! Reputation and ranking engine for campus events.
//!
//! Ratings roll up into an event score, event scores into a host score and
//! host plus event scores into a college score. Events are also split into
//! future, ongoing and past relative to a reference time.
//!
//! Every scoring function is pure: callers hand in the rows they fetched
//! and recompute whenever those rows change.

pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod rankings;
pub mod report;
pub mod reservation;
pub mod schedule;
pub mod scoring;
