use std::collections::HashMap;

use anyhow::Context;
use chrono::{Duration, Utc};
use sqlx::{PgConnection, PgPool, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::import::{self, RatingRow};
use crate::models::{College, Event, Host, Rating, ReservationMode};
use crate::reservation::check_rating;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

const SEED_HOWARD: &str = "3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2";
const SEED_MAYA: &str = "0c22f1f1-9184-4fd4-9b21-28c68a6a89dc";
const SEED_ELI: &str = "d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2";
const SEED_SAM: &str = "6b1e0c7d-5f0a-4b8e-9d3c-2a7f4e1b8c90";

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let howard = Uuid::parse_str(SEED_HOWARD)?;
    let maya = Uuid::parse_str(SEED_MAYA)?;
    let eli = Uuid::parse_str(SEED_ELI)?;
    let sam = Uuid::parse_str(SEED_SAM)?;

    let hosts = vec![
        (howard, "Howard Zhao", "Jones", true),
        (maya, "Maya L.", "Brown", true),
        (eli, "Eli K.", "Martel", false),
        (sam, "Sam P.", "Will Rice", true),
    ];

    for (id, name, college, verified) in hosts {
        sqlx::query(
            r#"
            INSERT INTO campus_rankings.hosts (id, full_name, college, verified)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET full_name = EXCLUDED.full_name,
                college = EXCLUDED.college,
                verified = EXCLUDED.verified
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(college)
        .bind(verified)
        .execute(pool)
        .await?;
    }

    let now = Utc::now();
    let events = vec![
        (
            "seed-winter-glow",
            "Candlelit Rooftop: Winter Glow",
            howard,
            now + Duration::days(2) + Duration::hours(2),
            Duration::hours(3),
            true,
            Some(120),
            64,
        ),
        (
            "seed-study-break",
            "Study Break Pop-up",
            maya,
            now - Duration::hours(1),
            Duration::hours(3),
            false,
            Some(80),
            0,
        ),
        (
            "seed-neon-kitchen",
            "Neon Kitchen: Late-night Dumpling Party",
            maya,
            now - Duration::days(3) - Duration::hours(3),
            Duration::hours(3),
            false,
            Some(60),
            0,
        ),
        (
            "seed-silent-disco",
            "Silent Disco (Headphones Provided)",
            eli,
            now + Duration::days(6) + Duration::hours(1),
            Duration::hours(3),
            true,
            Some(200),
            143,
        ),
        (
            "seed-vinyl-cocoa",
            "Vinyl & Cocoa Night",
            sam,
            now - Duration::days(9) - Duration::hours(2),
            Duration::hours(2),
            false,
            Some(90),
            0,
        ),
    ];

    for (source_key, title, host_id, start_at, length, reservation_required, capacity, reserved) in
        events
    {
        sqlx::query(
            r#"
            INSERT INTO campus_rankings.events
            (id, title, host_id, start_at, end_at, reservation_required, capacity, reserved_count, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(host_id)
        .bind(start_at)
        .bind(start_at + length)
        .bind(reservation_required)
        .bind(capacity)
        .bind(reserved)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    let ratings = vec![
        ("seed-neon-kitchen", howard, 5, 5, 4, "Dumplings were elite.", Duration::days(3)),
        ("seed-neon-kitchen", sam, 4, 5, 5, "Great crowd.", Duration::days(3)),
        ("seed-vinyl-cocoa", maya, 5, 4, 5, "Perfect midterms reset.", Duration::days(9)),
    ];

    for (event_key, user_id, stars, vibe, safety, comment, ago) in ratings {
        let event_id: Uuid =
            sqlx::query("SELECT id FROM campus_rankings.events WHERE source_key = $1")
                .bind(event_key)
                .fetch_one(pool)
                .await?
                .get("id");

        sqlx::query(
            r#"
            INSERT INTO campus_rankings.ratings
            (id, event_id, user_id, stars, vibe, safety, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (event_id, user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event_id)
        .bind(user_id)
        .bind(stars as i16)
        .bind(vibe as i16)
        .bind(safety as i16)
        .bind(comment)
        .bind(now - ago)
        .execute(pool)
        .await?;
    }

    info!("seed data written");
    Ok(())
}

pub async fn fetch_hosts(pool: &PgPool) -> anyhow::Result<Vec<Host>> {
    let rows = sqlx::query(
        "SELECT id, full_name, college, verified FROM campus_rankings.hosts ORDER BY full_name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Host {
            id: row.get("id"),
            name: row.get("full_name"),
            college: College::new(row.get::<String, _>("college")),
            verified: row.get("verified"),
            host_score: 0.0,
        })
        .collect())
}

pub async fn fetch_host(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<Host>> {
    let row = sqlx::query(
        "SELECT id, full_name, college, verified FROM campus_rankings.hosts WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| Host {
        id: row.get("id"),
        name: row.get("full_name"),
        college: College::new(row.get::<String, _>("college")),
        verified: row.get("verified"),
        host_score: 0.0,
    }))
}

fn event_from_row(row: &sqlx::postgres::PgRow) -> anyhow::Result<Event> {
    let capacity: Option<i32> = row.get("capacity");
    let reserved: i32 = row.get("reserved_count");
    let reservation_required: bool = row.get("reservation_required");

    Ok(Event {
        id: row.get("id"),
        title: row.get("title"),
        host_id: row.get("host_id"),
        start_at: row.get("start_at"),
        end_at: row.get("end_at"),
        reservation_mode: if reservation_required {
            ReservationMode::ReservationRequired
        } else {
            ReservationMode::Open
        },
        capacity: capacity.map(u32::try_from).transpose().context("negative capacity")?,
        reserved_count: u32::try_from(reserved).context("negative reserved_count")?,
        ratings: Vec::new(),
    })
}

fn rating_from_row(row: &sqlx::postgres::PgRow) -> anyhow::Result<Rating> {
    let event_id: Uuid = row.get("event_id");
    let stars: i16 = row.get("stars");
    let vibe: i16 = row.get("vibe");
    let safety: i16 = row.get("safety");

    Rating::new(
        row.get("user_id"),
        u8::try_from(stars).unwrap_or(0),
        u8::try_from(vibe).unwrap_or(0),
        u8::try_from(safety).unwrap_or(0),
        row.get("comment"),
        row.get("created_at"),
    )
    .with_context(|| format!("stored rating for event {event_id} is invalid"))
}

/// Every event with its ratings, soonest first.
pub async fn fetch_events(pool: &PgPool) -> anyhow::Result<Vec<Event>> {
    let rows = sqlx::query(
        "SELECT id, title, host_id, start_at, end_at, reservation_required, capacity, reserved_count \
         FROM campus_rankings.events ORDER BY start_at",
    )
    .fetch_all(pool)
    .await?;

    let mut events = rows
        .iter()
        .map(event_from_row)
        .collect::<anyhow::Result<Vec<Event>>>()?;

    let rating_rows = sqlx::query(
        "SELECT event_id, user_id, stars, vibe, safety, comment, created_at \
         FROM campus_rankings.ratings ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    let index: HashMap<Uuid, usize> = events
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id, i))
        .collect();

    for row in rating_rows {
        let event_id: Uuid = row.get("event_id");
        let rating = rating_from_row(&row)?;
        if let Some(&i) = index.get(&event_id) {
            events[i].ratings.push(rating);
        }
    }

    debug!(events = events.len(), "fetched events");
    Ok(events)
}

pub async fn fetch_event(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<Event>> {
    let mut conn = pool.acquire().await?;
    fetch_event_on(&mut conn, id).await
}

async fn fetch_event_on(conn: &mut PgConnection, id: Uuid) -> anyhow::Result<Option<Event>> {
    let Some(row) = sqlx::query(
        "SELECT id, title, host_id, start_at, end_at, reservation_required, capacity, reserved_count \
         FROM campus_rankings.events WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    else {
        return Ok(None);
    };

    let mut event = event_from_row(&row)?;
    let rating_rows = sqlx::query(
        "SELECT event_id, user_id, stars, vibe, safety, comment, created_at \
         FROM campus_rankings.ratings WHERE event_id = $1 ORDER BY created_at DESC",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    event.ratings = rating_rows
        .iter()
        .map(rating_from_row)
        .collect::<anyhow::Result<Vec<Rating>>>()?;
    Ok(Some(event))
}

/// Stores a new reserved count, refusing to move it if someone else
/// reserved in the meantime.
pub async fn store_reserved_count(
    pool: &PgPool,
    event_id: Uuid,
    previous: u32,
    reserved: u32,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE campus_rankings.events
        SET reserved_count = $3
        WHERE id = $1 AND reserved_count = $2
        "#,
    )
    .bind(event_id)
    .bind(previous as i32)
    .bind(reserved as i32)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn insert_rating(
    conn: &mut PgConnection,
    event_id: Uuid,
    rating: &Rating,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO campus_rankings.ratings
        (id, event_id, user_id, stars, vibe, safety, comment, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (event_id, user_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(event_id)
    .bind(rating.user_id)
    .bind(i16::from(rating.stars))
    .bind(i16::from(rating.vibe))
    .bind(i16::from(rating.safety))
    .bind(&rating.comment)
    .bind(rating.created_at)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Imports a ratings CSV in one transaction. Same admission rules as
/// `import::attach_ratings`: unknown or unfinished events are skipped, an
/// invalid row aborts the whole import, and the first rating per user wins.
pub async fn import_ratings_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let rows: Vec<RatingRow> = import::read_ratings(file)?;
    let now = Utc::now();
    let mut events: HashMap<Uuid, Option<Event>> = HashMap::new();
    let mut inserted = 0usize;

    let mut tx = pool.begin().await?;

    for row in rows {
        let (event_id, rating) = row.into_rating()?;

        if !events.contains_key(&event_id) {
            let fetched = fetch_event_on(&mut tx, event_id).await?;
            events.insert(event_id, fetched);
        }
        let Some(event) = events.get(&event_id).and_then(Option::as_ref) else {
            warn!(%event_id, "rating for unknown event skipped");
            continue;
        };
        if let Err(e) = check_rating(event, now) {
            warn!(%event_id, user_id = %rating.user_id, "rating skipped: {e}");
            continue;
        }

        if insert_rating(&mut tx, event_id, &rating).await? {
            inserted += 1;
        } else {
            debug!(%event_id, user_id = %rating.user_id, "duplicate rating skipped");
        }
    }

    tx.commit().await?;
    info!(inserted, "ratings imported");
    Ok(inserted)
}
