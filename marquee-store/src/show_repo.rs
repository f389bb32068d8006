use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marquee_core::{Booking, BookingStatus, BookingWrite, SaveOutcome, SeatState, Show, ShowRepository};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

/// PostgreSQL-backed show and booking store.
///
/// The seat map lives in one JSONB column next to a version counter; a save is
/// a conditional `UPDATE ... WHERE version = $expected` plus the booking write,
/// all inside one transaction.
pub struct PostgresShowRepository {
    pool: PgPool,
}

impl PostgresShowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ShowRow {
    id: Uuid,
    venue_name: String,
    show_time: String,
    price: i64,
    seats: Json<BTreeMap<String, SeatState>>,
    version: i64,
}

impl From<ShowRow> for Show {
    fn from(row: ShowRow) -> Self {
        Show {
            id: row.id,
            venue_name: row.venue_name,
            show_time: row.show_time,
            price: row.price,
            seats: row.seats.0,
            version: row.version.max(0) as u64,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    show_id: Uuid,
    user_id: String,
    seats: Vec<String>,
    unit_price: i64,
    amount: i64,
    status: String,
    venue_name: String,
    show_time: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = Box<dyn std::error::Error + Send + Sync>;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = BookingStatus::parse(&row.status)
            .ok_or_else(|| format!("Unknown booking status: {}", row.status))?;
        Ok(Booking {
            id: row.id,
            show_id: row.show_id,
            user_id: row.user_id,
            seats: row.seats,
            unit_price: row.unit_price,
            amount: row.amount,
            status,
            venue_name: row.venue_name,
            show_time: row.show_time,
            created_at: row.created_at,
        })
    }
}

async fn write_booking(
    tx: &mut Transaction<'_, Postgres>,
    write: &BookingWrite,
) -> Result<(), sqlx::Error> {
    match write {
        BookingWrite::Insert(b) => {
            sqlx::query(
                r#"
                INSERT INTO bookings (id, show_id, user_id, seats, unit_price, amount, status, venue_name, show_time, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(b.id)
            .bind(b.show_id)
            .bind(&b.user_id)
            .bind(&b.seats)
            .bind(b.unit_price)
            .bind(b.amount)
            .bind(b.status.as_str())
            .bind(&b.venue_name)
            .bind(&b.show_time)
            .bind(b.created_at)
            .execute(&mut **tx)
            .await?;
        }
        BookingWrite::Remove(id) => {
            sqlx::query("DELETE FROM bookings WHERE id = $1")
                .bind(id)
                .execute(&mut **tx)
                .await?;
        }
    }
    Ok(())
}

#[async_trait]
impl ShowRepository for PostgresShowRepository {
    async fn insert_show(
        &self,
        show: &Show,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            INSERT INTO shows (id, venue_name, show_time, price, seats, version)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(show.id)
        .bind(&show.venue_name)
        .bind(&show.show_time)
        .bind(show.price)
        .bind(Json(&show.seats))
        .bind(show.version as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_show(
        &self,
        show_id: Uuid,
    ) -> Result<Option<Show>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, ShowRow>(
            "SELECT id, venue_name, show_time, price, seats, version FROM shows WHERE id = $1",
        )
        .bind(show_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Show::from))
    }

    async fn list_show_ids(
        &self,
    ) -> Result<Vec<Uuid>, Box<dyn std::error::Error + Send + Sync>> {
        let ids: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM shows")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn save_show(
        &self,
        show: &Show,
        expected_version: u64,
        booking: Option<&BookingWrite>,
    ) -> Result<SaveOutcome, Box<dyn std::error::Error + Send + Sync>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE shows SET seats = $1, version = $2 WHERE id = $3 AND version = $4",
        )
        .bind(Json(&show.seats))
        .bind((expected_version + 1) as i64)
        .bind(show.id)
        .bind(expected_version as i64)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            debug!("Version conflict on show {} (expected {})", show.id, expected_version);
            tx.rollback().await?;
            return Ok(SaveOutcome::Conflict);
        }

        if let Some(write) = booking {
            write_booking(&mut tx, write).await?;
        }

        tx.commit().await?;
        Ok(SaveOutcome::Saved)
    }

    async fn get_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT id, show_id, user_id, seats, unit_price, amount, status, venue_name, show_time, created_at
            FROM bookings WHERE id = $1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Booking::try_from).transpose()
    }

    async fn list_bookings(
        &self,
        user_id: &str,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT id, show_id, user_id, seats, unit_price, amount, status, venue_name, show_time, created_at
            FROM bookings WHERE user_id = $1 ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Booking::try_from).collect()
    }
}
