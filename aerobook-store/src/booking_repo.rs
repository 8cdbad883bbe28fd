use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use aerobook_core::repository::BookingStore;
use aerobook_core::{CoreError, CoreResult};
use aerobook_shared::{Booking, BookingTrend, CabinClass, Money, PassengerHistory};

use crate::database::{storage_error, to_u32};

const BOOKING_COLUMNS: &str = r#"
    id, passenger_id, flight_id, class, seat_number, status, booked_at,
    checked_in, check_in_time, price_amount, price_currency,
    compensation_amount, compensation_currency, risk_score,
    is_cheapest_fare, upgraded_from, created_at, updated_at
"#;

pub struct PostgresBookingStore {
    pub pool: sqlx::PgPool,
}

impl PostgresBookingStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_many(&self, filter_column: &str, value: Uuid) -> CoreResult<Vec<Booking>> {
        let query = format!(
            "SELECT {} FROM bookings WHERE {} = $1 ORDER BY booked_at ASC, id ASC",
            BOOKING_COLUMNS, filter_column
        );
        let rows = sqlx::query(&query)
            .bind(value)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error("bookings", e))?;

        rows.iter().map(booking_from_row).collect()
    }
}

fn decode_error(column: &str, msg: String) -> CoreError {
    CoreError::StorageError(format!("bad value in bookings.{}: {}", column, msg))
}

fn booking_from_row(row: &PgRow) -> CoreResult<Booking> {
    let get_err = |e| storage_error("booking row", e);

    let class: String = row.try_get("class").map_err(get_err)?;
    let status: String = row.try_get("status").map_err(get_err)?;
    let upgraded_from: Option<String> = row.try_get("upgraded_from").map_err(get_err)?;
    let compensation_amount: Option<i64> = row.try_get("compensation_amount").map_err(get_err)?;
    let compensation_currency: Option<String> = row.try_get("compensation_currency").map_err(get_err)?;

    Ok(Booking {
        id: row.try_get("id").map_err(get_err)?,
        passenger_id: row.try_get("passenger_id").map_err(get_err)?,
        flight_id: row.try_get("flight_id").map_err(get_err)?,
        class: class.parse().map_err(|e| decode_error("class", e))?,
        seat_number: row.try_get("seat_number").map_err(get_err)?,
        status: status.parse().map_err(|e| decode_error("status", e))?,
        booked_at: row.try_get("booked_at").map_err(get_err)?,
        checked_in: row.try_get("checked_in").map_err(get_err)?,
        check_in_time: row.try_get("check_in_time").map_err(get_err)?,
        price: Money {
            amount: row.try_get("price_amount").map_err(get_err)?,
            currency: row.try_get("price_currency").map_err(get_err)?,
        },
        compensation: match (compensation_amount, compensation_currency) {
            (Some(amount), Some(currency)) => Some(Money { amount, currency }),
            _ => None,
        },
        risk_score: row.try_get("risk_score").map_err(get_err)?,
        is_cheapest_fare: row.try_get("is_cheapest_fare").map_err(get_err)?,
        upgraded_from: upgraded_from
            .map(|c| c.parse::<CabinClass>())
            .transpose()
            .map_err(|e| decode_error("upgraded_from", e))?,
        created_at: row.try_get("created_at").map_err(get_err)?,
        updated_at: row.try_get("updated_at").map_err(get_err)?,
    })
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    async fn create_booking(&self, booking: &Booking) -> CoreResult<()> {
        // Upsert so a retried create with the same id is harmless
        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, passenger_id, flight_id, class, seat_number, status, booked_at,
                checked_in, check_in_time, price_amount, price_currency,
                compensation_amount, compensation_currency, risk_score,
                is_cheapest_fare, upgraded_from, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (id) DO UPDATE SET
                class = EXCLUDED.class,
                seat_number = EXCLUDED.seat_number,
                status = EXCLUDED.status,
                risk_score = EXCLUDED.risk_score,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(booking.id)
        .bind(booking.passenger_id)
        .bind(booking.flight_id)
        .bind(booking.class.as_str())
        .bind(&booking.seat_number)
        .bind(booking.status.as_str())
        .bind(booking.booked_at)
        .bind(booking.checked_in)
        .bind(booking.check_in_time)
        .bind(booking.price.amount)
        .bind(&booking.price.currency)
        .bind(booking.compensation.as_ref().map(|m| m.amount))
        .bind(booking.compensation.as_ref().map(|m| m.currency.clone()))
        .bind(booking.risk_score)
        .bind(booking.is_cheapest_fare)
        .bind(booking.upgraded_from.map(|c| c.as_str()))
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| storage_error(&format!("booking {}", booking.id), e))?;

        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> CoreResult<Booking> {
        let query = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_error(&format!("booking {}", id), e))?;

        booking_from_row(&row)
    }

    async fn update_booking(&self, booking: &Booking) -> CoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET class = $2, seat_number = $3, status = $4, checked_in = $5, check_in_time = $6,
                compensation_amount = $7, compensation_currency = $8, risk_score = $9,
                upgraded_from = $10, updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(booking.id)
        .bind(booking.class.as_str())
        .bind(&booking.seat_number)
        .bind(booking.status.as_str())
        .bind(booking.checked_in)
        .bind(booking.check_in_time)
        .bind(booking.compensation.as_ref().map(|m| m.amount))
        .bind(booking.compensation.as_ref().map(|m| m.currency.clone()))
        .bind(booking.risk_score)
        .bind(booking.upgraded_from.map(|c| c.as_str()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| storage_error(&format!("booking {}", booking.id), e))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("booking {}", booking.id)));
        }
        Ok(())
    }

    async fn delete_booking(&self, id: Uuid) -> CoreResult<()> {
        sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error(&format!("booking {}", id), e))?;
        Ok(())
    }

    async fn list_by_passenger(&self, passenger_id: Uuid) -> CoreResult<Vec<Booking>> {
        self.fetch_many("passenger_id", passenger_id).await
    }

    async fn list_by_flight(&self, flight_id: Uuid) -> CoreResult<Vec<Booking>> {
        self.fetch_many("flight_id", flight_id).await
    }

    async fn passenger_history(&self, passenger_id: Uuid) -> CoreResult<PassengerHistory> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(frequent_flyer_tier, '') <> '' AS is_frequent_flyer, total_flights
            FROM passenger_profiles
            WHERE passenger_id = $1
            "#,
        )
        .bind(passenger_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("passenger history", e))?;

        let Some(row) = row else {
            return Ok(PassengerHistory::first_time(passenger_id));
        };

        Ok(PassengerHistory {
            passenger_id,
            is_frequent_flyer: row.try_get("is_frequent_flyer").map_err(|e| storage_error("passenger history", e))?,
            total_flights: to_u32(row.try_get("total_flights").map_err(|e| storage_error("passenger history", e))?),
        })
    }

    async fn booking_trend(&self, flight_id: Uuid) -> CoreResult<BookingTrend> {
        let bookings = self.list_by_flight(flight_id).await?;
        Ok(BookingTrend::from_bookings(flight_id, &bookings, Utc::now()))
    }
}
