use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use aerobook_catalog::{Flight, SeatPool};
use aerobook_core::repository::FlightCatalog;
use aerobook_core::search::SearchRequest;
use aerobook_core::{CoreError, CoreResult};
use aerobook_shared::{HistoricalRouteStats, Money};

use crate::database::{storage_error, to_u32};

const FLIGHT_COLUMNS: &str = r#"
    id, flight_number, origin, destination, departure_time,
    base_fare_amount, base_fare_currency,
    economy_total, economy_booked, economy_ratio,
    business_total, business_booked, business_ratio,
    first_total, first_booked, first_ratio
"#;

pub struct PostgresFlightCatalog {
    pub pool: sqlx::PgPool,
}

impl PostgresFlightCatalog {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

fn pool_from_row(row: &PgRow, prefix: &str) -> Result<SeatPool, sqlx::Error> {
    Ok(SeatPool {
        total: to_u32(row.try_get(format!("{}_total", prefix).as_str())?),
        booked: to_u32(row.try_get(format!("{}_booked", prefix).as_str())?),
        overbooking_ratio: row.try_get(format!("{}_ratio", prefix).as_str())?,
    })
}

fn flight_from_row(row: &PgRow) -> Result<Flight, sqlx::Error> {
    Ok(Flight {
        id: row.try_get("id")?,
        flight_number: row.try_get("flight_number")?,
        origin: row.try_get("origin")?,
        destination: row.try_get("destination")?,
        departure_time: row.try_get("departure_time")?,
        base_fare: Money {
            amount: row.try_get("base_fare_amount")?,
            currency: row.try_get("base_fare_currency")?,
        },
        economy: pool_from_row(row, "economy")?,
        business: pool_from_row(row, "business")?,
        first: pool_from_row(row, "first")?,
    })
}

#[async_trait]
impl FlightCatalog for PostgresFlightCatalog {
    async fn search_flights(&self, request: &SearchRequest) -> CoreResult<Vec<Flight>> {
        let query = format!(
            r#"
            SELECT {}
            FROM flights
            WHERE origin = $1 AND destination = $2 AND DATE(departure_time) = $3
            ORDER BY departure_time ASC, id ASC
            LIMIT $4 OFFSET $5
            "#,
            FLIGHT_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(&request.origin)
            .bind(&request.destination)
            .bind(request.date)
            .bind(request.limit() as i64)
            .bind(request.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error("flight search", e))?;

        rows.iter()
            .map(flight_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| storage_error("flight search", e))
    }

    async fn get_flight(&self, id: Uuid) -> CoreResult<Flight> {
        let query = format!("SELECT {} FROM flights WHERE id = $1", FLIGHT_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_error(&format!("flight {}", id), e))?;

        flight_from_row(&row).map_err(|e| storage_error(&format!("flight {}", id), e))
    }

    async fn update_flight(&self, flight: &Flight) -> CoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE flights
            SET flight_number = $2, origin = $3, destination = $4, departure_time = $5,
                base_fare_amount = $6, base_fare_currency = $7,
                economy_total = $8, economy_booked = $9, economy_ratio = $10,
                business_total = $11, business_booked = $12, business_ratio = $13,
                first_total = $14, first_booked = $15, first_ratio = $16
            WHERE id = $1
            "#,
        )
        .bind(flight.id)
        .bind(&flight.flight_number)
        .bind(&flight.origin)
        .bind(&flight.destination)
        .bind(flight.departure_time)
        .bind(flight.base_fare.amount)
        .bind(&flight.base_fare.currency)
        .bind(flight.economy.total as i32)
        .bind(flight.economy.booked as i32)
        .bind(flight.economy.overbooking_ratio)
        .bind(flight.business.total as i32)
        .bind(flight.business.booked as i32)
        .bind(flight.business.overbooking_ratio)
        .bind(flight.first.total as i32)
        .bind(flight.first.booked as i32)
        .bind(flight.first.overbooking_ratio)
        .execute(&self.pool)
        .await
        .map_err(|e| storage_error(&format!("flight {}", flight.id), e))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("flight {}", flight.id)));
        }
        Ok(())
    }

    async fn historical_stats(&self, route: &str, day_of_week: u32) -> CoreResult<HistoricalRouteStats> {
        let row = sqlx::query(
            r#"
            SELECT AVG(no_show_rate)::float8 AS no_show_rate, AVG(booking_rate)::float8 AS booking_rate
            FROM route_statistics
            WHERE route = $1 AND day_of_week = $2
            "#,
        )
        .bind(route)
        .bind(day_of_week as i32)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage_error("route statistics", e))?;

        let no_show: Option<f64> = row.try_get("no_show_rate").map_err(|e| storage_error("route statistics", e))?;
        let booking: Option<f64> = row.try_get("booking_rate").map_err(|e| storage_error("route statistics", e))?;

        match (no_show, booking) {
            (Some(average_no_show_rate), Some(average_booking_rate)) => Ok(HistoricalRouteStats {
                route: route.to_string(),
                day_of_week,
                average_no_show_rate,
                average_booking_rate,
            }),
            _ => Err(CoreError::NotFound(format!("statistics for {} on day {}", route, day_of_week))),
        }
    }
}
