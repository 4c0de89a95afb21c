use kernel::model::{id::ReservationId, reservation::Reservation, room::RoomNumber};
use shared::error::AppError;
use sqlx::types::chrono::{DateTime, Utc};

// reservations テーブルの 1 行。時刻は UTC のまま保持し、ローカル時刻は持たない
#[derive(Debug, sqlx::FromRow)]
pub struct ReservationRow {
    pub reservation_id: i64,
    pub room_number: i32,
    pub reservation_start: DateTime<Utc>,
    pub reservation_end: DateTime<Utc>,
    pub reserver_name: String,
    pub time_zone_id: String,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = AppError;

    fn try_from(value: ReservationRow) -> Result<Self, Self::Error> {
        let ReservationRow {
            reservation_id,
            room_number,
            reservation_start,
            reservation_end,
            reserver_name,
            time_zone_id,
        } = value;
        let room_number = RoomNumber::try_from(room_number).map_err(|e| {
            AppError::ConversionEntityError(format!("reservation {reservation_id}: {e}"))
        })?;
        Ok(Reservation {
            id: ReservationId::new(reservation_id),
            room_number,
            reservation_start,
            reservation_end,
            reserver_name,
            time_zone_id,
        })
    }
}
