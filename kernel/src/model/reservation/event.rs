use crate::model::{id::ReservationId, room::RoomNumber};
use chrono::{DateTime, NaiveDateTime, Utc};
use derive_new::new;

/// A booking request in the reserver's own wall-clock time.
#[derive(Debug, Clone, new)]
pub struct CreateReservation {
    pub room_number: RoomNumber,
    pub reservation_start: NaiveDateTime,
    pub reservation_end: NaiveDateTime,
    pub reserver_name: String,
    pub time_zone_id: String,
}

#[derive(Debug, Clone, new)]
pub struct UpdateReservation {
    pub reservation_id: ReservationId,
    pub room_number: RoomNumber,
    pub reservation_start: NaiveDateTime,
    pub reservation_end: NaiveDateTime,
    pub reserver_name: String,
    pub time_zone_id: String,
}

#[derive(Debug, Clone, Copy, new)]
pub struct DeleteReservation {
    pub reservation_id: ReservationId,
}

// ストアに渡す挿入用の型。時刻は UTC に正規化済み
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct NewReservation {
    pub room_number: RoomNumber,
    pub reservation_start: DateTime<Utc>,
    pub reservation_end: DateTime<Utc>,
    pub reserver_name: String,
    pub time_zone_id: String,
}
