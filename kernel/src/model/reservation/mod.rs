use crate::model::{id::ReservationId, room::RoomNumber};
use chrono::{DateTime, NaiveDateTime, Utc};
use derive_new::new;

pub mod event;

/// A reservation as persisted: absolute instants plus the zone it was booked from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub id: ReservationId,
    pub room_number: RoomNumber,
    pub reservation_start: DateTime<Utc>,
    pub reservation_end: DateTime<Utc>,
    pub reserver_name: String,
    pub time_zone_id: String,
}

impl Reservation {
    pub fn window(&self) -> ReservationWindow {
        ReservationWindow::new(
            self.room_number,
            self.reservation_start,
            self.reservation_end,
        )
    }
}

/// The part of a reservation the conflict check looks at.
/// The interval is half-open: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct ReservationWindow {
    pub room_number: RoomNumber,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReservationWindow {
    pub fn overlaps(&self, other: &ReservationWindow) -> bool {
        self.room_number == other.room_number && other.start < self.end && other.end > self.start
    }
}

/// A reservation projected back into the wall-clock time of its `time_zone_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalReservation {
    pub id: ReservationId,
    pub room_number: RoomNumber,
    pub reservation_start: NaiveDateTime,
    pub reservation_end: NaiveDateTime,
    pub reserver_name: String,
    pub time_zone_id: String,
}

// ページネーションの範囲を指定するための設定値を格納する型
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationListOptions {
    pub from: DateTime<Utc>,
    pub page: i64,
    pub page_size: i64,
}

impl ReservationListOptions {
    pub const DEFAULT_PAGE: i64 = 1;
    pub const DEFAULT_PAGE_SIZE: i64 = 10;

    /// Values below 1 (or missing) fall back to the defaults.
    pub fn new(from: DateTime<Utc>, page: Option<i64>, page_size: Option<i64>) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(Self::DEFAULT_PAGE);
        let page_size = page_size
            .filter(|s| *s >= 1)
            .unwrap_or(Self::DEFAULT_PAGE_SIZE);
        Self {
            from,
            page,
            page_size,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }
}
