use chrono::{DateTime, NaiveDateTime, Utc};
use derive_new::new;
use garde::Validate;
use kernel::model::{
    id::ReservationId,
    reservation::{
        event::{CreateReservation, UpdateReservation},
        LocalReservation, ReservationListOptions,
    },
    room::RoomNumber,
};
use serde::{Deserialize, Serialize};
use shared::error::AppError;

// 時刻は予約者のローカル時刻（タイムゾーン情報なし）で受け取る
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    #[garde(range(min = 1, max = 5))]
    pub room_number: i32,
    #[garde(skip)]
    pub reservation_start: NaiveDateTime,
    #[garde(skip)]
    pub reservation_end: NaiveDateTime,
    #[garde(length(chars, min = 1, max = 100))]
    pub reserver_name: String,
    #[garde(length(min = 1))]
    pub time_zone_id: String,
}

impl TryFrom<CreateReservationRequest> for CreateReservation {
    type Error = AppError;

    fn try_from(value: CreateReservationRequest) -> Result<Self, Self::Error> {
        let CreateReservationRequest {
            room_number,
            reservation_start,
            reservation_end,
            reserver_name,
            time_zone_id,
        } = value;
        Ok(CreateReservation::new(
            to_room_number(room_number)?,
            reservation_start,
            reservation_end,
            reserver_name,
            time_zone_id,
        ))
    }
}

// 予約データの更新用の型。更新可能な項目はすべて置き換える
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReservationRequest {
    #[garde(range(min = 1, max = 5))]
    pub room_number: i32,
    #[garde(skip)]
    pub reservation_start: NaiveDateTime,
    #[garde(skip)]
    pub reservation_end: NaiveDateTime,
    #[garde(length(chars, min = 1, max = 100))]
    pub reserver_name: String,
    #[garde(length(min = 1))]
    pub time_zone_id: String,
}

#[derive(new)]
pub struct UpdateReservationRequestWithId(ReservationId, UpdateReservationRequest);

impl TryFrom<UpdateReservationRequestWithId> for UpdateReservation {
    type Error = AppError;

    fn try_from(value: UpdateReservationRequestWithId) -> Result<Self, Self::Error> {
        let UpdateReservationRequestWithId(
            reservation_id,
            UpdateReservationRequest {
                room_number,
                reservation_start,
                reservation_end,
                reserver_name,
                time_zone_id,
            },
        ) = value;
        Ok(UpdateReservation::new(
            reservation_id,
            to_room_number(room_number)?,
            reservation_start,
            reservation_end,
            reserver_name,
            time_zone_id,
        ))
    }
}

fn to_room_number(raw: i32) -> Result<RoomNumber, AppError> {
    RoomNumber::try_from(raw).map_err(|e| AppError::UnprocessableEntity(e.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationListQuery {
    pub from: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl ReservationListQuery {
    // from が省略された場合は現在時刻以降を対象にする
    pub fn into_options(self, now: DateTime<Utc>) -> ReservationListOptions {
        ReservationListOptions::new(self.from.unwrap_or(now), self.page, self.page_size)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationsResponse {
    pub items: Vec<ReservationResponse>,
}

impl From<Vec<LocalReservation>> for ReservationsResponse {
    fn from(value: Vec<LocalReservation>) -> Self {
        Self {
            items: value.into_iter().map(ReservationResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedReservationResponse {
    pub page: i64,
    pub page_size: i64,
    pub items: Vec<ReservationResponse>,
}

impl PaginatedReservationResponse {
    pub fn new(options: &ReservationListOptions, items: Vec<LocalReservation>) -> Self {
        Self {
            page: options.page,
            page_size: options.page_size,
            items: items.into_iter().map(ReservationResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    pub id: ReservationId,
    pub room_number: RoomNumber,
    pub reservation_start: NaiveDateTime,
    pub reservation_end: NaiveDateTime,
    pub reserver_name: String,
    pub time_zone_id: String,
}

impl From<LocalReservation> for ReservationResponse {
    fn from(value: LocalReservation) -> Self {
        let LocalReservation {
            id,
            room_number,
            reservation_start,
            reservation_end,
            reserver_name,
            time_zone_id,
        } = value;
        Self {
            id,
            room_number,
            reservation_start,
            reservation_end,
            reserver_name,
            time_zone_id,
        }
    }
}
