use crate::extractor::{Json, Path, Query};
use crate::model::reservation::{
    CreateReservationRequest, PaginatedReservationResponse, ReservationListQuery,
    ReservationResponse, ReservationsResponse, UpdateReservationRequest,
    UpdateReservationRequestWithId,
};
use axum::{extract::State, http::StatusCode};
use chrono::Utc;
use garde::Validate;
use kernel::model::{
    id::ReservationId,
    reservation::event::{CreateReservation, DeleteReservation, UpdateReservation},
};
use registry::AppRegistry;
use shared::error::AppResult;

pub async fn register_reservation(
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateReservationRequest>,
) -> AppResult<(StatusCode, Json<ReservationResponse>)> {
    req.validate(&())?;

    let event = CreateReservation::try_from(req)?;
    registry
        .reservation_service()
        .create(event)
        .await
        .map(ReservationResponse::from)
        .map(|res| (StatusCode::CREATED, Json(res)))
}

pub async fn show_reservation_list(
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ReservationsResponse>> {
    registry
        .reservation_service()
        .list()
        .await
        .map(ReservationsResponse::from)
        .map(Json)
}

pub async fn show_reservation_page(
    Query(query): Query<ReservationListQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<PaginatedReservationResponse>> {
    let options = query.into_options(Utc::now());
    let items = registry
        .reservation_service()
        .list_next(options.clone())
        .await?;
    Ok(Json(PaginatedReservationResponse::new(&options, items)))
}

pub async fn show_reservation(
    Path(reservation_id): Path<ReservationId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ReservationResponse>> {
    registry
        .reservation_service()
        .get(reservation_id)
        .await
        .map(ReservationResponse::from)
        .map(Json)
}

pub async fn update_reservation(
    Path(reservation_id): Path<ReservationId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<UpdateReservationRequest>,
) -> AppResult<Json<ReservationResponse>> {
    req.validate(&())?;

    let event =
        UpdateReservation::try_from(UpdateReservationRequestWithId::new(reservation_id, req))?;
    registry
        .reservation_service()
        .update(event)
        .await
        .map(ReservationResponse::from)
        .map(Json)
}

pub async fn delete_reservation(
    Path(reservation_id): Path<ReservationId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    registry
        .reservation_service()
        .delete(DeleteReservation::new(reservation_id))
        .await
        .map(|_| StatusCode::NO_CONTENT)
}
