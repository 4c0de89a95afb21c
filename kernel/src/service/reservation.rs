use crate::{
    model::{
        id::ReservationId,
        reservation::{
            event::{CreateReservation, DeleteReservation, NewReservation, UpdateReservation},
            LocalReservation, Reservation, ReservationListOptions, ReservationWindow,
        },
    },
    repository::reservation::ReservationRepository,
    time, validator,
};
use chrono::{DateTime, Utc};
use shared::error::{AppError, AppResult};
use std::sync::Arc;

pub type Clock = fn() -> DateTime<Utc>;

/// Runs each request through time zone resolution, validation against the
/// room's current reservations, the store write, and projection back to local time.
pub struct ReservationService {
    repository: Arc<dyn ReservationRepository>,
    commit_retries: u32,
    clock: Clock,
}

impl ReservationService {
    pub fn new(repository: Arc<dyn ReservationRepository>, commit_retries: u32) -> Self {
        Self {
            repository,
            commit_retries,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub async fn create(&self, event: CreateReservation) -> AppResult<LocalReservation> {
        let tz = time::validate_time_zone(&event.time_zone_id)?;
        let window = ReservationWindow::new(
            event.room_number,
            time::to_utc(event.reservation_start, tz)?,
            time::to_utc(event.reservation_end, tz)?,
        );

        let mut attempt = 0;
        loop {
            let existing = self.repository.find_by_room(window.room_number).await?;
            validator::validate_at(&window, &existing, None, (self.clock)())?;

            let new_reservation = NewReservation::new(
                window.room_number,
                window.start,
                window.end,
                event.reserver_name.clone(),
                event.time_zone_id.clone(),
            );
            match self.repository.insert(new_reservation).await {
                Ok(reservation) => {
                    tracing::info!(
                        reservation.id = %reservation.id,
                        reservation.room = %reservation.room_number,
                        "reservation created"
                    );
                    return project(reservation);
                }
                Err(e) if e.is_retryable() && attempt < self.commit_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, error.message = %e, "retrying reservation create");
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn update(&self, event: UpdateReservation) -> AppResult<LocalReservation> {
        let tz = time::validate_time_zone(&event.time_zone_id)?;
        let id = event.reservation_id;
        let updated = Reservation {
            id,
            room_number: event.room_number,
            reservation_start: time::to_utc(event.reservation_start, tz)?,
            reservation_end: time::to_utc(event.reservation_end, tz)?,
            reserver_name: event.reserver_name,
            time_zone_id: event.time_zone_id,
        };

        let mut attempt = 0;
        loop {
            if self.repository.find_by_id(id).await?.is_none() {
                return Err(not_found(id));
            }

            let existing = self.repository.find_by_room(updated.room_number).await?;
            validator::validate_at(&updated.window(), &existing, Some(id), (self.clock)())?;

            match self.repository.update(updated.clone()).await {
                Ok(()) => {
                    tracing::info!(
                        reservation.id = %id,
                        reservation.room = %updated.room_number,
                        "reservation updated"
                    );
                    return project(updated);
                }
                Err(e) if e.is_retryable() => {
                    // 競合後に削除されていた場合は NotFound として扱う
                    if attempt >= self.commit_retries {
                        return match self.repository.find_by_id(id).await? {
                            None => Err(not_found(id)),
                            Some(_) => Err(e),
                        };
                    }
                    attempt += 1;
                    tracing::warn!(attempt, reservation.id = %id, "retrying reservation update");
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn get(&self, id: ReservationId) -> AppResult<LocalReservation> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))
            .and_then(project)
    }

    pub async fn list(&self) -> AppResult<Vec<LocalReservation>> {
        self.repository
            .find_all()
            .await?
            .into_iter()
            .map(project)
            .collect()
    }

    pub async fn list_next(&self, options: ReservationListOptions) -> AppResult<Vec<LocalReservation>> {
        self.repository
            .list_paged(options)
            .await?
            .into_iter()
            .map(project)
            .collect()
    }

    pub async fn delete(&self, event: DeleteReservation) -> AppResult<()> {
        self.repository.delete(event.reservation_id).await?;
        tracing::info!(reservation.id = %event.reservation_id, "reservation deleted");
        Ok(())
    }
}

fn not_found(id: ReservationId) -> AppError {
    AppError::EntityNotFound(format!("reservation {id} was not found"))
}

// 保存済みの time_zone_id は登録時に検証済み。ここで解決できないのはデータ側の不整合
fn project(reservation: Reservation) -> AppResult<LocalReservation> {
    let id = reservation.id;
    let tz = time::validate_time_zone(&reservation.time_zone_id)
        .map_err(|e| AppError::ConversionEntityError(format!("reservation {id}: {e}")))?;
    let to_local = |instant: DateTime<Utc>| {
        time::from_utc(instant, tz).ok_or_else(|| {
            AppError::ConversionEntityError(format!(
                "reservation {id}: {instant} has no local time in {tz}"
            ))
        })
    };
    Ok(LocalReservation {
        id,
        room_number: reservation.room_number,
        reservation_start: to_local(reservation.reservation_start)?,
        reservation_end: to_local(reservation.reservation_end)?,
        reserver_name: reservation.reserver_name,
        time_zone_id: reservation.time_zone_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::room::RoomNumber, repository::reservation::MockReservationRepository};
    use chrono::{NaiveDate, NaiveDateTime, TimeZone};
    use mockall::predicate::eq;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap()
    }

    fn local(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, d, h, m, 0).unwrap()
    }

    fn room(n: i32) -> RoomNumber {
        RoomNumber::try_from(n).unwrap()
    }

    fn stored(id: i64, room_number: i32, start: DateTime<Utc>, end: DateTime<Utc>) -> Reservation {
        Reservation {
            id: ReservationId::new(id),
            room_number: room(room_number),
            reservation_start: start,
            reservation_end: end,
            reserver_name: "Aino".into(),
            time_zone_id: "Europe/Helsinki".into(),
        }
    }

    fn service(repo: MockReservationRepository) -> ReservationService {
        ReservationService::new(Arc::new(repo), 2).with_clock(fixed_now)
    }

    fn helsinki_request(room_number: i32, start: NaiveDateTime, end: NaiveDateTime) -> CreateReservation {
        CreateReservation::new(
            room(room_number),
            start,
            end,
            "Aino".into(),
            "Europe/Helsinki".into(),
        )
    }

    #[tokio::test]
    async fn create_stores_utc_and_returns_local_time() {
        let mut repo = MockReservationRepository::new();
        repo.expect_find_by_room()
            .with(eq(room(1)))
            .returning(|_| Ok(vec![]));
        repo.expect_insert()
            .withf(|e| e.reservation_start == utc(1, 6, 0) && e.reservation_end == utc(1, 7, 0))
            .times(1)
            .returning(|e| {
                Ok(Reservation {
                    id: ReservationId::new(1),
                    room_number: e.room_number,
                    reservation_start: e.reservation_start,
                    reservation_end: e.reservation_end,
                    reserver_name: e.reserver_name,
                    time_zone_id: e.time_zone_id,
                })
            });

        let created = service(repo)
            .create(helsinki_request(1, local(1, 9, 0), local(1, 10, 0)))
            .await
            .unwrap();
        assert_eq!(created.id, ReservationId::new(1));
        assert_eq!(created.reservation_start, local(1, 9, 0));
        assert_eq!(created.reservation_end, local(1, 10, 0));
        assert_eq!(created.time_zone_id, "Europe/Helsinki");
    }

    #[tokio::test]
    async fn get_projects_back_to_the_reservers_zone() {
        let mut repo = MockReservationRepository::new();
        repo.expect_find_by_id()
            .with(eq(ReservationId::new(1)))
            .returning(|_| Ok(Some(stored(1, 1, utc(1, 6, 0), utc(1, 7, 0)))));

        let found = service(repo).get(ReservationId::new(1)).await.unwrap();
        assert_eq!(found.reservation_start, local(1, 9, 0));
        assert_eq!(found.time_zone_id, "Europe/Helsinki");
    }

    #[tokio::test]
    async fn unknown_time_zone_is_rejected_before_touching_the_store() {
        let repo = MockReservationRepository::new();
        let mut request = helsinki_request(1, local(1, 10, 0), local(1, 9, 0));
        request.time_zone_id = "Mars/Phobos".into();

        let err = service(repo).create(request).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTimeZone(ref m) if m.contains("Mars/Phobos")));
    }

    #[tokio::test]
    async fn overlapping_create_is_rejected() {
        let mut repo = MockReservationRepository::new();
        repo.expect_find_by_room()
            .returning(|_| Ok(vec![stored(7, 3, utc(1, 9, 0), utc(1, 10, 0))]));
        repo.expect_insert().never();

        let mut request = helsinki_request(3, local(1, 9, 30), local(1, 9, 45));
        request.time_zone_id = "UTC".into();
        let err = service(repo).create(request).await.unwrap_err();
        assert!(matches!(err, AppError::Overlap(_)));
    }

    #[tokio::test]
    async fn create_retries_after_a_concurrent_commit() {
        let mut repo = MockReservationRepository::new();
        let mut seq = mockall::Sequence::new();
        repo.expect_find_by_room()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![]));
        repo.expect_insert()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(AppError::ConcurrencyConflict("serialization failure".into())));
        repo.expect_find_by_room()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![]));
        repo.expect_insert()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|e| {
                Ok(Reservation {
                    id: ReservationId::new(2),
                    room_number: e.room_number,
                    reservation_start: e.reservation_start,
                    reservation_end: e.reservation_end,
                    reserver_name: e.reserver_name,
                    time_zone_id: e.time_zone_id,
                })
            });

        let created = service(repo)
            .create(helsinki_request(2, local(1, 9, 0), local(1, 10, 0)))
            .await
            .unwrap();
        assert_eq!(created.id, ReservationId::new(2));
    }

    #[tokio::test]
    async fn create_gives_up_after_the_retry_budget() {
        let mut repo = MockReservationRepository::new();
        repo.expect_find_by_room().times(3).returning(|_| Ok(vec![]));
        repo.expect_insert()
            .times(3)
            .returning(|_| Err(AppError::ConcurrencyConflict("serialization failure".into())));

        let err = service(repo)
            .create(helsinki_request(2, local(1, 9, 0), local(1, 10, 0)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ConcurrencyConflict(_)));
    }

    #[tokio::test]
    async fn update_overlapping_only_itself_succeeds() {
        let mut repo = MockReservationRepository::new();
        let me = stored(5, 1, utc(2, 6, 0), utc(2, 7, 0));
        let existing = me.clone();
        repo.expect_find_by_id()
            .with(eq(ReservationId::new(5)))
            .returning(move |_| Ok(Some(existing.clone())));
        let existing = me.clone();
        repo.expect_find_by_room()
            .with(eq(room(1)))
            .returning(move |_| Ok(vec![existing.clone()]));
        repo.expect_update()
            .withf(|r| r.id == ReservationId::new(5) && r.reservation_start == utc(2, 6, 30))
            .times(1)
            .returning(|_| Ok(()));

        let updated = service(repo)
            .update(UpdateReservation::new(
                ReservationId::new(5),
                room(1),
                local(2, 9, 30),
                local(2, 10, 30),
                "Aino".into(),
                "Europe/Helsinki".into(),
            ))
            .await
            .unwrap();
        assert_eq!(updated.reservation_start, local(2, 9, 30));
    }

    #[tokio::test]
    async fn update_of_missing_reservation_is_not_found() {
        let mut repo = MockReservationRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));
        repo.expect_update().never();

        let err = service(repo)
            .update(UpdateReservation::new(
                ReservationId::new(42),
                room(1),
                local(2, 9, 0),
                local(2, 10, 0),
                "Aino".into(),
                "Europe/Helsinki".into(),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EntityNotFound(_)));
    }

    #[tokio::test]
    async fn conflict_on_a_deleted_record_is_reported_as_not_found() {
        let mut repo = MockReservationRepository::new();
        let mut seq = mockall::Sequence::new();
        let me = stored(5, 1, utc(2, 6, 0), utc(2, 7, 0));
        repo.expect_find_by_id()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(Some(me.clone())));
        repo.expect_find_by_room()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![]));
        repo.expect_update()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(AppError::ConcurrencyConflict("no row updated".into())));
        repo.expect_find_by_id()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));

        let service = ReservationService::new(Arc::new(repo), 0).with_clock(fixed_now);
        let err = service
            .update(UpdateReservation::new(
                ReservationId::new(5),
                room(1),
                local(2, 9, 0),
                local(2, 10, 0),
                "Aino".into(),
                "Europe/Helsinki".into(),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EntityNotFound(_)));
    }

    #[tokio::test]
    async fn conflict_on_a_live_record_stays_a_conflict() {
        let mut repo = MockReservationRepository::new();
        let me = stored(5, 1, utc(2, 6, 0), utc(2, 7, 0));
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(me.clone())));
        repo.expect_find_by_room().returning(|_| Ok(vec![]));
        repo.expect_update()
            .times(1)
            .returning(|_| Err(AppError::ConcurrencyConflict("serialization failure".into())));

        let service = ReservationService::new(Arc::new(repo), 0).with_clock(fixed_now);
        let err = service
            .update(UpdateReservation::new(
                ReservationId::new(5),
                room(1),
                local(2, 9, 0),
                local(2, 10, 0),
                "Aino".into(),
                "Europe/Helsinki".into(),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ConcurrencyConflict(_)));
    }

    #[tokio::test]
    async fn update_with_unknown_time_zone_is_rejected_before_touching_the_store() {
        let mut repo = MockReservationRepository::new();
        repo.expect_find_by_id().never();
        repo.expect_update().never();

        let err = service(repo)
            .update(UpdateReservation::new(
                ReservationId::new(5),
                room(1),
                local(2, 9, 0),
                local(2, 10, 0),
                "Aino".into(),
                "Mars/Phobos".into(),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTimeZone(ref m) if m.contains("Mars/Phobos")));
    }

    #[tokio::test]
    async fn update_retries_after_a_concurrent_commit() {
        let mut repo = MockReservationRepository::new();
        let me = stored(5, 1, utc(2, 6, 0), utc(2, 7, 0));
        repo.expect_find_by_id()
            .times(2)
            .returning(move |_| Ok(Some(me.clone())));
        repo.expect_find_by_room().times(2).returning(|_| Ok(vec![]));
        let mut seq = mockall::Sequence::new();
        repo.expect_update()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(AppError::ConcurrencyConflict("serialization failure".into())));
        repo.expect_update()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let updated = service(repo)
            .update(UpdateReservation::new(
                ReservationId::new(5),
                room(1),
                local(2, 11, 0),
                local(2, 12, 0),
                "Aino".into(),
                "Europe/Helsinki".into(),
            ))
            .await
            .unwrap();
        assert_eq!(updated.reservation_start, local(2, 11, 0));
    }

    #[tokio::test]
    async fn local_time_outside_the_supported_range_is_an_invalid_interval() {
        let mut repo = MockReservationRepository::new();
        repo.expect_find_by_room().never();
        repo.expect_insert().never();

        let start: NaiveDateTime = "+262142-12-31T22:00:00".parse().unwrap();
        let end: NaiveDateTime = "+262142-12-31T23:00:00".parse().unwrap();
        let mut request = helsinki_request(1, start, end);
        request.time_zone_id = "America/New_York".into();

        let err = service(repo).create(request).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInterval(_)));
    }

    #[tokio::test]
    async fn delete_of_missing_reservation_is_not_found() {
        let mut repo = MockReservationRepository::new();
        repo.expect_delete()
            .with(eq(ReservationId::new(99)))
            .returning(|id| Err(AppError::EntityNotFound(format!("reservation {id} was not found"))));

        let err = service(repo)
            .delete(DeleteReservation::new(ReservationId::new(99)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EntityNotFound(_)));
    }

    #[tokio::test]
    async fn list_next_passes_clamped_options_and_projects_each_row() {
        let mut repo = MockReservationRepository::new();
        let from = utc(1, 0, 0);
        repo.expect_list_paged()
            .withf(move |o| o.from == from && o.page == 1 && o.page_size == 10)
            .returning(|_| {
                Ok(vec![
                    stored(1, 1, utc(1, 6, 0), utc(1, 7, 0)),
                    stored(2, 2, utc(1, 8, 0), utc(1, 9, 0)),
                ])
            });

        let page = service(repo)
            .list_next(ReservationListOptions::new(from, Some(0), Some(0)))
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[1].reservation_start, local(1, 11, 0));
    }

    #[tokio::test]
    async fn unresolvable_stored_zone_is_an_internal_error() {
        let mut repo = MockReservationRepository::new();
        repo.expect_find_all().returning(|| {
            let mut r = stored(1, 1, utc(1, 6, 0), utc(1, 7, 0));
            r.time_zone_id = "Atlantis/Capital".into();
            Ok(vec![r])
        });

        let err = service(repo).list().await.unwrap_err();
        assert!(matches!(err, AppError::ConversionEntityError(_)));
    }
}
