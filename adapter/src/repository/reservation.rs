use crate::database::{map_write_error, model::reservation::ReservationRow, ConnectionPool};
use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    id::ReservationId,
    reservation::{event::NewReservation, Reservation, ReservationListOptions},
    room::RoomNumber,
};
use kernel::repository::reservation::ReservationRepository;
use shared::error::{AppError, AppResult};

const SELECT_RESERVATIONS: &str = r#"
    SELECT
        reservation_id,
        room_number,
        reservation_start,
        reservation_end,
        reserver_name,
        time_zone_id
    FROM reservations
"#;

#[derive(new)]
pub struct ReservationRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl ReservationRepository for ReservationRepositoryImpl {
    async fn find_by_room(&self, room_number: RoomNumber) -> AppResult<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(&format!(
            "{SELECT_RESERVATIONS} WHERE room_number = $1 ORDER BY reservation_start ASC"
        ))
        .bind(room_number.raw())
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        rows.into_iter().map(Reservation::try_from).collect()
    }

    async fn find_by_id(&self, reservation_id: ReservationId) -> AppResult<Option<Reservation>> {
        let row: Option<ReservationRow> = sqlx::query_as(&format!(
            "{SELECT_RESERVATIONS} WHERE reservation_id = $1"
        ))
        .bind(reservation_id.raw())
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        row.map(Reservation::try_from).transpose()
    }

    async fn insert(&self, event: NewReservation) -> AppResult<Reservation> {
        let mut tx = self.db.begin().await?;

        // トランザクション分離レベルを SERIALIZABLE に設定する
        self.set_transaction_serializable(&mut tx).await?;

        // 重複の最終判定は排他制約に任せる。
        // 検証後に別リクエストが同じ部屋へコミットしていた場合はここで Overlap になる
        let row: ReservationRow = sqlx::query_as(
            r#"
                INSERT INTO reservations
                (room_number, reservation_start, reservation_end, reserver_name, time_zone_id)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING
                    reservation_id,
                    room_number,
                    reservation_start,
                    reservation_end,
                    reserver_name,
                    time_zone_id
            "#,
        )
        .bind(event.room_number.raw())
        .bind(event.reservation_start)
        .bind(event.reservation_end)
        .bind(&event.reserver_name)
        .bind(&event.time_zone_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            map_write_error(e, || {
                format!(
                    "room {} is already reserved between {} and {}",
                    event.room_number, event.reservation_start, event.reservation_end
                )
            })
        })?;

        tx.commit().await.map_err(|e| {
            map_write_error(e, || format!("room {} is already reserved", event.room_number))
        })?;

        Reservation::try_from(row)
    }

    async fn update(&self, reservation: Reservation) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        self.set_transaction_serializable(&mut tx).await?;

        let res = sqlx::query(
            r#"
                UPDATE reservations
                SET
                    room_number = $2,
                    reservation_start = $3,
                    reservation_end = $4,
                    reserver_name = $5,
                    time_zone_id = $6
                WHERE reservation_id = $1
            "#,
        )
        .bind(reservation.id.raw())
        .bind(reservation.room_number.raw())
        .bind(reservation.reservation_start)
        .bind(reservation.reservation_end)
        .bind(&reservation.reserver_name)
        .bind(&reservation.time_zone_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            map_write_error(e, || {
                format!(
                    "room {} is already reserved between {} and {}",
                    reservation.room_number,
                    reservation.reservation_start,
                    reservation.reservation_end
                )
            })
        })?;

        // 検証後に行が消えていた。呼び出し側が存在を確認し直して NotFound と区別する
        if res.rows_affected() < 1 {
            return Err(AppError::ConcurrencyConflict(format!(
                "reservation {} changed while it was being updated",
                reservation.id
            )));
        }

        tx.commit().await.map_err(|e| {
            map_write_error(e, || {
                format!("room {} is already reserved", reservation.room_number)
            })
        })?;

        Ok(())
    }

    async fn delete(&self, reservation_id: ReservationId) -> AppResult<()> {
        let res = sqlx::query(
            r#"
                DELETE FROM reservations WHERE reservation_id = $1;
            "#,
        )
        .bind(reservation_id.raw())
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::EntityNotFound(format!(
                "reservation {reservation_id} was not found"
            )));
        }

        Ok(())
    }

    async fn find_all(&self) -> AppResult<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(&format!(
            "{SELECT_RESERVATIONS} ORDER BY reservation_start ASC, reservation_id ASC"
        ))
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        rows.into_iter().map(Reservation::try_from).collect()
    }

    async fn list_paged(&self, options: ReservationListOptions) -> AppResult<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(&format!(
            r#"{SELECT_RESERVATIONS}
                WHERE reservation_start >= $1
                ORDER BY reservation_start ASC, reservation_id ASC
                LIMIT $2
                OFFSET $3
            "#
        ))
        .bind(options.from)
        .bind(options.limit())
        .bind(options.offset())
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        rows.into_iter().map(Reservation::try_from).collect()
    }
}

impl ReservationRepositoryImpl {
    // insert, update でのトランザクションを利用するにあたり
    // トランザクション分離レベルを SERIALIZABLE にするために内部的に使うメソッド
    async fn set_transaction_serializable(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> AppResult<()> {
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut **tx)
            .await
            .map_err(AppError::SpecificOperationError)?;
        Ok(())
    }
}
