use crate::model::{
    id::ReservationId,
    reservation::{event::NewReservation, Reservation, ReservationListOptions},
    room::RoomNumber,
};
use async_trait::async_trait;
use shared::error::AppResult;

// 予約の永続化を担うストアとの境界。
// 同じ部屋への読み取り・検証・書き込みが並行しても重複予約が残らないことは実装側が保証する
#[mockall::automock]
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    // 部屋番号に紐づく予約をすべて取得する
    async fn find_by_room(&self, room_number: RoomNumber) -> AppResult<Vec<Reservation>>;
    // reservation_id から予約を取得する。存在しなければ None
    async fn find_by_id(&self, reservation_id: ReservationId) -> AppResult<Option<Reservation>>;
    // 予約を追加し、採番された ID 付きで返す
    async fn insert(&self, event: NewReservation) -> AppResult<Reservation>;
    // 予約を更新する。対象行を更新できなかった場合は ConcurrencyConflict
    async fn update(&self, reservation: Reservation) -> AppResult<()>;
    // 予約を削除する。存在しなければ EntityNotFound
    async fn delete(&self, reservation_id: ReservationId) -> AppResult<()>;
    // すべての予約を開始時刻の昇順で取得する
    async fn find_all(&self) -> AppResult<Vec<Reservation>>;
    // options.from 以降に開始する予約を開始時刻の昇順でページ単位に取得する
    async fn list_paged(&self, options: ReservationListOptions) -> AppResult<Vec<Reservation>>;
}
