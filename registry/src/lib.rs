use std::sync::Arc;

use adapter::repository::reservation::ReservationRepositoryImpl;
use adapter::{database::ConnectionPool, repository::health::HealthCheckRepositoryImpl};
use kernel::repository::health::HealthCheckRepository;
use kernel::repository::reservation::ReservationRepository;
use kernel::service::reservation::ReservationService;
use shared::config::AppConfig;

#[derive(Clone)]
pub struct AppRegistry {
    health_check_repository: Arc<dyn HealthCheckRepository>,
    reservation_service: Arc<ReservationService>,
}

impl AppRegistry {
    pub fn new(pool: ConnectionPool, app_config: AppConfig) -> Self {
        let health_check_repository = Arc::new(HealthCheckRepositoryImpl::new(pool.clone()));
        let reservation_repository = Arc::new(ReservationRepositoryImpl::new(pool.clone()));
        Self::with_repositories(
            health_check_repository,
            reservation_repository,
            app_config.reservation.commit_retries,
        )
    }

    // リポジトリ実装を差し替えて組み立てる。テストではモックを渡す
    pub fn with_repositories(
        health_check_repository: Arc<dyn HealthCheckRepository>,
        reservation_repository: Arc<dyn ReservationRepository>,
        commit_retries: u32,
    ) -> Self {
        let reservation_service = Arc::new(ReservationService::new(
            reservation_repository,
            commit_retries,
        ));
        Self {
            health_check_repository,
            reservation_service,
        }
    }

    pub fn health_check_repository(&self) -> Arc<dyn HealthCheckRepository> {
        self.health_check_repository.clone()
    }

    pub fn reservation_service(&self) -> Arc<ReservationService> {
        self.reservation_service.clone()
    }
}
