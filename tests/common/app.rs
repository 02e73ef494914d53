use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;
use tokio::sync::broadcast;

use aviprep_backend::config::Config;
use aviprep_backend::routes::build_router;
use aviprep_backend::state::AppState;
use aviprep_backend::store::Store;

pub struct TestApp {
    pub app: Router,
    #[allow(dead_code)]
    pub state: AppState,
    pub config: Config,
    _temp_dir: TempDir,
}

async fn spawn_with_limits(api_limit: u64) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let sled_path = temp_dir.path().join("aviprep-test.sled");

    // Construct Config directly instead of via set_var to avoid env races
    // between parallel tests.
    let test_secret = format!("integration-test-jwt-secret-{}", uuid::Uuid::new_v4());
    let test_admin_secret = format!("integration-test-admin-secret-{}", uuid::Uuid::new_v4());

    let config = Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path: sled_path.to_string_lossy().to_string(),
        jwt_secret: test_secret,
        admin_jwt_secret: test_admin_secret,
        cors_origin: "http://localhost:5173".to_string(),
        trust_proxy: false,
        rate_limit: aviprep_backend::config::RateLimitConfig {
            window_secs: 60,
            max_requests: api_limit,
        },
        worker: aviprep_backend::config::WorkerConfig {
            is_leader: false,
            enable_digest: false,
        },
    };

    let store = Arc::new(Store::open(&config.sled_path).expect("open store"));
    store.run_migrations().expect("run migrations");

    let (shutdown_tx, _) = broadcast::channel::<()>(8);

    let state = AppState::new(store, &config, shutdown_tx);

    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        _temp_dir: temp_dir,
    }
}

pub async fn spawn_test_server() -> TestApp {
    spawn_with_limits(100).await
}

#[allow(dead_code)]
pub async fn spawn_test_server_with_limits(api_limit: u64) -> TestApp {
    spawn_with_limits(api_limit).await
}
