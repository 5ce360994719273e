use voting_backend::{build_rocket, config::AppConfig, routes::AppState};
use shuttle_runtime::CustomError;
use tracing::info;

#[shuttle_runtime::main]
async fn rocket(
    #[shuttle_runtime::Secrets] secret_store: shuttle_runtime::SecretStore,
) -> shuttle_rocket::ShuttleRocket {
    info!("🗳️ Starting election server");

    let config = AppConfig::from_secrets(&secret_store);

    let state = tokio::task::spawn_blocking({
        let config = config.clone();
        move || AppState::open(&config)
    })
    .await
    .map_err(CustomError::new)?
    .map_err(CustomError::new)?;

    info!(path = %config.store_path.display(), "📋 Election store ready");

    Ok(build_rocket(state, &config).into())
}
