use std::sync::Arc;

use log::info;

use crm_dialer::app;
use crm_dialer::config::Config;
use crm_dialer::handlers::AppState;
use crm_dialer::RingCentral;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init_timed();

    let config = Config::from_env()?;
    info!("RingCentral server: {}", config.ring_central.server);
    info!("Login redirect: {}", config.login_url);
    if config.api_key.is_empty() {
        log::warn!("DIALER_API_KEY is not set; requests are not authenticated");
    }

    let state = Arc::new(AppState {
        provider: Arc::new(RingCentral::new(config.ring_central.clone())),
        login_url: config.login_url.clone(),
        api_key: config.api_key.clone(),
    });

    let app = app::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
