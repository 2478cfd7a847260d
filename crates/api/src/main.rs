use invitely_api::{build_router, state::AppState};
use invitely_config::Settings;
use invitely_db::{connect, indexes::ensure_indexes};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (silently ignore if missing)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "invitely_api=debug,invitely_services=debug,invitely_db=debug,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load()?;
    info!("Starting Invitely API on {}:{}", settings.app.host, settings.app.port);
    info!(
        invite_only = settings.invitation.invite_only,
        expire_days = settings.invitation.expire_days,
        initial_invitations = settings.invitation.initial_invitations,
        reward_threshold = settings.invitation.reward_threshold,
        "Invitation config"
    );

    let db = connect(&settings.database).await?;
    ensure_indexes(&db).await?;

    let app_state = AppState::new(db, settings.clone());
    let app = build_router(app_state);

    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
