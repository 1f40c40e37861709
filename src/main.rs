use bengkel_auth::app::app;
use bengkel_auth::core::auth::{AuthService, JwtService, PasswordHasher};
use bengkel_auth::core::config::Config;
use bengkel_auth::core::db::{MemoryUserStore, UserRepository, connect};
use bengkel_auth::core::presence::PresenceHandle;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    // Initialize tracing, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        tracing::error!("Server stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    // Log config status (without revealing secrets)
    tracing::info!(
        database = config.has_database(),
        port = config.port,
        client = %config.client_base_url,
        "Config loaded"
    );

    let jwt_service = JwtService::new(config.jwt.clone());
    let hasher = PasswordHasher::new(config.bcrypt_cost);
    let presence = PresenceHandle::spawn();

    let router = match &config.database {
        Some(database) => {
            let pool = connect(database).await?;
            app(
                AuthService::new(UserRepository::new(pool), jwt_service, hasher),
                presence,
                &config,
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set, accounts are kept in memory and lost on restart");
            app(
                AuthService::new(MemoryUserStore::new(), jwt_service, hasher),
                presence,
                &config,
            )
        }
    };

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on port {}, url: http://{}", config.port, addr);
    tracing::info!("Presence WebSocket: ws://{}/presence", addr);

    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}
