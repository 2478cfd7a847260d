use invitely_config::DatabaseSettings;
use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tracing::info;

/// Name reported to the server in the connection handshake unless the URL
/// sets its own `appName`.
pub const APP_NAME: &str = "invitely";

/// Parses the connection URL and applies the configured pool bounds.
pub async fn client_options(
    settings: &DatabaseSettings,
) -> Result<ClientOptions, mongodb::error::Error> {
    let mut options = ClientOptions::parse(&settings.url).await?;
    if options.app_name.is_none() {
        options.app_name = Some(APP_NAME.to_string());
    }
    options.max_pool_size = settings.max_pool_size.or(options.max_pool_size);
    options.min_pool_size = settings.min_pool_size.or(options.min_pool_size);
    Ok(options)
}

/// Opens the invitation database and pings it, so a bad URL fails at
/// startup instead of on the first request.
pub async fn connect(settings: &DatabaseSettings) -> Result<Database, mongodb::error::Error> {
    let options = client_options(settings).await?;
    let pool = (options.min_pool_size, options.max_pool_size);
    let db = Client::with_options(options)?.database(&settings.name);

    db.run_command(doc! { "ping": 1 }).await?;
    info!(db = %settings.name, ?pool, "Connected to invitation database");

    Ok(db)
}
