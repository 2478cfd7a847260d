use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub const DEFAULT_EXPIRE_DAYS: i64 = 15;
pub const DEFAULT_INITIAL_INVITATIONS: i64 = 10;
pub const DEFAULT_REWARD_THRESHOLD: f64 = 0.75;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub invitation: InvitationSettings,
    pub mail: MailSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub name: String,
    pub max_pool_size: Option<u32>,
    pub min_pool_size: Option<u32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_ttl_secs: u64,
    pub issuer: String,
}

/// Business rules of the invitation workflow.
#[derive(Debug, Deserialize, Clone)]
pub struct InvitationSettings {
    /// Registration requires an invitation and sending one consumes quota.
    pub invite_only: bool,
    pub expire_days: i64,
    /// Quota given to every new user, also the default reward bonus.
    pub initial_invitations: i64,
    /// Minimum performance score, in `[0, 1]`, that earns a reward.
    pub reward_threshold: f64,
    /// Server secret mixed into every invitation key.
    pub secret_key: String,
}

impl Default for InvitationSettings {
    fn default() -> Self {
        Self {
            invite_only: false,
            expire_days: DEFAULT_EXPIRE_DAYS,
            initial_invitations: DEFAULT_INITIAL_INVITATIONS,
            reward_threshold: DEFAULT_REWARD_THRESHOLD,
            secret_key: "change-me-in-production".to_string(),
        }
    }
}

impl InvitationSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.reward_threshold) {
            return Err(ConfigError::Message(format!(
                "invitation.reward_threshold must be within [0, 1], got {}",
                self.reward_threshold
            )));
        }
        if self.expire_days < 0 {
            return Err(ConfigError::Message(
                "invitation.expire_days must not be negative".to_string(),
            ));
        }
        if self.initial_invitations < 0 {
            return Err(ConfigError::Message(
                "invitation.initial_invitations must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailSettings {
    pub default_from_email: String,
    pub site_name: String,
    pub site_domain: String,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            default_from_email: "webmaster@localhost".to_string(),
            site_name: "Invitely".to_string(),
            site_domain: "localhost:3000".to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("INVITELY"),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 3000)?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("database.url", "mongodb://localhost:27017")?
            .set_default("database.name", "invitely")?
            .set_default("jwt.secret", "change-me-in-production")?
            .set_default("jwt.access_token_ttl_secs", 3600)?
            .set_default("jwt.issuer", "invitely")?
            .set_default("invitation.invite_only", false)?
            .set_default("invitation.expire_days", DEFAULT_EXPIRE_DAYS)?
            .set_default("invitation.initial_invitations", DEFAULT_INITIAL_INVITATIONS)?
            .set_default("invitation.reward_threshold", DEFAULT_REWARD_THRESHOLD)?
            .set_default("invitation.secret_key", "change-me-in-production")?
            .set_default("mail.default_from_email", "webmaster@localhost")?
            .set_default("mail.site_name", "Invitely")?
            .set_default("mail.site_domain", "localhost:3000")?
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.invitation.validate()?;
        Ok(settings)
    }
}
