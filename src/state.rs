//! Everything a request handler needs, built once at startup.

use crate::auth::TokenService;
use crate::config::StorefrontConfig;
use crate::http::CorsPolicy;
use crate::notify::Notifier;
use crate::pool::ConnectionPool;
use crate::service::auth::AdminAccount;
use crate::upload::CloudinaryUploader;
use config::ConfigError;

pub struct AppState {
    pub pool: ConnectionPool,
    pub tokens: TokenService,
    pub admin: Option<AdminAccount>,
    pub notifier: Notifier,
    /// `None` when Cloudinary settings are missing; uploads then fail with 500.
    pub uploader: Option<CloudinaryUploader>,
    pub cors: CorsPolicy,
}

impl AppState {
    /// Build the state. Opens no database connection and starts the
    /// notification worker only if Telegram is enabled.
    pub fn from_config(config: &StorefrontConfig) -> Result<Self, ConfigError> {
        let tokens = TokenService::new(&config.auth.jwt_secret, config.auth.token_ttl()?);

        let admin = AdminAccount::from_config(&config.auth);
        if admin.is_none() {
            log::info!("reserved admin account disabled (ADMIN_EMAIL/ADMIN_PASSWORD not set)");
        }

        let uploader = match CloudinaryUploader::from_config(&config.cloudinary) {
            Ok(uploader) => Some(uploader),
            Err(e) => {
                log::warn!("image uploads unavailable: {e}");
                None
            }
        };

        Ok(Self {
            pool: ConnectionPool::new(&config.database),
            tokens,
            admin,
            notifier: Notifier::from_config(&config.telegram),
            uploader,
            cors: CorsPolicy::from_setting(config.server.cors_origin.as_deref()),
        })
    }
}
