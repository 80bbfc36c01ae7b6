use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::notify::Notifier;
use crate::config::Config;
use crate::media::MediaHost;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub media: Arc<dyn MediaHost>,
    pub notifier: Arc<dyn Notifier>,
}
