use std::sync::Arc;
use std::time::Duration;

use crate::auth::SessionStore;
use crate::cache::TtlCache;
use crate::database::Database;
use crate::error::Result;
use crate::models::{Config, ContactGroupWithDetails, MenuNode};
use crate::scheduler::DatabaseBackups;
use crate::secrets::SettingsCipher;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub sessions: SessionStore,
    pub cipher: Option<SettingsCipher>,
    pub backups: Arc<DatabaseBackups>,
    pub menu_cache: TtlCache<Vec<MenuNode>>,
    pub contact_cache: TtlCache<Vec<ContactGroupWithDetails>>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Result<Self> {
        let cipher = config
            .settings_encryption_key
            .as_deref()
            .map(SettingsCipher::from_passphrase)
            .transpose()?;
        let ttl = Duration::from_secs(config.cache_ttl_secs);

        Ok(Self {
            sessions: SessionStore::new(config.session_idle_minutes)?,
            backups: Arc::new(DatabaseBackups::new(db.clone(), config.backup_dir.clone())),
            menu_cache: TtlCache::new("menu", ttl),
            contact_cache: TtlCache::new("contacts", ttl),
            cipher,
            config: Arc::new(config),
            db,
        })
    }
}
