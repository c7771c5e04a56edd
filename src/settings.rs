//! Site and system settings: key checks, secret handling, and the typed views
//! (SEO, backups) other modules read.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::database::Database;
use crate::error::{AppError, Result};
use crate::models::{BackupFrequency, Setting};
use crate::secrets::{is_encrypted, SettingsCipher};
use crate::validation::{
    is_valid_email, is_valid_maps_embed, is_valid_phone, is_valid_url, max_len, MAX_KEYWORDS,
    MAX_META_DESCRIPTION, MAX_META_TITLE,
};

pub const SITE_TITLE: &str = "site_title";
pub const SITE_DESCRIPTION: &str = "site_description";
pub const SITE_KEYWORDS: &str = "site_keywords";
pub const OG_IMAGE: &str = "og_image";
pub const CANONICAL_URL: &str = "canonical_url";

pub const SCHEMA_ORG_TYPE: &str = "schema_org_type";
pub const SCHEMA_ORG_NAME: &str = "schema_org_name";
pub const SCHEMA_ORG_TELEPHONE: &str = "schema_org_telephone";
pub const SCHEMA_ORG_EMAIL: &str = "schema_org_email";
pub const SCHEMA_ORG_STREET_ADDRESS: &str = "schema_org_street_address";
pub const SCHEMA_ORG_LOCALITY: &str = "schema_org_locality";
pub const SCHEMA_ORG_POSTAL_CODE: &str = "schema_org_postal_code";
pub const SCHEMA_ORG_COUNTRY: &str = "schema_org_country";
pub const SCHEMA_ORG_OPENING_HOURS: &str = "schema_org_opening_hours";

pub const BACKUP_ENABLED: &str = "db_backup_enabled";
pub const BACKUP_FREQUENCY: &str = "db_backup_frequency";
pub const BACKUP_RETENTION_DAYS: &str = "db_backup_retention_days";
pub const BACKUP_LAST_RUN: &str = "db_backup_last_run";
pub const BACKUP_NEXT_RUN: &str = "db_backup_next_run";

pub const SMTP_HOST: &str = "smtp_host";
pub const SMTP_PORT: &str = "smtp_port";
pub const SMTP_USER: &str = "smtp_user";
pub const SMTP_PASSWORD: &str = "smtp_password";
pub const SMTP_FROM: &str = "smtp_from";
pub const SMTP_SECURE: &str = "smtp_secure";

pub const GOOGLE_MAPS_EMBED_URL: &str = "google_maps_embed_url";

/// What reads return in place of an encrypted value.
pub const SECRET_PLACEHOLDER: &str = "********";

const SECRET_KEYS: &[&str] = &[SMTP_PASSWORD];
const DEFAULT_SCHEMA_TYPE: &str = "MedicalClinic";
const DEFAULT_RETENTION_DAYS: i64 = 30;
/// Upper bound for `db_backup_retention_days` (a hundred years).
pub const MAX_RETENTION_DAYS: i64 = 36_500;

pub fn is_secret(key: &str) -> bool {
    SECRET_KEYS.contains(&key)
}

/// Check one value against the rules of its key. Unknown keys are accepted.
pub fn validate_setting(key: &str, value: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(AppError::validation("Setting key is required"));
    }

    // Empty clears the setting.
    if value.trim().is_empty() {
        return Ok(());
    }

    match key {
        SITE_TITLE => max_len("Site title", value, MAX_META_TITLE),
        SITE_DESCRIPTION => max_len("Site description", value, MAX_META_DESCRIPTION),
        SITE_KEYWORDS => max_len("Site keywords", value, MAX_KEYWORDS),
        OG_IMAGE | CANONICAL_URL => expect(is_valid_url(value), key, "must be an http(s) URL"),
        SCHEMA_ORG_TELEPHONE => expect(is_valid_phone(value), key, "must be a phone number"),
        SCHEMA_ORG_EMAIL | SMTP_FROM => expect(is_valid_email(value), key, "must be an email address"),
        BACKUP_ENABLED | SMTP_SECURE => expect(parse_bool(value).is_some(), key, "must be true or false"),
        BACKUP_FREQUENCY => value
            .parse::<BackupFrequency>()
            .map(|_| ())
            .map_err(AppError::Validation),
        BACKUP_RETENTION_DAYS => expect(
            value
                .trim()
                .parse::<i64>()
                .map(|d| (1..=MAX_RETENTION_DAYS).contains(&d))
                .unwrap_or(false),
            key,
            "must be between 1 and 36500 days",
        ),
        BACKUP_LAST_RUN | BACKUP_NEXT_RUN => expect(
            DateTime::parse_from_rfc3339(value.trim()).is_ok(),
            key,
            "must be an RFC 3339 timestamp",
        ),
        SMTP_PORT => expect(
            value.trim().parse::<u16>().map(|p| p > 0).unwrap_or(false),
            key,
            "must be a port between 1 and 65535",
        ),
        GOOGLE_MAPS_EMBED_URL => expect(
            is_valid_maps_embed(value),
            key,
            "must be an https://www.google.com/maps/embed link",
        ),
        _ => Ok(()),
    }
}

fn expect(ok: bool, key: &str, message: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(AppError::validation(format!("{key} {message}")))
    }
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Replace stored ciphertext with the placeholder before a setting leaves the server.
pub fn mask(mut setting: Setting) -> Setting {
    if is_secret(&setting.key) && is_encrypted(&setting.value) {
        setting.value = SECRET_PLACEHOLDER.to_string();
    }
    setting
}

/// Value to persist for `key`, or `None` when the stored value must stay as it is.
pub fn storage_value(
    key: &str,
    value: &str,
    cipher: Option<&SettingsCipher>,
) -> Result<Option<String>> {
    if !is_secret(key) || value.is_empty() {
        return Ok(Some(value.to_string()));
    }
    if value == SECRET_PLACEHOLDER {
        return Ok(None);
    }
    if is_encrypted(value) {
        return Ok(Some(value.to_string()));
    }

    let cipher = cipher.ok_or_else(|| {
        AppError::Config(format!(
            "SETTINGS_ENCRYPTION_KEY is required to store {key}"
        ))
    })?;
    cipher.encrypt(value).map(Some)
}

/// Masked view of every stored setting.
pub async fn list_masked(db: &Database) -> Result<Vec<Setting>> {
    Ok(db.list_settings().await?.into_iter().map(mask).collect())
}

/// Validate, encrypt secrets and upsert a batch. Returns the masked rows.
pub async fn save_settings(
    db: &Database,
    cipher: Option<&SettingsCipher>,
    entries: &[(String, String)],
) -> Result<Vec<Setting>> {
    let mut rows = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        validate_setting(key, value)?;
        match storage_value(key, value, cipher)? {
            Some(stored) => rows.push((key.clone(), stored)),
            None => info!("Keeping stored value for {}", key),
        }
    }

    let saved = db.upsert_settings(&rows).await?;
    info!("⚙️ Saved {} settings", saved.len());
    Ok(saved.into_iter().map(mask).collect())
}

/// Settings as a key lookup.
#[derive(Debug, Clone, Default)]
pub struct SettingsMap(HashMap<String, String>);

impl SettingsMap {
    pub async fn load(db: &Database) -> Result<Self> {
        Ok(Self::from(db.list_settings().await?))
    }

    /// Non-empty value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

impl From<Vec<Setting>> for SettingsMap {
    fn from(settings: Vec<Setting>) -> Self {
        Self(settings.into_iter().map(|s| (s.key, s.value)).collect())
    }
}

/// Typed view of the `db_backup_*` keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupSettings {
    pub enabled: bool,
    pub frequency: BackupFrequency,
    pub retention_days: i64,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
}

impl BackupSettings {
    pub fn from_map(map: &SettingsMap) -> Self {
        let frequency = match map.get(BACKUP_FREQUENCY).map(str::parse::<BackupFrequency>) {
            Some(Ok(frequency)) => frequency,
            Some(Err(e)) => {
                warn!("Ignoring stored backup frequency: {}", e);
                BackupFrequency::Daily
            }
            None => BackupFrequency::Daily,
        };

        Self {
            enabled: map.get(BACKUP_ENABLED).and_then(parse_bool).unwrap_or(false),
            frequency,
            retention_days: map
                .get(BACKUP_RETENTION_DAYS)
                .and_then(|v| v.parse().ok())
                .filter(|days: &i64| (1..=MAX_RETENTION_DAYS).contains(days))
                .unwrap_or(DEFAULT_RETENTION_DAYS),
            last_run: map.get(BACKUP_LAST_RUN).and_then(parse_timestamp),
            next_run: map.get(BACKUP_NEXT_RUN).and_then(parse_timestamp),
        }
    }

    pub async fn load(db: &Database) -> Result<Self> {
        Ok(Self::from_map(&SettingsMap::load(db).await?))
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Meta fields plus Schema.org JSON-LD for the public site head.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeoSettings {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub og_image: Option<String>,
    pub canonical_url: Option<String>,
    pub maps_embed_url: Option<String>,
    pub json_ld: Value,
}

impl SeoSettings {
    pub fn from_map(map: &SettingsMap) -> Self {
        let owned = |key: &str| map.get(key).map(str::to_string);

        Self {
            title: owned(SITE_TITLE),
            description: owned(SITE_DESCRIPTION),
            keywords: owned(SITE_KEYWORDS),
            og_image: owned(OG_IMAGE),
            canonical_url: owned(CANONICAL_URL),
            maps_embed_url: owned(GOOGLE_MAPS_EMBED_URL),
            json_ld: json_ld(map),
        }
    }
}

/// Schema.org organization object. Empty settings are left out.
pub fn json_ld(map: &SettingsMap) -> Value {
    let mut object = Map::new();
    object.insert("@context".into(), json!("https://schema.org"));
    object.insert(
        "@type".into(),
        json!(map.get(SCHEMA_ORG_TYPE).unwrap_or(DEFAULT_SCHEMA_TYPE)),
    );

    let name = map.get(SCHEMA_ORG_NAME).or_else(|| map.get(SITE_TITLE));
    let fields = [
        ("name", name),
        ("description", map.get(SITE_DESCRIPTION)),
        ("url", map.get(CANONICAL_URL)),
        ("image", map.get(OG_IMAGE)),
        ("telephone", map.get(SCHEMA_ORG_TELEPHONE)),
        ("email", map.get(SCHEMA_ORG_EMAIL)),
        ("openingHours", map.get(SCHEMA_ORG_OPENING_HOURS)),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            object.insert(field.into(), json!(value));
        }
    }

    let mut address = Map::new();
    let address_fields = [
        ("streetAddress", SCHEMA_ORG_STREET_ADDRESS),
        ("addressLocality", SCHEMA_ORG_LOCALITY),
        ("postalCode", SCHEMA_ORG_POSTAL_CODE),
        ("addressCountry", SCHEMA_ORG_COUNTRY),
    ];
    for (field, key) in address_fields {
        if let Some(value) = map.get(key) {
            address.insert(field.into(), json!(value));
        }
    }
    if !address.is_empty() {
        address.insert("@type".into(), json!("PostalAddress"));
        object.insert("address".into(), Value::Object(address));
    }

    Value::Object(object)
}
