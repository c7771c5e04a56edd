//! Input checks applied before anything reaches the database.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{
    ContactDetail, ContactGroup, ContactKind, Doctor, MenuItem, NewsItem, Page, Question,
    QuestionOption, Service, Survey, User, UserInput,
};

pub const MAX_META_TITLE: usize = 60;
pub const MAX_META_DESCRIPTION: usize = 160;
pub const MAX_KEYWORDS: usize = 255;
pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

// Digits with the usual separators and an optional leading +.
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9 ()\-]{5,20}$").expect("valid phone regex"));

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]{3,64}$").expect("valid username regex"));

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value.trim())
}

pub fn is_valid_phone(value: &str) -> bool {
    let value = value.trim();
    PHONE_RE.is_match(value) && value.chars().filter(|c| c.is_ascii_digit()).count() >= 5
}

pub fn is_valid_slug(value: &str) -> bool {
    SLUG_RE.is_match(value)
}

/// Absolute http(s) URL.
pub fn is_valid_url(value: &str) -> bool {
    Url::parse(value.trim())
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false)
}

/// Absolute http(s) URL or a site-relative path such as `/uploads/a.png`.
pub fn is_valid_link(value: &str) -> bool {
    let value = value.trim();
    (value.starts_with('/') && !value.starts_with("//")) || value.starts_with('#') || is_valid_url(value)
}

/// Google Maps embed link (`https://www.google.com/maps/embed?...`).
pub fn is_valid_maps_embed(value: &str) -> bool {
    let Ok(url) = Url::parse(value.trim()) else {
        return false;
    };
    let google_host = url
        .host_str()
        .map(|host| host == "google.com" || host.ends_with(".google.com"))
        .unwrap_or(false);

    url.scheme() == "https" && google_host && url.path().starts_with("/maps/embed")
}

pub fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(())
}

pub fn max_len(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(AppError::validation(format!(
            "{field} must be at most {max} characters (got {len})"
        )));
    }
    Ok(())
}

fn optional_max_len(field: &str, value: Option<&str>, max: usize) -> Result<()> {
    value.map_or(Ok(()), |v| max_len(field, v, max))
}

fn slug(value: &str) -> Result<()> {
    require("Slug", value)?;
    if !is_valid_slug(value) {
        return Err(AppError::validation(
            "Slug may only contain lowercase letters, digits and single dashes",
        ));
    }
    Ok(())
}

fn optional_link(field: &str, value: Option<&str>) -> Result<()> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(link) if !is_valid_link(link) => {
            Err(AppError::validation(format!("{field} must be a URL or a site path")))
        }
        _ => Ok(()),
    }
}

fn username(value: &str) -> Result<()> {
    if !USERNAME_RE.is_match(value) {
        return Err(AppError::validation(
            "Username must be 3-64 characters of letters, digits, '.', '_' or '-'",
        ));
    }
    Ok(())
}

fn non_negative(field: &str, value: i64) -> Result<()> {
    if value < 0 {
        return Err(AppError::validation(format!("{field} cannot be negative")));
    }
    Ok(())
}

/// Field-level checks for admin input.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

impl Validate for Page {
    fn validate(&self) -> Result<()> {
        require("Title", &self.title)?;
        slug(&self.slug)?;
        optional_max_len("Meta title", self.meta_title.as_deref(), MAX_META_TITLE)?;
        optional_max_len(
            "Meta description",
            self.meta_description.as_deref(),
            MAX_META_DESCRIPTION,
        )
    }
}

impl Validate for NewsItem {
    fn validate(&self) -> Result<()> {
        require("Title", &self.title)?;
        slug(&self.slug)?;
        optional_max_len("Summary", self.summary.as_deref(), MAX_META_DESCRIPTION * 2)?;
        optional_link("Image URL", self.image_url.as_deref())
    }
}

impl Validate for Service {
    fn validate(&self) -> Result<()> {
        require("Title", &self.title)?;
        slug(&self.slug)?;
        non_negative("Position", self.position)
    }
}

impl Validate for Doctor {
    fn validate(&self) -> Result<()> {
        require("Full name", &self.full_name)?;
        require("Specialty", &self.specialty)?;
        optional_link("Photo URL", self.photo_url.as_deref())?;
        non_negative("Position", self.position)
    }
}

impl Validate for MenuItem {
    fn validate(&self) -> Result<()> {
        require("Title", &self.title)?;
        require("URL", &self.url)?;
        if !is_valid_link(&self.url) {
            return Err(AppError::validation("URL must be a URL or a site path"));
        }
        if self.position < 1 {
            return Err(AppError::validation("Position starts at 1"));
        }
        Ok(())
    }
}

impl Validate for ContactGroup {
    fn validate(&self) -> Result<()> {
        require("Group name", &self.name)?;
        non_negative("Position", self.position)
    }
}

impl Validate for ContactDetail {
    fn validate(&self) -> Result<()> {
        require("Value", &self.value)?;
        match self.kind {
            ContactKind::Email if !is_valid_email(&self.value) => {
                Err(AppError::validation(format!("'{}' is not a valid email address", self.value)))
            }
            ContactKind::Phone | ContactKind::EmergencyContact if !is_valid_phone(&self.value) => {
                Err(AppError::validation(format!("'{}' is not a valid phone number", self.value)))
            }
            _ => Ok(()),
        }
    }
}

impl Validate for Survey {
    fn validate(&self) -> Result<()> {
        require("Survey title", &self.title)
    }
}

impl Validate for Question {
    fn validate(&self) -> Result<()> {
        require("Question text", &self.text)?;
        non_negative("Position", self.position)
    }
}

impl Validate for QuestionOption {
    fn validate(&self) -> Result<()> {
        require("Option text", &self.text)
    }
}

impl Validate for User {
    fn validate(&self) -> Result<()> {
        username(&self.username)
    }
}

impl Validate for UserInput {
    fn validate(&self) -> Result<()> {
        username(&self.username)?;
        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            if password.chars().count() < MIN_PASSWORD_LEN {
                return Err(AppError::validation(format!(
                    "Password must be at least {MIN_PASSWORD_LEN} characters"
                )));
            }
        }
        Ok(())
    }
}
