use serde::{Deserialize, Serialize};

/// Prefix the admin panel uses for details that have not been stored yet.
pub const TEMP_ID_PREFIX: &str = "tmp-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ContactKind {
    Phone,
    Email,
    Address,
    Hours,
    EmergencyContact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContactGroup {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub position: i64,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContactDetail {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub group_id: i64,
    pub kind: ContactKind,
    pub value: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactGroupWithDetails {
    #[serde(flatten)]
    pub group: ContactGroup,
    pub details: Vec<ContactDetail>,
}

/// Identifier of a detail inside a cascade-save payload: either a stored id or
/// a client-generated temporary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetailKey {
    Existing(i64),
    Temp(String),
}

impl DetailKey {
    /// Stored id, if this key refers to a persisted detail.
    pub fn existing_id(&self) -> Option<i64> {
        match self {
            DetailKey::Existing(id) => Some(*id),
            DetailKey::Temp(key) if key.starts_with(TEMP_ID_PREFIX) => None,
            DetailKey::Temp(key) => key.parse().ok(),
        }
    }
}

impl std::fmt::Display for DetailKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetailKey::Existing(id) => write!(f, "{id}"),
            DetailKey::Temp(key) => f.write_str(key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactDetailDraft {
    #[serde(default)]
    pub id: Option<DetailKey>,
    pub kind: ContactKind,
    pub value: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub position: i64,
}

impl ContactDetailDraft {
    /// Materialize the draft as a detail owned by `group_id`.
    pub fn to_detail(&self, group_id: i64) -> ContactDetail {
        ContactDetail {
            id: self.id.as_ref().and_then(DetailKey::existing_id),
            group_id,
            kind: self.kind,
            value: self.value.clone(),
            label: self.label.clone(),
            position: self.position,
        }
    }
}

/// Cascade-save payload: a group plus the details edited alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactGroupDraft {
    #[serde(flatten)]
    pub group: ContactGroup,
    #[serde(default)]
    pub details: Vec<ContactDetailDraft>,
}

/// One entry of an ordered reorder request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: i64,
    pub position: i64,
}

fn active_by_default() -> bool {
    true
}
