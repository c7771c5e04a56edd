//! Contact group cascade save.

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use super::save_record;
use crate::database::{Database, Repository};
use crate::error::{AppError, Result};
use crate::models::{ContactDetail, ContactGroup, ContactGroupDraft, ContactGroupWithDetails};

/// Group and detail persistence plus the authoritative list used for refetches.
#[async_trait]
pub trait ContactStore: Repository<ContactGroup> + Repository<ContactDetail> {
    async fn contact_groups(&self) -> Result<Vec<ContactGroupWithDetails>>;
}

#[async_trait]
impl ContactStore for Database {
    async fn contact_groups(&self) -> Result<Vec<ContactGroupWithDetails>> {
        self.contact_groups_with_details().await
    }
}

/// A detail that could not be saved. `key` is the id the client sent
/// (numeric or `tmp-...`), or its index when it had none.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailFailure {
    pub key: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeOutcome {
    /// The saved group with only the details that were stored.
    pub group: ContactGroupWithDetails,
    pub failures: Vec<DetailFailure>,
    /// Every group, refetched after the save.
    pub groups: Vec<ContactGroupWithDetails>,
}

/// Save a group, then all of its details in parallel.
///
/// A group failure aborts before any detail is written. Detail failures are
/// collected one per detail and never stop their siblings.
pub async fn cascade_save<S>(store: &S, draft: &ContactGroupDraft) -> Result<CascadeOutcome>
where
    S: ContactStore + ?Sized,
{
    let group = save_record(store, &draft.group).await?;
    let group_id = group
        .id
        .ok_or_else(|| AppError::Internal("saved contact group has no id".to_string()))?;

    let saves = draft.details.iter().enumerate().map(|(index, detail)| async move {
        let key = detail
            .id
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| format!("#{index}"));
        let result = save_detail(store, &detail.to_detail(group_id)).await;
        (key, result)
    });

    let mut details = Vec::new();
    let mut failures = Vec::new();
    for (key, result) in join_all(saves).await {
        match result {
            Ok(detail) => details.push(detail),
            Err(e) => {
                warn!("Contact detail {} of group {} not saved: {}", key, group_id, e);
                failures.push(DetailFailure {
                    key,
                    message: e.to_string(),
                });
            }
        }
    }

    info!(
        "📇 Saved contact group {} with {} details ({} failed)",
        group_id,
        details.len(),
        failures.len()
    );

    let groups = store.contact_groups().await?;
    Ok(CascadeOutcome {
        group: ContactGroupWithDetails { group, details },
        failures,
        groups,
    })
}

/// Save one detail. An existing detail must already belong to the group
/// it is saved under.
async fn save_detail<S>(store: &S, detail: &ContactDetail) -> Result<ContactDetail>
where
    S: ContactStore + ?Sized,
{
    if let Some(id) = detail.id {
        if let Some(stored) = Repository::<ContactDetail>::get(store, id).await? {
            if stored.group_id != detail.group_id {
                return Err(AppError::validation(format!(
                    "Contact detail {id} belongs to group {}",
                    stored.group_id
                )));
            }
        }
    }
    save_record(store, detail).await
}
