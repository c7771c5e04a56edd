//! Admin panel flows and the in-memory state container.
//!
//! [`AdminState`] holds every collection the dashboard edits. It is loaded
//! once and then updated from each backend response: saved rows are appended
//! or replaced by id, deleted rows are filtered out. Nothing is retried or
//! rolled back; a failed save leaves the collection untouched.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::database::{Database, Repository};
use crate::error::Result;
use crate::models::{
    ContactGroupDraft, ContactGroupWithDetails, Doctor, Entity, MenuItem, NewsItem, Page,
    Question, QuestionOption, Service, Setting, Survey, SurveyTree, User,
};
use crate::validation::Validate;

pub mod contacts;
pub mod menu;
pub mod surveys;

pub use crate::database::upsert;
pub use contacts::{cascade_save, CascadeOutcome, ContactStore, DetailFailure};
pub use menu::{delete_menu_item, save_menu_item, MenuSave};
pub use surveys::{save_survey_tree, SurveyTreeSave};

/// Validate, then insert or update.
pub async fn save_record<E, R>(repo: &R, record: &E) -> Result<E>
where
    E: Entity + Validate,
    R: Repository<E> + ?Sized,
{
    record.validate()?;
    upsert(repo, record).await
}

/// Everything the admin state container needs from the backend.
#[async_trait]
pub trait AdminBackend:
    ContactStore
    + Repository<Page>
    + Repository<NewsItem>
    + Repository<Service>
    + Repository<Doctor>
    + Repository<MenuItem>
    + Repository<User>
    + Repository<Survey>
    + Repository<Question>
    + Repository<QuestionOption>
{
    /// Settings as shown to editors (secrets masked).
    async fn settings(&self) -> Result<Vec<Setting>>;
}

#[async_trait]
impl AdminBackend for Database {
    async fn settings(&self) -> Result<Vec<Setting>> {
        crate::settings::list_masked(self).await
    }
}

/// The dashboard's collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Collections {
    pub pages: Vec<Page>,
    pub news: Vec<NewsItem>,
    pub services: Vec<Service>,
    pub doctors: Vec<Doctor>,
    pub menu_items: Vec<MenuItem>,
    pub contact_groups: Vec<ContactGroupWithDetails>,
    pub users: Vec<User>,
    pub surveys: Vec<Survey>,
    pub settings: Vec<Setting>,
}

/// Entities edited through the plain save/delete cycle.
pub trait Collected: Entity + Validate {
    fn collection(data: &mut Collections) -> &mut Vec<Self>;
}

macro_rules! impl_collected {
    ($($ty:ty => $field:ident),* $(,)?) => {
        $(
            impl Collected for $ty {
                fn collection(data: &mut Collections) -> &mut Vec<Self> {
                    &mut data.$field
                }
            }
        )*
    };
}

impl_collected!(
    Page => pages,
    NewsItem => news,
    Service => services,
    Doctor => doctors,
    User => users,
    Survey => surveys,
);

/// Append `saved`, or replace the row with the same id.
pub fn apply_saved<E: Entity>(items: &mut Vec<E>, saved: E) {
    match items
        .iter_mut()
        .find(|item| item.id().is_some() && item.id() == saved.id())
    {
        Some(slot) => *slot = saved,
        None => items.push(saved),
    }
}

pub struct AdminState<B: AdminBackend + ?Sized> {
    backend: Arc<B>,
    data: Collections,
}

impl<B: AdminBackend + ?Sized> AdminState<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            data: Collections::default(),
        }
    }

    /// Fetch every collection, concurrently.
    pub async fn load_all(&mut self) -> Result<()> {
        let b = self.backend.as_ref();
        let (pages, news, services, doctors, menu_items, contact_groups, users, surveys, settings) =
            tokio::try_join!(
                Repository::<Page>::list(b),
                Repository::<NewsItem>::list(b),
                Repository::<Service>::list(b),
                Repository::<Doctor>::list(b),
                Repository::<MenuItem>::list(b),
                b.contact_groups(),
                Repository::<User>::list(b),
                Repository::<Survey>::list(b),
                b.settings(),
            )?;

        self.data = Collections {
            pages,
            news,
            services,
            doctors,
            menu_items,
            contact_groups,
            users,
            surveys,
            settings,
        };
        info!(
            "📦 Admin state loaded: {} pages, {} news, {} menu items",
            self.data.pages.len(),
            self.data.news.len(),
            self.data.menu_items.len()
        );
        Ok(())
    }

    pub fn snapshot(&self) -> &Collections {
        &self.data
    }

    pub fn into_snapshot(self) -> Collections {
        self.data
    }

    pub async fn save<E>(&mut self, record: E) -> Result<E>
    where
        E: Collected,
        B: Repository<E>,
    {
        let saved = save_record(self.backend.as_ref(), &record).await?;
        apply_saved(E::collection(&mut self.data), saved.clone());
        Ok(saved)
    }

    pub async fn delete<E>(&mut self, id: i64) -> Result<()>
    where
        E: Collected,
        B: Repository<E>,
    {
        Repository::<E>::delete(self.backend.as_ref(), id).await?;
        E::collection(&mut self.data).retain(|item| item.id() != Some(id));
        Ok(())
    }

    pub async fn save_menu_item(&mut self, item: MenuItem) -> Result<MenuItem> {
        let outcome = save_menu_item(self.backend.as_ref(), &self.data.menu_items, item).await?;
        self.data.menu_items = outcome.items;
        Ok(outcome.item)
    }

    pub async fn delete_menu_item(&mut self, id: i64) -> Result<()> {
        self.data.menu_items =
            delete_menu_item(self.backend.as_ref(), &self.data.menu_items, id).await?;
        Ok(())
    }

    /// Cascade save. On a group failure every collection is refetched before
    /// the error is returned.
    pub async fn save_contact_group(&mut self, draft: &ContactGroupDraft) -> Result<CascadeOutcome> {
        match cascade_save(self.backend.as_ref(), draft).await {
            Ok(outcome) => {
                self.data.contact_groups = outcome.groups.clone();
                Ok(outcome)
            }
            Err(e) => {
                if let Err(refetch) = self.load_all().await {
                    warn!("Refetch after failed contact save also failed: {}", refetch);
                }
                Err(e)
            }
        }
    }

    pub async fn save_survey_tree(&mut self, tree: &SurveyTree) -> Result<SurveyTreeSave> {
        let outcome = save_survey_tree(self.backend.as_ref(), tree).await?;
        apply_saved(&mut self.data.surveys, outcome.tree.survey.clone());
        Ok(outcome)
    }
}
