use async_trait::async_trait;
use chrono::Utc;

use super::{delete_by_id, fetch_by_id, require_id, updated, Database, Repository};
use crate::error::{AppError, Result};
use crate::models::{Doctor, NewsItem, Page, Service};

#[async_trait]
impl Repository<Page> for Database {
    async fn list(&self) -> Result<Vec<Page>> {
        Ok(sqlx::query_as::<_, Page>("SELECT * FROM pages ORDER BY title")
            .fetch_all(self.pool())
            .await?)
    }

    async fn get(&self, id: i64) -> Result<Option<Page>> {
        fetch_by_id(self.pool(), "pages", id).await
    }

    async fn insert(&self, page: &Page) -> Result<Page> {
        sqlx::query_as::<_, Page>(
            r#"
            INSERT INTO pages (title, slug, content, meta_title, meta_description, published, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&page.title)
        .bind(&page.slug)
        .bind(&page.content)
        .bind(&page.meta_title)
        .bind(&page.meta_description)
        .bind(page.published)
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await
        .map_err(|e| AppError::from_write(e, "A page with this slug"))
    }

    async fn update(&self, page: &Page) -> Result<Page> {
        let id = require_id(page)?;
        let row = sqlx::query_as::<_, Page>(
            r#"
            UPDATE pages
            SET title = ?, slug = ?, content = ?, meta_title = ?, meta_description = ?,
                published = ?, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&page.title)
        .bind(&page.slug)
        .bind(&page.content)
        .bind(&page.meta_title)
        .bind(&page.meta_description)
        .bind(page.published)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::from_write(e, "A page with this slug"))?;

        updated(row, id)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        delete_by_id(self.pool(), "pages", id, "page").await
    }
}

#[async_trait]
impl Repository<NewsItem> for Database {
    async fn list(&self) -> Result<Vec<NewsItem>> {
        Ok(sqlx::query_as::<_, NewsItem>(
            "SELECT * FROM news ORDER BY published_at IS NULL, published_at DESC, id DESC",
        )
        .fetch_all(self.pool())
        .await?)
    }

    async fn get(&self, id: i64) -> Result<Option<NewsItem>> {
        fetch_by_id(self.pool(), "news", id).await
    }

    async fn insert(&self, item: &NewsItem) -> Result<NewsItem> {
        sqlx::query_as::<_, NewsItem>(
            r#"
            INSERT INTO news (title, slug, summary, content, image_url, published, published_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&item.title)
        .bind(&item.slug)
        .bind(&item.summary)
        .bind(&item.content)
        .bind(&item.image_url)
        .bind(item.published)
        .bind(publication_date(item))
        .fetch_one(self.pool())
        .await
        .map_err(|e| AppError::from_write(e, "A news item with this slug"))
    }

    async fn update(&self, item: &NewsItem) -> Result<NewsItem> {
        let id = require_id(item)?;
        let row = sqlx::query_as::<_, NewsItem>(
            r#"
            UPDATE news
            SET title = ?, slug = ?, summary = ?, content = ?, image_url = ?, published = ?,
                published_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&item.title)
        .bind(&item.slug)
        .bind(&item.summary)
        .bind(&item.content)
        .bind(&item.image_url)
        .bind(item.published)
        .bind(publication_date(item))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::from_write(e, "A news item with this slug"))?;

        updated(row, id)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        delete_by_id(self.pool(), "news", id, "news item").await
    }
}

// Published items get stamped the first time they go live.
fn publication_date(item: &NewsItem) -> Option<chrono::DateTime<Utc>> {
    match (item.published, item.published_at) {
        (true, None) => Some(Utc::now()),
        (_, existing) => existing,
    }
}

#[async_trait]
impl Repository<Service> for Database {
    async fn list(&self) -> Result<Vec<Service>> {
        Ok(
            sqlx::query_as::<_, Service>("SELECT * FROM services ORDER BY position, id")
                .fetch_all(self.pool())
                .await?,
        )
    }

    async fn get(&self, id: i64) -> Result<Option<Service>> {
        fetch_by_id(self.pool(), "services", id).await
    }

    async fn insert(&self, service: &Service) -> Result<Service> {
        sqlx::query_as::<_, Service>(
            r#"
            INSERT INTO services (title, slug, description, content, icon, position, published)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&service.title)
        .bind(&service.slug)
        .bind(&service.description)
        .bind(&service.content)
        .bind(&service.icon)
        .bind(service.position)
        .bind(service.published)
        .fetch_one(self.pool())
        .await
        .map_err(|e| AppError::from_write(e, "A service with this slug"))
    }

    async fn update(&self, service: &Service) -> Result<Service> {
        let id = require_id(service)?;
        let row = sqlx::query_as::<_, Service>(
            r#"
            UPDATE services
            SET title = ?, slug = ?, description = ?, content = ?, icon = ?, position = ?,
                published = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&service.title)
        .bind(&service.slug)
        .bind(&service.description)
        .bind(&service.content)
        .bind(&service.icon)
        .bind(service.position)
        .bind(service.published)
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::from_write(e, "A service with this slug"))?;

        updated(row, id)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        delete_by_id(self.pool(), "services", id, "service").await
    }
}

#[async_trait]
impl Repository<Doctor> for Database {
    async fn list(&self) -> Result<Vec<Doctor>> {
        Ok(
            sqlx::query_as::<_, Doctor>("SELECT * FROM doctors ORDER BY position, id")
                .fetch_all(self.pool())
                .await?,
        )
    }

    async fn get(&self, id: i64) -> Result<Option<Doctor>> {
        fetch_by_id(self.pool(), "doctors", id).await
    }

    async fn insert(&self, doctor: &Doctor) -> Result<Doctor> {
        Ok(sqlx::query_as::<_, Doctor>(
            r#"
            INSERT INTO doctors (full_name, specialty, bio, photo_url, position, published)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&doctor.full_name)
        .bind(&doctor.specialty)
        .bind(&doctor.bio)
        .bind(&doctor.photo_url)
        .bind(doctor.position)
        .bind(doctor.published)
        .fetch_one(self.pool())
        .await?)
    }

    async fn update(&self, doctor: &Doctor) -> Result<Doctor> {
        let id = require_id(doctor)?;
        let row = sqlx::query_as::<_, Doctor>(
            r#"
            UPDATE doctors
            SET full_name = ?, specialty = ?, bio = ?, photo_url = ?, position = ?, published = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&doctor.full_name)
        .bind(&doctor.specialty)
        .bind(&doctor.bio)
        .bind(&doctor.photo_url)
        .bind(doctor.position)
        .bind(doctor.published)
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        updated(row, id)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        delete_by_id(self.pool(), "doctors", id, "doctor").await
    }
}

impl Database {
    /// Published page by slug, `None` for drafts and unknown slugs.
    pub async fn published_page(&self, slug: &str) -> Result<Option<Page>> {
        Ok(
            sqlx::query_as::<_, Page>("SELECT * FROM pages WHERE slug = ? AND published = 1")
                .bind(slug)
                .fetch_optional(self.pool())
                .await?,
        )
    }

    pub async fn published_news(&self, limit: i64) -> Result<Vec<NewsItem>> {
        Ok(sqlx::query_as::<_, NewsItem>(
            "SELECT * FROM news WHERE published = 1 ORDER BY published_at DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?)
    }

    pub async fn published_services(&self) -> Result<Vec<Service>> {
        Ok(sqlx::query_as::<_, Service>(
            "SELECT * FROM services WHERE published = 1 ORDER BY position, id",
        )
        .fetch_all(self.pool())
        .await?)
    }

    pub async fn published_doctors(&self) -> Result<Vec<Doctor>> {
        Ok(sqlx::query_as::<_, Doctor>(
            "SELECT * FROM doctors WHERE published = 1 ORDER BY position, id",
        )
        .fetch_all(self.pool())
        .await?)
    }
}
