use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::domain::{ServiceContent, ServiceContentInput};

pub struct ServiceRepo {
    pool: PgPool,
}

impl ServiceRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Initialize service_contents table
    pub async fn init_tables(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS service_contents (
                id BIGSERIAL PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                image TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )"
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// List every service, oldest first
    pub async fn list(&self) -> Result<Vec<ServiceContent>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, title, description, image, created_at, updated_at
             FROM service_contents
             ORDER BY id ASC"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_service).collect())
    }

    /// List one page of services
    pub async fn list_page(&self, offset: i64, limit: i64) -> Result<Vec<ServiceContent>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, title, description, image, created_at, updated_at
             FROM service_contents
             ORDER BY id ASC
             OFFSET $1
             LIMIT $2"
        )
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_service).collect())
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM service_contents")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("count"))
    }

    pub async fn insert(&self, input: &ServiceContentInput) -> Result<ServiceContent, sqlx::Error> {
        let row = sqlx::query(
            "INSERT INTO service_contents (title, description, image)
             VALUES ($1, $2, $3)
             RETURNING id, title, description, image, created_at, updated_at"
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.image)
        .fetch_one(&self.pool)
        .await?;

        Ok(row_to_service(&row))
    }

    /// Replace a service; `None` when the id does not exist
    pub async fn update(
        &self,
        id: i64,
        input: &ServiceContentInput,
    ) -> Result<Option<ServiceContent>, sqlx::Error> {
        let row = sqlx::query(
            "UPDATE service_contents
             SET title = $2, description = $3, image = $4, updated_at = now()
             WHERE id = $1
             RETURNING id, title, description, image, created_at, updated_at"
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.image)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_service))
    }

    /// Returns whether a row was removed
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM service_contents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_service(row: &PgRow) -> ServiceContent {
    ServiceContent {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        image: row.get("image"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
