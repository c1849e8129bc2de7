//! PostgreSQL library registry.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::db_error;
use crate::domain::foundation::DomainError;
use crate::domain::versioning::Library;
use crate::ports::LibraryRegistry;

#[derive(Clone)]
pub struct PostgresLibraryRegistry {
    pool: PgPool,
}

impl PostgresLibraryRegistry {
    /// Creates a new PostgresLibraryRegistry.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Registers a library. An existing library with the same name is kept.
    pub async fn register(&self, library: &Library) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO libraries (name, is_editable)
            VALUES ($1, $2)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(&library.name)
        .bind(library.is_editable)
        .execute(&self.pool)
        .await
        .map_err(db_error("insert library"))?;

        Ok(())
    }
}

#[async_trait]
impl LibraryRegistry for PostgresLibraryRegistry {
    async fn find(&self, name: &str) -> Result<Library, DomainError> {
        let row = sqlx::query("SELECT name, is_editable FROM libraries WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("fetch library"))?;

        match row {
            Some(row) => {
                let decode = db_error("decode library");
                Ok(Library {
                    name: row.try_get("name").map_err(&decode)?,
                    is_editable: row.try_get("is_editable").map_err(&decode)?,
                })
            }
            None => Err(DomainError::not_found(format!("Library '{}' not found", name))
                .with_detail("library", name)),
        }
    }
}
