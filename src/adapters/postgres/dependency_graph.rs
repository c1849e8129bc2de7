//! PostgreSQL implementation of DependencyGraph.
//!
//! The edge writes are also exposed over any executor so the item
//! repository can apply them inside its save transaction.

use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool, Row};

use super::db_error;
use crate::domain::cascade::Dependency;
use crate::domain::foundation::{DomainError, EntityType, Uid};
use crate::ports::DependencyGraph;

#[derive(Clone)]
pub struct PostgresDependencyGraph {
    pool: PgPool,
}

impl PostgresDependencyGraph {
    /// Creates a new PostgresDependencyGraph.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DependencyGraph for PostgresDependencyGraph {
    async fn add(&self, dependency: Dependency) -> Result<(), DomainError> {
        insert_dependency(&self.pool, &dependency).await
    }

    async fn dependents_of(&self, source_uid: &Uid) -> Result<Vec<Dependency>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT dependent_uid, dependent_type FROM item_dependencies
            WHERE source_uid = $1
            ORDER BY recorded_seq
            "#,
        )
        .bind(source_uid.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("fetch dependents"))?;

        rows.iter()
            .map(|row| {
                let decode = db_error("decode dependency");
                let dependent_uid: String = row.try_get("dependent_uid").map_err(&decode)?;
                let dependent_type: String = row.try_get("dependent_type").map_err(&decode)?;
                Ok(Dependency::new(
                    source_uid.clone(),
                    Uid::new(dependent_uid)?,
                    EntityType::new(dependent_type)?,
                ))
            })
            .collect()
    }

    async fn is_referenced(&self, uid: &Uid) -> Result<bool, DomainError> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM item_dependencies WHERE source_uid = $1) AS referenced",
        )
        .bind(uid.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("check dependency"))?;

        row.try_get("referenced").map_err(db_error("decode dependency check"))
    }

    async fn remove_dependent(&self, dependent_uid: &Uid) -> Result<(), DomainError> {
        delete_incoming_edges(&self.pool, dependent_uid).await
    }
}

pub(crate) async fn insert_dependency<'e, E>(executor: E, dependency: &Dependency) -> Result<(), DomainError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO item_dependencies (source_uid, dependent_uid, dependent_type)
        VALUES ($1, $2, $3)
        ON CONFLICT (source_uid, dependent_uid) DO NOTHING
        "#,
    )
    .bind(dependency.source_uid.as_str())
    .bind(dependency.dependent_uid.as_str())
    .bind(dependency.dependent_type.as_str())
    .execute(executor)
    .await
    .map_err(db_error("insert dependency"))?;

    Ok(())
}

/// Removes every edge in which `dependent_uid` is the dependent.
pub(crate) async fn delete_incoming_edges<'e, E>(executor: E, dependent_uid: &Uid) -> Result<(), DomainError>
where
    E: PgExecutor<'e>,
{
    sqlx::query("DELETE FROM item_dependencies WHERE dependent_uid = $1")
        .bind(dependent_uid.as_str())
        .execute(executor)
        .await
        .map_err(db_error("delete dependency"))?;

    Ok(())
}
