//! Typed partial-update builder.
//!
//! Update sets are collected as explicit (column, value) pairs, validated
//! against a per-table allow-list, and rendered as parameterized
//! placeholders. An update with zero recognized fields is a type-level
//! error, never a silent no-op.

use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("No fields to update")]
    NoFieldsToUpdate,

    #[error("Column not allowed: {0}")]
    ColumnNotAllowed(&'static str),

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Value for one patched column, typed so NULLs carry the right Postgres
/// type (a text NULL bound to a uuid column is a runtime type error).
#[derive(Debug, Clone)]
pub enum PatchValue {
    Text(Option<String>),
    Uuid(Option<Uuid>),
    Json(Option<JsonValue>),
}

pub struct Patch {
    table: &'static str,
    allowed: &'static [&'static str],
    sets: Vec<(&'static str, PatchValue)>,
}

impl Patch {
    pub fn new(table: &'static str, allowed: &'static [&'static str]) -> Self {
        Self {
            table,
            allowed,
            sets: Vec::new(),
        }
    }

    pub fn set(&mut self, column: &'static str, value: PatchValue) -> Result<(), PatchError> {
        if !self.allowed.contains(&column) {
            return Err(PatchError::ColumnNotAllowed(column));
        }
        self.sets.push((column, value));
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Render `UPDATE .. SET .. WHERE id = $n RETURNING ..`. The row id is
    /// always the last placeholder.
    pub fn update_sql(&self, returning: &str) -> Result<String, PatchError> {
        if self.sets.is_empty() {
            return Err(PatchError::NoFieldsToUpdate);
        }

        let assignments: Vec<String> = self
            .sets
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("\"{}\" = ${}", column, i + 1))
            .collect();

        Ok(format!(
            "UPDATE \"{}\" SET {}, updated_at = now() WHERE id = ${} RETURNING {}",
            self.table,
            assignments.join(", "),
            self.sets.len() + 1,
            returning,
        ))
    }

    /// Execute the patch against the row with the given id. `Ok(None)` means
    /// the row does not exist.
    pub async fn apply<T>(
        &self,
        pool: &PgPool,
        id: Uuid,
        returning: &str,
    ) -> Result<Option<T>, PatchError>
    where
        T: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
    {
        let sql = self.update_sql(returning)?;
        let mut query = sqlx::query_as::<_, T>(&sql);
        for (_, value) in &self.sets {
            query = match value {
                PatchValue::Text(v) => query.bind(v.clone()),
                PatchValue::Uuid(v) => query.bind(*v),
                PatchValue::Json(v) => query.bind(v.clone()),
            };
        }
        let row = query.bind(id).fetch_optional(pool).await?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[&str] = &["name", "slug", "metadata", "tenant_id"];

    #[test]
    fn renders_placeholders_in_set_order() {
        let mut patch = Patch::new("tenants", COLUMNS);
        patch
            .set("name", PatchValue::Text(Some("Acme".to_string())))
            .unwrap();
        patch.set("slug", PatchValue::Text(Some("acme".to_string()))).unwrap();

        let sql = patch.update_sql("id, name, slug").unwrap();
        assert_eq!(
            sql,
            "UPDATE \"tenants\" SET \"name\" = $1, \"slug\" = $2, updated_at = now() \
             WHERE id = $3 RETURNING id, name, slug"
        );
    }

    #[test]
    fn empty_patch_is_an_error() {
        let patch = Patch::new("tenants", COLUMNS);
        assert!(patch.is_empty());
        assert!(matches!(
            patch.update_sql("id"),
            Err(PatchError::NoFieldsToUpdate)
        ));
    }

    #[test]
    fn rejects_columns_outside_the_allow_list() {
        let mut patch = Patch::new("tenants", COLUMNS);
        let err = patch
            .set("password_hash", PatchValue::Text(None))
            .unwrap_err();
        assert!(matches!(err, PatchError::ColumnNotAllowed("password_hash")));
    }

    #[test]
    fn null_assignments_keep_their_placeholder() {
        let mut patch = Patch::new("users", &["tenant_id", "name"]);
        patch.set("tenant_id", PatchValue::Uuid(None)).unwrap();
        patch.set("name", PatchValue::Text(None)).unwrap();

        let sql = patch.update_sql("id").unwrap();
        assert!(sql.contains("\"tenant_id\" = $1"));
        assert!(sql.contains("\"name\" = $2"));
        assert!(sql.contains("WHERE id = $3"));
    }
}
