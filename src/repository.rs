//! Table-per-entity CRUD built on [`Connector`]
//!
//! Statements are generated from [`Entity::TABLE`] and [`Entity::field_names`]; the
//! primary key column is expected to be called `ID` (matched case-insensitively).
//! [`RepositoryHooks`] observe every insert, select and delete.

use crate::backends::sqlite::Connector;
use crate::core::{
    error::{DatabaseError, Result},
    mapping::{Entity, RowStrategy},
    parameter::QueryParameter,
    value::DatabaseValue,
};
use std::fmt;
use std::sync::Arc;

const KEY_COLUMN: &str = "ID";

/// Callbacks run around repository operations
///
/// Every method defaults to doing nothing. A `before_*` hook that fails aborts the
/// operation before any statement runs; the failure is returned to the caller.
pub trait RepositoryHooks<E>: Send + Sync {
    fn before_insert(&self, _entity: &E) -> Result<()> {
        Ok(())
    }

    /// Runs once the row is written
    fn after_insert(&self, _entity: &E) -> Result<()> {
        Ok(())
    }

    /// Runs on every entity read back, before it is handed to the caller
    fn after_select(&self, _entity: &mut E) -> Result<()> {
        Ok(())
    }

    fn before_delete(&self, _id: &DatabaseValue) -> Result<()> {
        Ok(())
    }

    /// Runs after the delete statement, whether or not a row matched
    fn after_delete(&self, _id: &DatabaseValue) -> Result<()> {
        Ok(())
    }
}

/// Hooks that do nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl<E> RepositoryHooks<E> for NoHooks {}

/// CRUD operations for one entity type
pub struct Repository<E> {
    connector: Connector,
    select_query: String,
    hooks: Arc<dyn RepositoryHooks<E>>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            connector: self.connector.clone(),
            select_query: self.select_query.clone(),
            hooks: Arc::clone(&self.hooks),
        }
    }
}

impl<E> fmt::Debug for Repository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("connector", &self.connector)
            .field("select_query", &self.select_query)
            .finish_non_exhaustive()
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(connector: Connector) -> Self {
        let select_query = format!("SELECT {} FROM [{}]", column_list(E::field_names()), E::TABLE);
        Self {
            connector,
            select_query,
            hooks: Arc::new(NoHooks),
        }
    }

    /// Replace the hooks run around each operation
    pub fn with_hooks(mut self, hooks: impl RepositoryHooks<E> + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    /// `SELECT [a],[b] FROM [Table]` for this entity
    pub fn select_query(&self) -> &str {
        &self.select_query
    }

    /// Insert every field of `entity`; returns whether a row was written
    pub fn insert(&self, entity: &E) -> Result<bool> {
        self.hooks.before_insert(entity)?;
        let (sql, parameters) = Self::insert_command(entity, E::field_names().iter().copied())?;
        let affected = self.connector.execute(&sql, &parameters)?;
        self.hooks.after_insert(entity)?;
        Ok(affected > 0)
    }

    /// Insert `entity` without its key field and return the row id SQLite assigned
    pub fn insert_with_row_id(&self, entity: &E) -> Result<i64> {
        self.hooks.before_insert(entity)?;
        let fields = E::field_names()
            .iter()
            .copied()
            .filter(|field| !field.eq_ignore_ascii_case(KEY_COLUMN));
        let (sql, parameters) = Self::insert_command(entity, fields)?;
        let (_, row_id) = self.connector.execute_with_row_id(&sql, &parameters)?;
        self.hooks.after_insert(entity)?;
        Ok(row_id)
    }

    /// Every stored entity
    pub fn all(&self) -> Result<Vec<E>> {
        let mut entities: Vec<E> =
            self.connector.select_many(&self.select_query, &[], RowStrategy::entity())?;
        for entity in &mut entities {
            self.hooks.after_select(entity)?;
        }
        Ok(entities)
    }

    /// The entity with key `id`, if any
    pub fn get_by_id(&self, id: impl Into<DatabaseValue>) -> Result<Option<E>> {
        let sql = format!("{} WHERE {}=:{}", self.select_query, KEY_COLUMN, KEY_COLUMN);
        let mut found: Option<E> = self.connector.select_first(
            &sql,
            &QueryParameter::single(KEY_COLUMN, id),
            RowStrategy::entity(),
        )?;
        if let Some(entity) = found.as_mut() {
            self.hooks.after_select(entity)?;
        }
        Ok(found)
    }

    /// Delete the entity with key `id`; returns whether a row was removed
    pub fn delete(&self, id: impl Into<DatabaseValue>) -> Result<bool> {
        let id = id.into();
        self.hooks.before_delete(&id)?;
        let sql = format!("DELETE FROM [{}] WHERE {}=:{}", E::TABLE, KEY_COLUMN, KEY_COLUMN);
        let affected = self
            .connector
            .execute(&sql, &QueryParameter::single(KEY_COLUMN, id.clone()))?;
        self.hooks.after_delete(&id)?;
        Ok(affected > 0)
    }

    pub fn count(&self) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM [{}]", E::TABLE);
        self.connector.select_one(&sql, &[], RowStrategy::scalar())
    }

    fn insert_command<'f>(
        entity: &E,
        fields: impl Iterator<Item = &'f str>,
    ) -> Result<(String, Vec<QueryParameter>)> {
        let mut columns = Vec::new();
        let mut parameters = Vec::new();
        for field in fields {
            let value = entity.field_value(field).ok_or_else(|| {
                DatabaseError::other(format!("{} has no field '{}'", E::TABLE, field))
            })?;
            columns.push(field);
            parameters.push(QueryParameter::new(field, value));
        }

        let placeholders: Vec<String> = columns.iter().map(|c| format!(":{}", c)).collect();
        let sql = format!(
            "INSERT INTO [{}] ({}) VALUES ({})",
            E::TABLE,
            column_list(&columns),
            placeholders.join(",")
        );
        Ok((sql, parameters))
    }
}

fn column_list(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|field| format!("[{}]", field))
        .collect::<Vec<_>>()
        .join(",")
}
