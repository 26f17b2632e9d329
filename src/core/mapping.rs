//! Row materialization strategies
//!
//! Every select call is governed by exactly one [`RowStrategy`]:
//!
//! - **Entity**: a fresh [`Entity`] per row, columns assigned to fields by name.
//! - **Scalar**: the first column of each row through [`FromDatabaseValue`].
//! - **Mapper**: a caller-supplied [`RowMapper`] or closure, one value per row.
//! - **Extractor**: a caller-supplied [`DataExtractor`] that consumes the live cursor
//!   in one pass and returns any number of values.
//!
//! [`ResultSet`] drives the strategy lazily over a [`Cursor`].

use super::convert::FromDatabaseValue;
use super::error::{DatabaseError, Result};
use super::record::{Cursor, Record};
use super::value::DatabaseValue;

/// A type whose fields can be populated from columns by name
///
/// Implement with the [`entity!`](crate::entity) macro rather than by hand.
pub trait Entity: Default {
    /// Table the entity is stored in
    const TABLE: &'static str;

    /// Names of the persisted fields, in declaration order
    fn field_names() -> &'static [&'static str];

    /// Assign `value` to the field called `name`
    ///
    /// Returns `Ok(false)` if there is no such field.
    fn set_field(&mut self, name: &str, value: &DatabaseValue) -> Result<bool>;

    /// Current value of the field called `name`
    fn field_value(&self, name: &str) -> Option<DatabaseValue>;
}

/// Implement [`Entity`] for a struct
///
/// Every listed field must implement [`FromDatabaseValue`](crate::FromDatabaseValue),
/// `Clone` and `Into<DatabaseValue>`.
///
/// ```
/// use rust_sqlite_data::entity;
///
/// #[derive(Debug, Default, Clone)]
/// struct Item {
///     id: i32,
///     name: String,
/// }
///
/// entity!(Item, table = "Item", { id, name });
/// ```
#[macro_export]
macro_rules! entity {
    ($ty:ident, table = $table:literal, { $($field:ident),+ $(,)? }) => {
        impl $crate::Entity for $ty {
            const TABLE: &'static str = $table;

            fn field_names() -> &'static [&'static str] {
                &[$(stringify!($field)),+]
            }

            fn set_field(
                &mut self,
                name: &str,
                value: &$crate::DatabaseValue,
            ) -> $crate::Result<bool> {
                match name {
                    $(
                        stringify!($field) => {
                            self.$field = $crate::FromDatabaseValue::from_db_value(value)?;
                            Ok(true)
                        }
                    )+
                    _ => Ok(false),
                }
            }

            fn field_value(&self, name: &str) -> Option<$crate::DatabaseValue> {
                match name {
                    $(stringify!($field) => Some($crate::DatabaseValue::from(self.$field.clone())),)+
                    _ => None,
                }
            }
        }
    };
}

/// Maps the current row of a cursor to a value
pub trait RowMapper<T> {
    fn map_row(&self, record: &Record<'_>) -> Result<T>;
}

/// Produces values from a whole cursor in one pass
pub trait DataExtractor<T> {
    fn extract(&self, cursor: &mut Cursor<'_>) -> Result<Vec<T>>;
}

/// [`DataExtractor`] that also receives caller-supplied context
pub trait DataExtractorWithArgs<T, A: ?Sized> {
    fn extract(&self, cursor: &mut Cursor<'_>, args: &A) -> Result<Vec<T>>;
}

type RowFn<T> = fn(&Record<'_>) -> Result<T>;

/// How the rows of one call become values of `T`
pub enum RowStrategy<'a, T> {
    Entity(RowFn<T>),
    Scalar(RowFn<T>),
    Mapper(Box<dyn FnMut(&Record<'_>) -> Result<T> + 'a>),
    Extractor(Box<dyn FnOnce(&mut Cursor<'_>) -> Result<Vec<T>> + 'a>),
}

impl<'a, T: Entity> RowStrategy<'a, T> {
    /// Populate a fresh entity from every row
    pub fn entity() -> Self {
        RowStrategy::Entity(populate_entity::<T>)
    }
}

impl<'a, T: FromDatabaseValue> RowStrategy<'a, T> {
    /// Convert the first column of every row
    pub fn scalar() -> Self {
        RowStrategy::Scalar(read_scalar::<T>)
    }
}

impl<'a, T: 'a> RowStrategy<'a, T> {
    /// Delegate every row to `mapper`
    pub fn mapper<M: RowMapper<T> + ?Sized>(mapper: &'a M) -> Self {
        RowStrategy::Mapper(Box::new(move |record: &Record<'_>| mapper.map_row(record)))
    }

    /// Delegate every row to a closure
    pub fn map_with<F>(f: F) -> Self
    where
        F: FnMut(&Record<'_>) -> Result<T> + 'a,
    {
        RowStrategy::Mapper(Box::new(f))
    }

    /// Hand the whole cursor to `extractor`
    pub fn extractor<E: DataExtractor<T> + ?Sized>(extractor: &'a E) -> Self {
        RowStrategy::Extractor(Box::new(move |cursor: &mut Cursor<'_>| {
            extractor.extract(cursor)
        }))
    }

    /// Hand the whole cursor and `args` to `extractor`
    pub fn extractor_with_args<E, A>(extractor: &'a E, args: &'a A) -> Self
    where
        E: DataExtractorWithArgs<T, A> + ?Sized,
        A: ?Sized,
    {
        RowStrategy::Extractor(Box::new(move |cursor: &mut Cursor<'_>| {
            extractor.extract(cursor, args)
        }))
    }

    /// Hand the whole cursor to a closure
    pub fn extract_with<F>(f: F) -> Self
    where
        F: FnOnce(&mut Cursor<'_>) -> Result<Vec<T>> + 'a,
    {
        RowStrategy::Extractor(Box::new(f))
    }
}

impl<T> RowStrategy<'_, T> {
    /// Short name for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            RowStrategy::Entity(_) => "entity",
            RowStrategy::Scalar(_) => "scalar",
            RowStrategy::Mapper(_) => "mapper",
            RowStrategy::Extractor(_) => "extractor",
        }
    }
}

/// Find the entity field a column maps to: exact name first, then ignoring ASCII case.
fn resolve_field<E: Entity>(column: &str) -> Option<&'static str> {
    let fields = E::field_names();
    fields
        .iter()
        .find(|field| **field == column)
        .or_else(|| fields.iter().find(|field| field.eq_ignore_ascii_case(column)))
        .copied()
}

/// Build an entity from the current row; columns without a matching field are ignored.
pub fn populate_entity<E: Entity>(record: &Record<'_>) -> Result<E> {
    let mut entity = E::default();
    for index in 0..record.column_count() {
        let column = record.column_name(index)?;
        let Some(field) = resolve_field::<E>(column) else {
            continue;
        };
        let value = record.value(index)?;
        entity
            .set_field(field, &value)
            .map_err(|e| e.in_column(column))?;
    }
    Ok(entity)
}

/// Read the first column of the current row as `T`
pub fn read_scalar<T: FromDatabaseValue>(record: &Record<'_>) -> Result<T> {
    record.get(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResultState {
    Open,
    Exhausted,
    Closed,
}

/// Lazy, single-pass sequence of materialized rows
///
/// Rows are produced on demand while the underlying cursor is open. The cursor is
/// released when the sequence is exhausted, when a row fails, or when [`close`] is
/// called; after `close`, further iteration yields a query error. The borrow of the
/// command prevents the sequence from outliving its session.
///
/// [`close`]: ResultSet::close
pub struct ResultSet<'s, 'a, T> {
    cursor: Option<Cursor<'s>>,
    command: &'s str,
    parameters: &'s [String],
    strategy: Option<RowStrategy<'a, T>>,
    buffered: Option<std::vec::IntoIter<T>>,
    state: ResultState,
}

impl<'s, 'a, T> ResultSet<'s, 'a, T> {
    pub(crate) fn new(cursor: Cursor<'s>, strategy: RowStrategy<'a, T>) -> Self {
        Self {
            command: cursor.command(),
            parameters: cursor.parameter_names(),
            cursor: Some(cursor),
            strategy: Some(strategy),
            buffered: None,
            state: ResultState::Open,
        }
    }

    /// Release the cursor without reading the remaining rows
    pub fn close(&mut self) {
        self.release();
        self.buffered = None;
        self.state = ResultState::Closed;
    }

    /// Command text the rows come from
    pub fn command(&self) -> &str {
        self.command
    }

    /// Whether the cursor has been released
    pub fn is_released(&self) -> bool {
        self.cursor.is_none()
    }

    fn release(&mut self) {
        self.cursor = None;
        self.strategy = None;
    }

    fn finish(&mut self, item: Option<Result<T>>) -> Option<Result<T>> {
        if !matches!(item, Some(Ok(_))) {
            self.release();
            self.state = ResultState::Exhausted;
        }
        item
    }
}

impl<T> Iterator for ResultSet<'_, '_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            ResultState::Exhausted => return None,
            ResultState::Closed => {
                return Some(Err(DatabaseError::query(
                    self.command,
                    self.parameters,
                    "result set was closed before iteration finished",
                )))
            }
            ResultState::Open => {}
        }

        if let Some(buffered) = self.buffered.as_mut() {
            let item = buffered.next().map(Ok);
            return self.finish(item);
        }

        let (Some(cursor), Some(strategy)) = (self.cursor.as_mut(), self.strategy.as_mut())
        else {
            self.state = ResultState::Exhausted;
            return None;
        };

        let item = match strategy {
            RowStrategy::Entity(map) | RowStrategy::Scalar(map) => match cursor.next_record() {
                Ok(Some(record)) => Some(map(&record)),
                Ok(None) => None,
                Err(e) => Some(Err(e)),
            },
            RowStrategy::Mapper(map) => match cursor.next_record() {
                Ok(Some(record)) => Some(map(&record)),
                Ok(None) => None,
                Err(e) => Some(Err(e)),
            },
            RowStrategy::Extractor(_) => {
                let Some(RowStrategy::Extractor(extract)) = self.strategy.take() else {
                    return None;
                };
                let extracted = extract(cursor);
                self.cursor = None;
                match extracted {
                    Ok(values) => {
                        let mut values = values.into_iter();
                        let first = values.next().map(Ok);
                        self.buffered = Some(values);
                        first
                    }
                    Err(e) => Some(Err(e)),
                }
            }
        };

        self.finish(item)
    }
}
