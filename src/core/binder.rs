//! Parameter binding and list expansion
//!
//! Binding happens in two steps. [`bind`] is a pure rewrite of the command text: every
//! list-valued parameter replaces its placeholder with one placeholder per element
//! (`:ids` becomes `:ids__0,:ids__1,...`). [`BoundCommand::attach`] then resolves each
//! binding against a prepared statement.
//!
//! The rewrite is a plain substring replacement. A list parameter whose placeholder is a
//! prefix of another placeholder (`:tag` and `:tags`) rewrites both.

use super::error::{DatabaseError, Result};
use super::parameter::{ParameterValue, QueryParameter};
use super::value::DatabaseValue;
use rusqlite::Statement;

/// Prefixes SQLite accepts for named parameters
pub const PLACEHOLDER_PREFIXES: [char; 3] = [':', '@', '$'];

/// Separator between a list placeholder and its element index
const EXPANSION_SEPARATOR: &str = "__";

/// A single resolved binding
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub value: DatabaseValue,
}

/// Command text after list expansion, with its flat list of bindings
#[derive(Debug, Clone, PartialEq)]
pub struct BoundCommand {
    pub text: String,
    pub bindings: Vec<Binding>,
}

/// Whether a parameter name already carries a placeholder prefix
pub fn has_prefix(name: &str) -> bool {
    name.starts_with(PLACEHOLDER_PREFIXES)
}

/// Placeholder tokens a parameter name may appear as, in lookup order
pub fn placeholder_candidates(name: &str) -> Vec<String> {
    if has_prefix(name) {
        vec![name.to_string()]
    } else {
        PLACEHOLDER_PREFIXES
            .iter()
            .map(|prefix| format!("{}{}", prefix, name))
            .collect()
    }
}

/// Expand list parameters and flatten all parameters into bindings
///
/// # Errors
///
/// Returns [`DatabaseError::BindingError`] if a list parameter's placeholder does not
/// occur in the command text.
pub fn bind(command_text: &str, parameters: &[QueryParameter]) -> Result<BoundCommand> {
    let mut text = command_text.to_string();
    let mut bindings = Vec::with_capacity(parameters.len());

    for parameter in parameters {
        match parameter.value() {
            ParameterValue::Value(value) => bindings.push(Binding {
                name: parameter.name().to_string(),
                value: value.clone(),
            }),
            ParameterValue::List(values) => {
                let token = placeholder_candidates(parameter.name())
                    .into_iter()
                    .find(|candidate| text.contains(candidate.as_str()))
                    .ok_or_else(|| {
                        DatabaseError::binding(format!(
                            "placeholder for list parameter '{}' not found in command text",
                            parameter.name()
                        ))
                    })?;

                let names: Vec<String> = (0..values.len())
                    .map(|index| format!("{}{}{}", token, EXPANSION_SEPARATOR, index))
                    .collect();

                tracing::trace!(
                    placeholder = %token,
                    elements = values.len(),
                    "expanding list parameter"
                );

                text = text.replace(token.as_str(), &names.join(","));
                bindings.extend(names.into_iter().zip(values.iter().cloned()).map(
                    |(name, value)| Binding { name, value },
                ));
            }
        }
    }

    Ok(BoundCommand { text, bindings })
}

impl BoundCommand {
    /// Names of all bindings, for diagnostics
    pub fn parameter_names(&self) -> Vec<String> {
        self.bindings.iter().map(|b| b.name.clone()).collect()
    }

    /// Attach every binding to the statement prepared from `self.text`
    ///
    /// Bindings the statement does not reference are skipped.
    pub fn attach(&self, statement: &mut Statement<'_>) -> Result<()> {
        for binding in &self.bindings {
            match resolve_index(statement, &binding.name)? {
                Some(index) => statement
                    .raw_bind_parameter(index, &binding.value)
                    .map_err(|e| {
                        DatabaseError::binding(format!(
                            "failed to bind parameter '{}': {}",
                            binding.name, e
                        ))
                    })?,
                None => tracing::debug!(
                    parameter = %binding.name,
                    "parameter not referenced by command, skipped"
                ),
            }
        }
        Ok(())
    }
}

fn resolve_index(statement: &Statement<'_>, name: &str) -> Result<Option<usize>> {
    for candidate in placeholder_candidates(name) {
        let index = statement.parameter_index(&candidate).map_err(|e| {
            DatabaseError::binding(format!("invalid parameter name '{}': {}", name, e))
        })?;
        if index.is_some() {
            return Ok(index);
        }
    }
    Ok(None)
}
