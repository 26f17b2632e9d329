//! Named query parameters and prepared commands

use super::value::DatabaseValue;

/// Value carried by a query parameter
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    /// Single value bound directly to its placeholder
    Value(DatabaseValue),
    /// Sequence of values expanded into one placeholder per element
    List(Vec<DatabaseValue>),
}

/// A named parameter binding
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParameter {
    name: String,
    value: ParameterValue,
    is_output: bool,
}

impl QueryParameter {
    /// Create a parameter with a single value
    ///
    /// The name may be bare (`ID`) or carry a SQLite prefix (`:ID`, `@ID`, `$ID`).
    pub fn new(name: impl Into<String>, value: impl Into<DatabaseValue>) -> Self {
        Self {
            name: name.into(),
            value: ParameterValue::Value(value.into()),
            is_output: false,
        }
    }

    /// Create a list parameter, e.g. for `IN (:ids)` predicates
    ///
    /// `None` elements bind as NULL.
    pub fn list<I, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        Self {
            name: name.into(),
            value: ParameterValue::List(values.into_iter().map(Into::into).collect()),
            is_output: false,
        }
    }

    /// Parameter list containing a single parameter
    pub fn single(name: impl Into<String>, value: impl Into<DatabaseValue>) -> Vec<Self> {
        vec![Self::new(name, value)]
    }

    /// Mark the parameter as output-direction
    pub fn output(mut self) -> Self {
        self.is_output = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &ParameterValue {
        &self.value
    }

    pub fn is_output(&self) -> bool {
        self.is_output
    }
}

/// Command text plus its parameters, executed as one step of a transactional batch
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCommand {
    command_text: String,
    parameters: Vec<QueryParameter>,
}

impl PreparedCommand {
    /// Create a command without parameters
    pub fn new(command_text: impl Into<String>) -> Self {
        Self {
            command_text: command_text.into(),
            parameters: Vec::new(),
        }
    }

    /// Create a command with parameters
    pub fn with_parameters(
        command_text: impl Into<String>,
        parameters: impl IntoIterator<Item = QueryParameter>,
    ) -> Self {
        Self {
            command_text: command_text.into(),
            parameters: parameters.into_iter().collect(),
        }
    }

    pub fn command_text(&self) -> &str {
        &self.command_text
    }

    pub fn parameters(&self) -> &[QueryParameter] {
        &self.parameters
    }
}
