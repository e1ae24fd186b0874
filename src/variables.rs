//! Typed variable model.
//!
//! A deliberately small value system: enough for the item session to apply
//! defaults, merge candidate responses, compare against correct responses and
//! hand a coherent store to the rule evaluator. NULL is represented as `None`;
//! empty containers and empty strings are NULL as well.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{Error, Result};

/// Candidate responses submitted with an attempt. `None` clears a response.
pub type Responses = BTreeMap<String, Option<Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    Single,
    Multiple,
    Ordered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseType {
    Boolean,
    Integer,
    Float,
    String,
    Identifier,
    Duration,
}

/// A single typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "base_type", content = "value", rename_all = "snake_case")]
pub enum Scalar {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Identifier(String),
    Duration(#[serde(with = "humantime_serde")] Duration),
}

impl Scalar {
    pub fn base_type(&self) -> BaseType {
        match self {
            Scalar::Boolean(_) => BaseType::Boolean,
            Scalar::Integer(_) => BaseType::Integer,
            Scalar::Float(_) => BaseType::Float,
            Scalar::String(_) => BaseType::String,
            Scalar::Identifier(_) => BaseType::Identifier,
            Scalar::Duration(_) => BaseType::Duration,
        }
    }

    /// String content for string-like scalars.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) | Scalar::Identifier(s) => Some(s),
            _ => None,
        }
    }
}

/// A value with its cardinality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cardinality", content = "values", rename_all = "snake_case")]
pub enum Value {
    Single(Scalar),
    Multiple(Vec<Scalar>),
    Ordered(Vec<Scalar>),
}

impl Value {
    pub fn boolean(v: bool) -> Self {
        Value::Single(Scalar::Boolean(v))
    }

    pub fn integer(v: i64) -> Self {
        Value::Single(Scalar::Integer(v))
    }

    pub fn float(v: f64) -> Self {
        Value::Single(Scalar::Float(v))
    }

    pub fn string(v: impl Into<String>) -> Self {
        Value::Single(Scalar::String(v.into()))
    }

    pub fn identifier(v: impl Into<String>) -> Self {
        Value::Single(Scalar::Identifier(v.into()))
    }

    pub fn duration(v: Duration) -> Self {
        Value::Single(Scalar::Duration(v))
    }

    pub fn multiple_identifiers<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::Multiple(
            values
                .into_iter()
                .map(|v| Scalar::Identifier(v.into()))
                .collect(),
        )
    }

    pub fn cardinality(&self) -> Cardinality {
        match self {
            Value::Single(_) => Cardinality::Single,
            Value::Multiple(_) => Cardinality::Multiple,
            Value::Ordered(_) => Cardinality::Ordered,
        }
    }

    pub fn scalars(&self) -> &[Scalar] {
        match self {
            Value::Single(s) => std::slice::from_ref(s),
            Value::Multiple(v) | Value::Ordered(v) => v,
        }
    }

    /// Base type of the contained values; `None` for an empty container.
    pub fn base_type(&self) -> Option<BaseType> {
        self.scalars().first().map(Scalar::base_type)
    }

    pub fn is_null(&self) -> bool {
        match self {
            Value::Single(Scalar::String(s)) => s.is_empty(),
            Value::Single(_) => false,
            Value::Multiple(v) | Value::Ordered(v) => v.is_empty(),
        }
    }

    pub fn size(&self) -> usize {
        if self.is_null() {
            0
        } else {
            self.scalars().len()
        }
    }

    pub fn contains(&self, needle: &Scalar) -> bool {
        self.scalars().iter().any(|s| s == needle)
    }

    /// QTI equality: multiple containers compare as multisets, ordered
    /// containers as sequences, NULL equals nothing.
    pub fn qti_eq(&self, other: &Value) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        match (self, other) {
            (Value::Single(a), Value::Single(b)) => a == b,
            (Value::Ordered(a), Value::Ordered(b)) => a == b,
            (Value::Multiple(a), Value::Multiple(b)) => {
                if a.len() != b.len() {
                    return false;
                }
                let mut remaining: Vec<&Scalar> = b.iter().collect();
                for scalar in a {
                    match remaining.iter().position(|s| *s == scalar) {
                        Some(idx) => {
                            remaining.swap_remove(idx);
                        }
                        None => return false,
                    }
                }
                true
            }
            _ => false,
        }
    }
}

/// Equality of two possibly-NULL values, where NULL equals NULL.
pub fn nullable_eq(a: Option<&Value>, b: Option<&Value>) -> bool {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.qti_eq(b),
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Response,
    Outcome,
    Template,
}

/// Who scores an outcome when response processing does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalScored {
    Human,
    ExternalMachine,
}

/// Declaration of a response, outcome or template variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub identifier: String,
    pub kind: VariableKind,
    #[serde(default = "default_cardinality")]
    pub cardinality: Cardinality,
    pub base_type: BaseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_scored: Option<ExternalScored>,
}

fn default_cardinality() -> Cardinality {
    Cardinality::Single
}

impl VariableDeclaration {
    pub fn new(
        identifier: impl Into<String>,
        kind: VariableKind,
        cardinality: Cardinality,
        base_type: BaseType,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            cardinality,
            base_type,
            default_value: None,
            correct_response: None,
            external_scored: None,
        }
    }

    pub fn response(
        identifier: impl Into<String>,
        cardinality: Cardinality,
        base_type: BaseType,
    ) -> Self {
        Self::new(identifier, VariableKind::Response, cardinality, base_type)
    }

    pub fn outcome(
        identifier: impl Into<String>,
        cardinality: Cardinality,
        base_type: BaseType,
    ) -> Self {
        Self::new(identifier, VariableKind::Outcome, cardinality, base_type)
    }

    pub fn template(
        identifier: impl Into<String>,
        cardinality: Cardinality,
        base_type: BaseType,
    ) -> Self {
        Self::new(identifier, VariableKind::Template, cardinality, base_type)
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_correct_response(mut self, value: Value) -> Self {
        self.correct_response = Some(value);
        self
    }

    pub fn with_external_scored(mut self, scored: ExternalScored) -> Self {
        self.external_scored = Some(scored);
        self
    }

    /// Check that `value` fits this declaration. NULL always fits.
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        value.cardinality() == self.cardinality
            && value
                .scalars()
                .iter()
                .all(|s| s.base_type() == self.base_type)
    }
}

/// A declared variable and its current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub declaration: VariableDeclaration,
    pub value: Option<Value>,
}

impl Variable {
    pub fn is_null(&self) -> bool {
        self.value.as_ref().map_or(true, Value::is_null)
    }

    pub fn is_default(&self) -> bool {
        nullable_eq(self.value.as_ref(), self.declaration.default_value.as_ref())
    }
}

/// Identifier-keyed variable store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableStore {
    variables: BTreeMap<String, Variable>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a variable with a NULL value. Re-declaring replaces the
    /// previous declaration and value.
    pub fn declare(&mut self, declaration: VariableDeclaration) {
        self.variables.insert(
            declaration.identifier.clone(),
            Variable {
                declaration,
                value: None,
            },
        );
    }

    pub fn has(&self, identifier: &str) -> bool {
        self.variables.contains_key(identifier)
    }

    pub fn get(&self, identifier: &str) -> Option<&Variable> {
        self.variables.get(identifier)
    }

    /// Current value; `None` when undeclared or NULL.
    pub fn value(&self, identifier: &str) -> Option<&Value> {
        self.variables
            .get(identifier)
            .and_then(|v| v.value.as_ref())
            .filter(|v| !v.is_null())
    }

    pub fn set(&mut self, identifier: &str, value: Option<Value>) -> Result<()> {
        let variable = self
            .variables
            .get_mut(identifier)
            .ok_or_else(|| Error::not_found(format!("unknown variable: {}", identifier)))?;

        if let Some(ref v) = value {
            if !variable.declaration.accepts(v) {
                return Err(Error::validation(format!(
                    "value {:?} does not match declaration of {} ({:?}, {:?})",
                    v,
                    identifier,
                    variable.declaration.cardinality,
                    variable.declaration.base_type
                )));
            }
        }
        variable.value = value;
        Ok(())
    }

    /// Check a value against the declaration without storing it.
    pub fn check(&self, identifier: &str, value: Option<&Value>) -> Result<()> {
        let variable = self
            .variables
            .get(identifier)
            .ok_or_else(|| Error::not_found(format!("unknown variable: {}", identifier)))?;
        match value {
            Some(v) if !variable.declaration.accepts(v) => Err(Error::validation(format!(
                "value {:?} does not match declaration of {}",
                v, identifier
            ))),
            _ => Ok(()),
        }
    }

    pub fn reset_to_default(&mut self, identifier: &str) -> Result<()> {
        let variable = self
            .variables
            .get_mut(identifier)
            .ok_or_else(|| Error::not_found(format!("unknown variable: {}", identifier)))?;
        variable.value = variable.declaration.default_value.clone();
        Ok(())
    }

    pub fn is_null(&self, identifier: &str) -> bool {
        self.variables.get(identifier).map_or(true, Variable::is_null)
    }

    pub fn contains(&self, identifier: &str, needle: &Scalar) -> bool {
        self.value(identifier).map_or(false, |v| v.contains(needle))
    }

    pub fn size(&self, identifier: &str) -> usize {
        self.value(identifier).map_or(0, Value::size)
    }

    /// QTI equality between the stored value and `other`.
    pub fn equals(&self, identifier: &str, other: &Value) -> bool {
        self.value(identifier).map_or(false, |v| v.qti_eq(other))
    }

    pub fn identifiers(&self, kind: VariableKind) -> Vec<String> {
        self.variables
            .values()
            .filter(|v| v.declaration.kind == kind)
            .map(|v| v.declaration.identifier.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Copy every variable of `other` under `prefix.IDENTIFIER`.
    pub fn extend_prefixed(&mut self, prefix: &str, other: &VariableStore) {
        for (identifier, variable) in &other.variables {
            let key = format!("{}.{}", prefix, identifier);
            let mut copy = variable.clone();
            copy.declaration.identifier = key.clone();
            self.variables.insert(key, copy);
        }
    }
}
