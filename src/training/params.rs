//! Hyperparameter values, parameter sets and search grids

use crate::error::{Result, TrainerError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Int(i64),
    /// Unsigned value beyond the `Int` range, used for seeds
    UInt(u64),
    Float(f64),
    Bool(bool),
    Str(String),
}

/// Hyperparameter assignment, ordered by name
pub type Params = BTreeMap<String, ParamValue>;

impl ParamValue {
    /// Get as float; integers are widened
    pub fn as_f64(&self, name: &str) -> Result<f64> {
        match self {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            ParamValue::UInt(v) => Ok(*v as f64),
            other => Err(TrainerError::invalid_param(name, other, "expected a number")),
        }
    }

    /// Get as a non-negative integer
    pub fn as_usize(&self, name: &str) -> Result<usize> {
        match self {
            ParamValue::Int(v) if *v >= 0 => Ok(*v as usize),
            ParamValue::UInt(v) if usize::try_from(*v).is_ok() => Ok(*v as usize),
            other => Err(TrainerError::invalid_param(
                name,
                other,
                "expected a non-negative integer",
            )),
        }
    }

    /// Get as bool
    pub fn as_bool(&self, name: &str) -> Result<bool> {
        match self {
            ParamValue::Bool(v) => Ok(*v),
            other => Err(TrainerError::invalid_param(name, other, "expected a boolean")),
        }
    }

    /// Get as string
    pub fn as_str(&self, name: &str) -> Result<&str> {
        match self {
            ParamValue::Str(v) => Ok(v.as_str()),
            other => Err(TrainerError::invalid_param(name, other, "expected a string")),
        }
    }

    /// Optional depth-like parameter: `Str("none")` maps to `None`
    pub fn as_optional_usize(&self, name: &str) -> Result<Option<usize>> {
        match self {
            ParamValue::Str(s) if s.eq_ignore_ascii_case("none") => Ok(None),
            other => other.as_usize(name).map(Some),
        }
    }

    /// Optional seed: `Str("none")` maps to `None`, any non-negative integer
    /// is taken as is
    pub fn as_optional_seed(&self, name: &str) -> Result<Option<u64>> {
        match self {
            ParamValue::Str(s) if s.eq_ignore_ascii_case("none") => Ok(None),
            ParamValue::Int(v) if *v >= 0 => Ok(Some(*v as u64)),
            ParamValue::UInt(v) => Ok(Some(*v)),
            other => Err(TrainerError::invalid_param(
                name,
                other,
                "expected a non-negative integer or none",
            )),
        }
    }

    pub(crate) fn from_optional(value: Option<usize>) -> Self {
        match value {
            Some(v) => ParamValue::Int(v as i64),
            None => ParamValue::Str("none".to_string()),
        }
    }

    pub(crate) fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => i64::try_from(s).map_or(ParamValue::UInt(s), ParamValue::Int),
            None => ParamValue::Str("none".to_string()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::UInt(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Str(v) => f.write_str(v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

/// Render a parameter set as `name=value` pairs
pub fn format_params(params: &Params) -> String {
    if params.is_empty() {
        return "{}".to_string();
    }
    let pairs: Vec<String> = params
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect();
    format!("{{{}}}", pairs.join(", "))
}

/// Grid of candidate values per hyperparameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    entries: BTreeMap<String, Vec<ParamValue>>,
}

impl ParamGrid {
    /// Create an empty grid (model defaults only)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter with its candidate values
    pub fn with<V: Into<ParamValue>>(mut self, name: impl Into<String>, values: Vec<V>) -> Self {
        self.entries
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parameter names in iteration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn values(&self, name: &str) -> Option<&[ParamValue]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Number of combinations the grid expands to
    pub fn n_combinations(&self) -> usize {
        self.entries.values().map(Vec::len).product()
    }

    /// Expand into every combination. Names are visited in sorted order and the
    /// last name varies fastest. An empty grid yields one empty combination.
    pub fn combinations(&self) -> Vec<Params> {
        let mut combos: Vec<Params> = vec![Params::new()];
        for (name, values) in &self.entries {
            let mut next = Vec::with_capacity(combos.len() * values.len());
            for combo in &combos {
                for value in values {
                    let mut extended = combo.clone();
                    extended.insert(name.clone(), value.clone());
                    next.push(extended);
                }
            }
            combos = next;
        }
        combos
    }
}
