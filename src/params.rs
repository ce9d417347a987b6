// src/params.rs

//! Parameter resolution context.
//!
//! The design-tree interpreter binds parameters (durations, colors, positions,
//! accepted responses...) before handing units to the presentation engine. The
//! context keeps one value stack per key: entering a scope pushes, leaving it
//! pops, and lookups see the innermost binding.

use crate::color::Color;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// A parameter value as bound by the interpreter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<ParamValue>),
}

impl ParamValue {
    fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::Text(_) => "text",
            ParamValue::List(_) => "list",
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
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

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// Lookup or conversion failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("parameter '{0}' is not bound")]
    Unbound(String),
    #[error("parameter '{key}' expected {expected}, found {found}")]
    WrongType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("parameter '{key}' has invalid value: {reason}")]
    Invalid { key: String, reason: String },
    #[error("scope underflow: pop of unbound parameter '{0}'")]
    Underflow(String),
}

/// Scoped parameter store with an explicit stack per key.
#[derive(Debug, Clone, Default)]
pub struct ParamContext {
    stacks: HashMap<String, Vec<ParamValue>>,
}

impl ParamContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` in a new innermost scope for `key`.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.stacks
            .entry(key.into())
            .or_default()
            .push(value.into());
    }

    /// Leaves the innermost scope for `key`, returning the value it held.
    pub fn pop(&mut self, key: &str) -> Result<ParamValue, ParamError> {
        let stack = self
            .stacks
            .get_mut(key)
            .ok_or_else(|| ParamError::Underflow(key.to_string()))?;
        let value = stack
            .pop()
            .ok_or_else(|| ParamError::Underflow(key.to_string()))?;
        if stack.is_empty() {
            self.stacks.remove(key);
        }
        Ok(value)
    }

    /// Replaces the innermost binding, or binds at the outermost scope.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let stack = self.stacks.entry(key.into()).or_default();
        match stack.last_mut() {
            Some(top) => *top = value.into(),
            None => stack.push(value.into()),
        }
    }

    /// Number of nested bindings for `key`.
    pub fn depth(&self, key: &str) -> usize {
        self.stacks.get(key).map_or(0, Vec::len)
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.stacks.get(key).and_then(|s| s.last())
    }

    fn require(&self, key: &str) -> Result<&ParamValue, ParamError> {
        self.get(key)
            .ok_or_else(|| ParamError::Unbound(key.to_string()))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, ParamError> {
        match self.require(key)? {
            ParamValue::Bool(b) => Ok(*b),
            ParamValue::Int(i) => Ok(*i != 0),
            other => Err(wrong_type(key, "bool", other)),
        }
    }

    pub fn get_i64(&self, key: &str) -> Result<i64, ParamError> {
        match self.require(key)? {
            ParamValue::Int(i) => Ok(*i),
            ParamValue::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
            other => Err(wrong_type(key, "int", other)),
        }
    }

    pub fn get_f64(&self, key: &str) -> Result<f64, ParamError> {
        match self.require(key)? {
            ParamValue::Int(i) => Ok(*i as f64),
            ParamValue::Float(f) => Ok(*f),
            other => Err(wrong_type(key, "float", other)),
        }
    }

    pub fn get_text(&self, key: &str) -> Result<&str, ParamError> {
        match self.require(key)? {
            ParamValue::Text(s) => Ok(s),
            other => Err(wrong_type(key, "text", other)),
        }
    }

    /// Durations are bound in (possibly fractional) milliseconds.
    pub fn get_duration_ms(&self, key: &str) -> Result<Duration, ParamError> {
        let ms = self.get_f64(key)?;
        Duration::try_from_secs_f64(ms / 1000.0).map_err(|_| ParamError::Invalid {
            key: key.to_string(),
            reason: format!("duration must be a non-negative number of ms in range, got {ms}"),
        })
    }

    pub fn get_color(&self, key: &str) -> Result<Color, ParamError> {
        let text = self.get_text(key)?;
        Color::parse(text).ok_or_else(|| ParamError::Invalid {
            key: key.to_string(),
            reason: format!("'{text}' is not a color"),
        })
    }

    /// A list of integer codes, or a single integer.
    pub fn get_codes(&self, key: &str) -> Result<Vec<u32>, ParamError> {
        let to_code = |v: &ParamValue| match v {
            ParamValue::Int(i) if *i >= 0 => Ok(*i as u32),
            other => Err(wrong_type(key, "non-negative int", other)),
        };
        match self.require(key)? {
            ParamValue::List(items) => items.iter().map(to_code).collect(),
            single => Ok(vec![to_code(single)?]),
        }
    }
}

fn wrong_type(key: &str, expected: &'static str, found: &ParamValue) -> ParamError {
    ParamError::WrongType {
        key: key.to_string(),
        expected,
        found: found.type_name(),
    }
}

/// A value that is either fixed at construction or looked up at recompute time.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamRef<T> {
    Fixed(T),
    Param(String),
}

impl<T> ParamRef<T> {
    pub fn param(key: impl Into<String>) -> Self {
        ParamRef::Param(key.into())
    }
}

impl<T> From<T> for ParamRef<T> {
    fn from(value: T) -> Self {
        ParamRef::Fixed(value)
    }
}

impl ParamRef<Duration> {
    pub fn resolve(&self, params: &ParamContext) -> Result<Duration, ParamError> {
        match self {
            ParamRef::Fixed(d) => Ok(*d),
            ParamRef::Param(key) => params.get_duration_ms(key),
        }
    }
}

impl ParamRef<Color> {
    pub fn resolve(&self, params: &ParamContext) -> Result<Color, ParamError> {
        match self {
            ParamRef::Fixed(c) => Ok(*c),
            ParamRef::Param(key) => params.get_color(key),
        }
    }
}

impl ParamRef<f64> {
    pub fn resolve(&self, params: &ParamContext) -> Result<f64, ParamError> {
        match self {
            ParamRef::Fixed(v) => Ok(*v),
            ParamRef::Param(key) => params.get_f64(key),
        }
    }
}

impl ParamRef<Vec<u32>> {
    pub fn resolve(&self, params: &ParamContext) -> Result<Vec<u32>, ParamError> {
        match self {
            ParamRef::Fixed(codes) => Ok(codes.clone()),
            ParamRef::Param(key) => params.get_codes(key),
        }
    }
}
