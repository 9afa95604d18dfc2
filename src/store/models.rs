use std::collections::BTreeSet;

use super::StoreError;

/// A persisted value. Every key holds exactly one of these shapes; mixing
/// shapes on the same key is a `WrongType` error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Scalar(String),
    List(Vec<String>),
    Set(BTreeSet<String>),
}

impl Value {
    pub fn scalar(s: impl Into<String>) -> Self {
        Value::Scalar(s.into())
    }

    pub fn int(n: i64) -> Self {
        Value::Scalar(n.to_string())
    }

    pub fn as_scalar(&self, key: &str) -> Result<&str, StoreError> {
        match self {
            Value::Scalar(s) => Ok(s),
            _ => Err(StoreError::WrongType {
                key: key.to_string(),
                expected: "scalar",
            }),
        }
    }

    pub fn as_i64(&self, key: &str) -> Result<i64, StoreError> {
        self.as_scalar(key)?
            .parse()
            .map_err(|_| StoreError::NotNumeric {
                key: key.to_string(),
            })
    }

    pub fn as_list(&self, key: &str) -> Result<&[String], StoreError> {
        match self {
            Value::List(items) => Ok(items),
            _ => Err(StoreError::WrongType {
                key: key.to_string(),
                expected: "list",
            }),
        }
    }

    pub fn as_set(&self, key: &str) -> Result<&BTreeSet<String>, StoreError> {
        match self {
            Value::Set(members) => Ok(members),
            _ => Err(StoreError::WrongType {
                key: key.to_string(),
                expected: "set",
            }),
        }
    }
}

/// A write applied inside an optimistic transaction commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Set { key: String, value: Value },
    Delete { key: String },
    ListRemoveOne { key: String, member: String },
    ListInsertBefore {
        key: String,
        anchor: String,
        member: String,
    },
    ListPushBack { key: String, member: String },
    /// Keeps the first `max_len` entries, drops the rest.
    ListTrim { key: String, max_len: usize },
}

impl WriteOp {
    pub fn key(&self) -> &str {
        match self {
            WriteOp::Set { key, .. }
            | WriteOp::Delete { key }
            | WriteOp::ListRemoveOne { key, .. }
            | WriteOp::ListInsertBefore { key, .. }
            | WriteOp::ListPushBack { key, .. }
            | WriteOp::ListTrim { key, .. } => key,
        }
    }
}

/// A consistent view of a set of watched keys, tagged with the version each
/// key had at read time. A commit against the snapshot succeeds only if none
/// of the watched keys has been written since.
#[derive(Debug, Clone)]
pub struct KeySnapshot {
    entries: Vec<(String, Option<Value>, u64)>,
}

impl KeySnapshot {
    pub fn new(entries: Vec<(String, Option<Value>, u64)>) -> Self {
        Self { entries }
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _, _)| k == key)
            .and_then(|(_, v, _)| v.as_ref())
    }

    pub fn versions(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(k, _, v)| (k.as_str(), *v))
    }

    pub fn watched_keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _, _)| k.as_str())
    }
}
