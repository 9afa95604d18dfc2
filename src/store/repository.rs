use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

use super::models::{KeySnapshot, Value, WriteOp};
use super::StoreError;

/// Shared mapping from string keys to typed values. All point operations are
/// atomic; multi-key read-modify-write sequences go through `snapshot` +
/// `commit`, the optimistic transaction pair (watch the keys, compute the
/// writes, commit only if nobody else wrote in between).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
    async fn mset(&self, pairs: Vec<(String, Value)>) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Adds `by` to the integer scalar at `key`, treating an absent key as
    /// zero. Returns the value after the increment.
    async fn increment(&self, key: &str, by: i64) -> Result<i64, StoreError>;

    /// Returns true if `member` was not already present.
    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError>;
    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError>;
    async fn set_members(&self, key: &str) -> Result<BTreeSet<String>, StoreError>;
    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, StoreError>;
    async fn set_len(&self, key: &str) -> Result<usize, StoreError>;

    async fn list_read(&self, key: &str) -> Result<Vec<String>, StoreError>;
    async fn list_push_back(&self, key: &str, member: &str) -> Result<(), StoreError>;
    async fn list_push_front(&self, key: &str, member: &str) -> Result<(), StoreError>;
    /// Keeps the first `max_len` entries of the list.
    async fn list_trim_front(&self, key: &str, max_len: usize) -> Result<(), StoreError>;

    /// Writes a scalar that reads as absent once `expires_at` has passed.
    async fn set_with_expiry(
        &self,
        key: &str,
        value: Value,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Physically removes entries whose expiry has passed. Returns how many
    /// were dropped. Reads already filter expired entries, so this is a
    /// space-reclamation batch, not a correctness requirement.
    async fn sweep_expired(&self) -> Result<usize, StoreError>;

    /// Live keys starting with `prefix`, sorted.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Reads the watched keys together with their current versions.
    async fn snapshot(&self, keys: &[String]) -> Result<KeySnapshot, StoreError>;

    /// Applies `ops` if none of the snapshot's keys changed since it was
    /// taken. Returns false on conflict; the caller retries from a fresh
    /// snapshot.
    async fn commit(
        &self,
        snapshot: &KeySnapshot,
        ops: Vec<WriteOp>,
    ) -> Result<bool, StoreError>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |deadline| deadline > now)
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    entries: HashMap<String, Entry>,
    // Versions outlive deletion so a transaction watching an absent key
    // still conflicts when another writer creates it.
    versions: HashMap<String, u64>,
}

impl StoreInner {
    fn live_value(&self, key: &str, now: DateTime<Utc>) -> Option<&Value> {
        self.entries
            .get(key)
            .filter(|entry| entry.live(now))
            .map(|entry| &entry.value)
    }

    fn version(&self, key: &str) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }

    fn bump(&mut self, key: &str) {
        *self.versions.entry(key.to_string()).or_insert(0) += 1;
    }

    fn put(&mut self, key: &str, value: Value) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: None,
            },
        );
        self.bump(key);
    }

    fn list_mut(&mut self, key: &str, now: DateTime<Utc>) -> Result<&mut Vec<String>, StoreError> {
        let entry = self
            .entries
            .entry(key.to_string())
            .and_modify(|entry| {
                if !entry.live(now) {
                    entry.value = Value::List(Vec::new());
                    entry.expires_at = None;
                }
            })
            .or_insert_with(|| Entry {
                value: Value::List(Vec::new()),
                expires_at: None,
            });
        match &mut entry.value {
            Value::List(items) => Ok(items),
            _ => Err(StoreError::WrongType {
                key: key.to_string(),
                expected: "list",
            }),
        }
    }

    fn set_mut(
        &mut self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<&mut BTreeSet<String>, StoreError> {
        let entry = self
            .entries
            .entry(key.to_string())
            .and_modify(|entry| {
                if !entry.live(now) {
                    entry.value = Value::Set(BTreeSet::new());
                    entry.expires_at = None;
                }
            })
            .or_insert_with(|| Entry {
                value: Value::Set(BTreeSet::new()),
                expires_at: None,
            });
        match &mut entry.value {
            Value::Set(members) => Ok(members),
            _ => Err(StoreError::WrongType {
                key: key.to_string(),
                expected: "set",
            }),
        }
    }

    fn apply(&mut self, op: WriteOp, now: DateTime<Utc>) -> Result<(), StoreError> {
        match op {
            WriteOp::Set { key, value } => {
                self.put(&key, value);
            }
            WriteOp::Delete { key } => {
                if self.entries.remove(&key).is_some() {
                    self.bump(&key);
                }
            }
            WriteOp::ListRemoveOne { key, member } => {
                let items = self.list_mut(&key, now)?;
                if let Some(pos) = items.iter().position(|item| *item == member) {
                    items.remove(pos);
                }
                self.bump(&key);
            }
            WriteOp::ListInsertBefore {
                key,
                anchor,
                member,
            } => {
                let items = self.list_mut(&key, now)?;
                match items.iter().position(|item| *item == anchor) {
                    Some(pos) => items.insert(pos, member),
                    None => items.push(member),
                }
                self.bump(&key);
            }
            WriteOp::ListPushBack { key, member } => {
                self.list_mut(&key, now)?.push(member);
                self.bump(&key);
            }
            WriteOp::ListTrim { key, max_len } => {
                let items = self.list_mut(&key, now)?;
                items.truncate(max_len);
                self.bump(&key);
            }
        }
        Ok(())
    }
}

/// In-memory `KeyValueStore` with per-key versioning for optimistic
/// transactions. Safe to share across workers behind an `Arc`.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.live_value(key, Utc::now()).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.put(key, value);
        Ok(())
    }

    async fn mset(&self, pairs: Vec<(String, Value)>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        for (key, value) in pairs {
            inner.put(&key, value);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let removed = inner.entries.remove(key).is_some();
        if removed {
            inner.bump(key);
        }
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.live_value(key, Utc::now()).is_some())
    }

    async fn increment(&self, key: &str, by: i64) -> Result<i64, StoreError> {
        let mut inner = self.inner.write().await;
        let current = match inner.live_value(key, Utc::now()) {
            Some(value) => value.as_i64(key)?,
            None => 0,
        };
        let next = current + by;
        inner.put(key, Value::int(next));
        Ok(next)
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let added = inner.set_mut(key, now)?.insert(member.to_string());
        inner.bump(key);
        Ok(added)
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let removed = inner.set_mut(key, now)?.remove(member);
        inner.bump(key);
        Ok(removed)
    }

    async fn set_members(&self, key: &str) -> Result<BTreeSet<String>, StoreError> {
        let inner = self.inner.read().await;
        match inner.live_value(key, Utc::now()) {
            Some(value) => Ok(value.as_set(key)?.clone()),
            None => Ok(BTreeSet::new()),
        }
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let inner = self.inner.read().await;
        match inner.live_value(key, Utc::now()) {
            Some(value) => Ok(value.as_set(key)?.contains(member)),
            None => Ok(false),
        }
    }

    async fn set_len(&self, key: &str) -> Result<usize, StoreError> {
        let inner = self.inner.read().await;
        match inner.live_value(key, Utc::now()) {
            Some(value) => Ok(value.as_set(key)?.len()),
            None => Ok(0),
        }
    }

    async fn list_read(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.read().await;
        match inner.live_value(key, Utc::now()) {
            Some(value) => Ok(value.as_list(key)?.to_vec()),
            None => Ok(Vec::new()),
        }
    }

    async fn list_push_back(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        inner.list_mut(key, now)?.push(member.to_string());
        inner.bump(key);
        Ok(())
    }

    async fn list_push_front(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        inner.list_mut(key, now)?.insert(0, member.to_string());
        inner.bump(key);
        Ok(())
    }

    async fn list_trim_front(&self, key: &str, max_len: usize) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        inner.list_mut(key, now)?.truncate(max_len);
        inner.bump(key);
        Ok(())
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: Value,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Some(expires_at),
            },
        );
        inner.bump(key);
        Ok(())
    }

    async fn sweep_expired(&self) -> Result<usize, StoreError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| !entry.live(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            inner.entries.remove(key);
            inner.bump(key);
        }
        Ok(expired.len())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.read().await;
        let now = Utc::now();
        let mut keys: Vec<String> = inner
            .entries
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && entry.live(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn snapshot(&self, keys: &[String]) -> Result<KeySnapshot, StoreError> {
        let inner = self.inner.read().await;
        let now = Utc::now();
        let entries = keys
            .iter()
            .map(|key| {
                (
                    key.clone(),
                    inner.live_value(key, now).cloned(),
                    inner.version(key),
                )
            })
            .collect();
        Ok(KeySnapshot::new(entries))
    }

    async fn commit(
        &self,
        snapshot: &KeySnapshot,
        ops: Vec<WriteOp>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        for (key, version) in snapshot.versions() {
            if inner.version(key) != version {
                return Ok(false);
            }
        }
        let now = Utc::now();
        for op in ops {
            inner.apply(op, now)?;
        }
        Ok(true)
    }
}
