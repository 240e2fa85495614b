// Pre-configured trust table (identity -> authorised public keys).
//
// Readers take an `Arc` snapshot of an immutable map; writers clone the
// current map, modify the clone and swap it in. A handshake that looked up a
// snapshot never observes a half-applied administrative change.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::crypto::keys::PublicKey;
use crate::error::{Result, StrandBindError};
use crate::identity::Identity;

/// Supported trust-table JSON format version.
pub const TRUST_TABLE_VERSION: u32 = 1;

type Bindings = HashMap<Identity, Vec<PublicKey>>;

/// Shared, snapshot-consistent identity -> key table. Cloning shares the table.
#[derive(Clone, Default)]
pub struct TrustTable {
    inner: Arc<RwLock<Arc<Bindings>>>,
}

/// An immutable view of the table at one instant.
#[derive(Debug, Clone)]
pub struct TrustSnapshot {
    bindings: Arc<Bindings>,
}

impl TrustSnapshot {
    /// Every key authorised for `identity`, or `None` if the identity is unknown.
    pub fn lookup_binding(&self, identity: &Identity) -> Option<&[PublicKey]> {
        self.bindings.get(identity).map(Vec::as_slice)
    }

    pub fn is_authorised(&self, identity: &Identity, key: &PublicKey) -> bool {
        self.lookup_binding(identity)
            .map(|keys| keys.contains(key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl TrustTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot. Cheap: one read lock and one `Arc` clone.
    pub fn snapshot(&self) -> TrustSnapshot {
        TrustSnapshot {
            bindings: Arc::clone(&*self.inner.read()),
        }
    }

    /// Authorise `key` for `identity`. Returns `false` if it already was.
    pub fn insert(&self, identity: Identity, key: PublicKey) -> bool {
        self.update(|map| {
            let keys = map.entry(identity).or_default();
            if keys.contains(&key) {
                return false;
            }
            keys.push(key);
            true
        })
    }

    /// Revoke `key` for `identity`. Returns `false` if it was not present.
    pub fn remove(&self, identity: &Identity, key: &PublicKey) -> bool {
        self.update(|map| {
            let Some(keys) = map.get_mut(identity) else {
                return false;
            };
            let before = keys.len();
            keys.retain(|k| k != key);
            let removed = keys.len() != before;
            if keys.is_empty() {
                map.remove(identity);
            }
            removed
        })
    }

    /// Replace the whole table in one step.
    pub fn replace_all(&self, entries: impl IntoIterator<Item = (Identity, PublicKey)>) {
        let mut map = Bindings::new();
        for (identity, key) in entries {
            let keys = map.entry(identity).or_default();
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        *self.inner.write() = Arc::new(map);
    }

    /// Convenience for [`TrustSnapshot::lookup_binding`] on a fresh snapshot.
    pub fn lookup_binding(&self, identity: &Identity) -> Option<Vec<PublicKey>> {
        self.snapshot().lookup_binding(identity).map(<[_]>::to_vec)
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.inner.read().contains_key(identity)
    }

    /// Load a table from its JSON configuration form.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: TrustTableConfig = serde_json::from_str(json)
            .map_err(|e| StrandBindError::TrustTableConfig(e.to_string()))?;
        let table = Self::new();
        table.replace_all(config.into_entries()?);
        Ok(table)
    }

    /// Serialise the current snapshot to JSON, entries sorted by identity.
    pub fn to_json(&self) -> Result<String> {
        let snapshot = self.snapshot();
        let mut entries: Vec<TrustEntryConfig> = snapshot
            .bindings
            .iter()
            .flat_map(|(identity, keys)| {
                keys.iter().map(move |key| TrustEntryConfig {
                    identity: identity.to_string(),
                    public_key: hex::encode(key),
                })
            })
            .collect();
        entries.sort_by(|a, b| a.identity.cmp(&b.identity).then(a.public_key.cmp(&b.public_key)));
        serde_json::to_string_pretty(&TrustTableConfig {
            version: TRUST_TABLE_VERSION,
            entries,
        })
        .map_err(|e| StrandBindError::TrustTableConfig(e.to_string()))
    }

    fn update<R>(&self, f: impl FnOnce(&mut Bindings) -> R) -> R {
        let mut guard = self.inner.write();
        let mut next = Bindings::clone(&**guard);
        let result = f(&mut next);
        *guard = Arc::new(next);
        result
    }
}

impl std::fmt::Debug for TrustTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustTable")
            .field("identities", &self.snapshot().len())
            .finish()
    }
}

// ── JSON configuration ─────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct TrustTableConfig {
    version: u32,
    #[serde(default)]
    entries: Vec<TrustEntryConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TrustEntryConfig {
    identity: String,
    public_key: String,
}

impl TrustTableConfig {
    fn into_entries(self) -> Result<Vec<(Identity, PublicKey)>> {
        if self.version != TRUST_TABLE_VERSION {
            return Err(StrandBindError::TrustTableConfig(format!(
                "unsupported version {}",
                self.version
            )));
        }
        self.entries
            .into_iter()
            .map(|entry| {
                let identity = Identity::new(&entry.identity)
                    .map_err(|e| StrandBindError::TrustTableConfig(e.to_string()))?;
                let raw = hex::decode(&entry.public_key).map_err(|e| {
                    StrandBindError::TrustTableConfig(format!("{identity}: public_key: {e}"))
                })?;
                let key: PublicKey = raw.try_into().map_err(|raw: Vec<u8>| {
                    StrandBindError::TrustTableConfig(format!(
                        "{identity}: public_key must be 32 bytes, got {}",
                        raw.len()
                    ))
                })?;
                Ok((identity, key))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> Identity {
        Identity::new(name).unwrap()
    }

    #[test]
    fn insert_lookup_remove() {
        let table = TrustTable::new();
        assert!(table.insert(id("a.example"), [1u8; 32]));
        assert!(!table.insert(id("a.example"), [1u8; 32]));
        assert!(table.insert(id("a.example"), [2u8; 32]));

        let keys = table.lookup_binding(&id("a.example")).unwrap();
        assert_eq!(keys, vec![[1u8; 32], [2u8; 32]]);

        assert!(table.remove(&id("a.example"), &[1u8; 32]));
        assert!(table.remove(&id("a.example"), &[2u8; 32]));
        assert!(!table.contains(&id("a.example")));
        assert!(table.lookup_binding(&id("a.example")).is_none());
    }

    #[test]
    fn snapshot_is_unaffected_by_later_writes() {
        let table = TrustTable::new();
        table.insert(id("a.example"), [1u8; 32]);
        let before = table.snapshot();

        table.replace_all([(id("b.example"), [2u8; 32])]);

        assert!(before.is_authorised(&id("a.example"), &[1u8; 32]));
        assert!(before.lookup_binding(&id("b.example")).is_none());
        assert!(table.snapshot().is_authorised(&id("b.example"), &[2u8; 32]));
    }

    #[test]
    fn json_round_trip() {
        let json = format!(
            r#"{{ "version": 1, "entries": [
                {{ "identity": "Alice.Example", "public_key": "{}" }},
                {{ "identity": "bob.example", "public_key": "{}" }}
            ] }}"#,
            hex::encode([7u8; 32]),
            hex::encode([8u8; 32]),
        );
        let table = TrustTable::from_json(&json).unwrap();
        assert!(table.snapshot().is_authorised(&id("alice.example"), &[7u8; 32]));

        let reloaded = TrustTable::from_json(&table.to_json().unwrap()).unwrap();
        assert_eq!(reloaded.snapshot().len(), 2);
        assert!(reloaded.snapshot().is_authorised(&id("bob.example"), &[8u8; 32]));
    }

    #[test]
    fn json_rejects_bad_input() {
        let bad_version = r#"{ "version": 2, "entries": [] }"#;
        let short_key = r#"{ "version": 1, "entries": [ { "identity": "a.example", "public_key": "abcd" } ] }"#;
        let bad_name = format!(
            r#"{{ "version": 1, "entries": [ {{ "identity": "bad name", "public_key": "{}" }} ] }}"#,
            hex::encode([1u8; 32])
        );
        for json in [bad_version, short_key, bad_name.as_str(), "not json"] {
            assert!(matches!(
                TrustTable::from_json(json),
                Err(StrandBindError::TrustTableConfig(_))
            ));
        }
    }
}
