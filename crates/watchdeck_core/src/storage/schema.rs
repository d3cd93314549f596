use log::warn;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Version written by this build. Version 1 is the unversioned bare-array
/// layout that predates the envelope.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;
pub const LEGACY_SCHEMA_VERSION: u32 = 1;

pub const DEFAULT_NAMESPACE: &str = "friends-clone";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub profiles: String,
    pub watchlist: String,
    pub continue_watching: String,
    pub active_profile: String,
}

impl StorageKeys {
    pub fn new(namespace: &str) -> Self {
        let namespace = namespace.trim().trim_end_matches('-');
        let namespace = if namespace.is_empty() {
            DEFAULT_NAMESPACE
        } else {
            namespace
        };

        Self {
            profiles: format!("{namespace}-profiles"),
            watchlist: format!("{namespace}-watchlist"),
            continue_watching: format!("{namespace}-continue-watching"),
            active_profile: format!("{namespace}-active-profile"),
        }
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectionEnvelope<'a, T> {
    schema_version: u32,
    items: &'a [T],
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCollection {
    Versioned {
        #[serde(rename = "schemaVersion")]
        schema_version: u32,
        #[serde(default)]
        items: Vec<Value>,
    },
    Legacy(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCollection<T> {
    pub schema_version: u32,
    pub items: Vec<T>,
    pub skipped: usize,
}

impl<T> DecodedCollection<T> {
    pub fn needs_upgrade(&self) -> bool {
        self.schema_version < CURRENT_SCHEMA_VERSION
    }
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("collection is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("collection schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// Decodes a stored collection. Records that fail to decode are dropped
/// individually so one bad entry does not hide the rest of the list.
pub fn decode_collection<T: DeserializeOwned>(
    key: &str,
    raw: &str,
) -> Result<DecodedCollection<T>, SchemaError> {
    if raw.trim().is_empty() {
        return Ok(DecodedCollection {
            schema_version: CURRENT_SCHEMA_VERSION,
            items: Vec::new(),
            skipped: 0,
        });
    }

    let (schema_version, values) = match serde_json::from_str::<RawCollection>(raw)? {
        RawCollection::Versioned {
            schema_version,
            items,
        } => (schema_version, items),
        RawCollection::Legacy(items) => (LEGACY_SCHEMA_VERSION, items),
    };

    if schema_version > CURRENT_SCHEMA_VERSION {
        return Err(SchemaError::UnsupportedVersion {
            found: schema_version,
            supported: CURRENT_SCHEMA_VERSION,
        });
    }

    let mut skipped = 0;
    let items = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<T>(value) {
            Ok(item) => Some(item),
            Err(error) => {
                warn!("skipping unreadable record {index} in {key}: {error}");
                skipped += 1;
                None
            }
        })
        .collect();

    Ok(DecodedCollection {
        schema_version,
        items,
        skipped,
    })
}

pub fn encode_collection<T: Serialize>(items: &[T]) -> Result<String, serde_json::Error> {
    serde_json::to_string(&CollectionEnvelope {
        schema_version: CURRENT_SCHEMA_VERSION,
        items,
    })
}
