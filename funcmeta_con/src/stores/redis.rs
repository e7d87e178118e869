// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use funcmeta_api::function_id::FunctionIdentifier;
use funcmeta_api::record::FunctionRecord;
use redis::Commands;

/// Function metadata stored in a Redis in-memory database.
///
/// Every record is written as a JSON structure under the key
/// function:TENANT/NAMESPACE/NAME.
///
/// Contrary to other Redis consumers, the database is not flushed upon
/// initialization: records written by a previous leader are kept.
#[derive(Clone)]
pub struct RedisMetadataStore {
    connection: std::sync::Arc<tokio::sync::Mutex<redis::Connection>>,
}

fn key(id: &FunctionIdentifier) -> String {
    format!("function:{}", id)
}

/// Escape the glob characters of a KEYS pattern, so that they match literally.
fn escape_pattern(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl RedisMetadataStore {
    pub fn new(redis_url: &str) -> anyhow::Result<Self> {
        log::info!("creating Redis metadata store at URL {}", redis_url);
        let connection = redis::Client::open(redis_url)?.get_connection()?;
        Ok(Self {
            connection: std::sync::Arc::new(tokio::sync::Mutex::new(connection)),
        })
    }
}

#[async_trait::async_trait]
impl funcmeta_api::metadata_store::MetadataStore for RedisMetadataStore {
    async fn get(&self, id: &FunctionIdentifier) -> anyhow::Result<Option<FunctionRecord>> {
        let value = self.connection.lock().await.get::<&str, Option<String>>(key(id).as_str())?;
        match value {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, tenant: &str, namespace: &str) -> anyhow::Result<Vec<FunctionRecord>> {
        let mut connection = self.connection.lock().await;
        let pattern = format!("function:{}/{}/*", escape_pattern(tenant), escape_pattern(namespace));
        let mut keys = connection.keys::<String, Vec<String>>(pattern)?;
        keys.sort();
        let mut records = vec![];
        for key in keys {
            if let Some(value) = connection.get::<&str, Option<String>>(key.as_str())? {
                let record: FunctionRecord = serde_json::from_str(&value)?;
                if record.id().tenant == tenant && record.id().namespace == namespace {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }
}

#[async_trait::async_trait]
impl funcmeta_api::metadata_store::MetadataWriter for RedisMetadataStore {
    async fn put(&self, record: FunctionRecord) -> anyhow::Result<()> {
        self.connection
            .lock()
            .await
            .set::<&str, String, ()>(key(record.id()).as_str(), serde_json::to_string(&record)?)?;
        Ok(())
    }

    async fn remove(&self, id: &FunctionIdentifier) -> anyhow::Result<Option<FunctionRecord>> {
        let existing = funcmeta_api::metadata_store::MetadataStore::get(self, id).await?;
        if existing.is_some() {
            self.connection.lock().await.del::<&str, usize>(key(id).as_str())?;
        }
        Ok(existing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use funcmeta_api::metadata_store::{MetadataStore, MetadataWriter};

    #[test]
    fn test_escape_pattern() {
        assert_eq!("n", escape_pattern("n"));
        assert_eq!("\\*", escape_pattern("*"));
        assert_eq!("n\\?", escape_pattern("n?"));
        assert_eq!("\\[ab\\]\\\\x", escape_pattern("[ab]\\x"));
    }

    #[ignore]
    #[tokio::test]
    async fn test_redis_store() {
        // Requires a Redis server listening on localhost, e.g.:
        // docker run -d --rm --network host redis
        let store = RedisMetadataStore::new("redis://127.0.0.1:6379/").unwrap();
        let tenant = format!("tenant-{}", uuid::Uuid::new_v4());

        store.put(crate::test_utils::record(&tenant, "n", "f2")).await.unwrap();
        store.put(crate::test_utils::record(&tenant, "n", "f1")).await.unwrap();
        let names: Vec<String> = store.list(&tenant, "n").await.unwrap().iter().map(|r| r.id().name.clone()).collect();
        assert_eq!(vec!["f1", "f2"], names);

        // glob characters in the namespace match only literally
        store.put(crate::test_utils::record(&tenant, "n*", "f3")).await.unwrap();
        for namespace in ["*", "n?", "[n]"] {
            assert!(store.list(&tenant, namespace).await.unwrap().is_empty());
        }
        let names: Vec<String> = store.list(&tenant, "n*").await.unwrap().iter().map(|r| r.id().name.clone()).collect();
        assert_eq!(vec!["f3"], names);
        store.remove(&FunctionIdentifier::new(&tenant, "n*", "f3")).await.unwrap();

        let id = FunctionIdentifier::new(&tenant, "n", "f1");
        assert_eq!(Some(crate::test_utils::record(&tenant, "n", "f1")), store.get(&id).await.unwrap());
        assert!(store.remove(&id).await.unwrap().is_some());
        assert!(!store.exists(&id).await.unwrap());
        store.remove(&FunctionIdentifier::new(&tenant, "n", "f2")).await.unwrap();
    }
}
