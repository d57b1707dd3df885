//! Mock key/value store with write-failure injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::traits::KvStore;

#[derive(Default)]
struct Inner {
    data: Mutex<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
}

/// In-memory key/value store. `set_fail_writes(true)` makes every `put`
/// and `delete` fail, for persistence-failure rollback tests.
#[derive(Clone, Default)]
pub struct MockKv {
    inner: Arc<Inner>,
}

impl MockKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Direct read, bypassing the trait (test inspection).
    pub async fn raw_get(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.data.lock().await.get(key).cloned()
    }

    /// Direct write, bypassing the failure flag (test seeding).
    pub async fn raw_put(&self, key: &str, value: Vec<u8>) {
        self.inner.data.lock().await.insert(key.to_string(), value);
    }

    pub async fn len(&self) -> usize {
        self.inner.data.lock().await.len()
    }

    fn check_fail(&self) -> Result<()> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("mock storage write failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for MockKv {
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.check_fail()?;
        self.inner.data.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.data.lock().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check_fail()?;
        self.inner.data.lock().await.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let data = self.inner.data.lock().await;
        let mut entries: Vec<(String, Vec<u8>)> = data
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}
