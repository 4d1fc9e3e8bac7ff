//! Conformance checks for [`Store`] backends.
//!
//! Every backend handed to [`crate::ContentStore`] has to behave the same
//! way on absence, overwrite and listing; run the suite from the backend's
//! own tests:
//!
//! ```toml
//! [dev-dependencies]
//! cafs_core = { workspace = true, features = ["testutil"] }
//! ```
//!
//! ```ignore
//! #[tokio::test]
//! async fn conformance() {
//!     let backend = MyBackend::new(...);
//!     StoreTests::new(&backend).run_all().await.unwrap();
//! }
//! ```

use crate::store::{Store, StoreError, StoreResult};
use anyhow::{Context, ensure};
use bytes::Bytes;
use futures::StreamExt;
use rand::Rng;

pub struct StoreTests<'a, S> {
    store: &'a S,
    /// Every object the suite writes lives under this prefix.
    scope: String,
}

impl<'a, S: Store> StoreTests<'a, S> {
    /// Scopes the run under a random prefix.
    pub fn new(store: &'a S) -> Self {
        let scope = format!("conformance-{:08x}/", rand::rng().random::<u32>());
        Self::with_prefix(store, scope)
    }

    pub fn with_prefix(store: &'a S, prefix: impl Into<String>) -> Self {
        Self {
            store,
            scope: prefix.into(),
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}{name}", self.scope)
    }

    /// Runs every check, then removes what the checks wrote. The first
    /// failing check is named in the returned error.
    pub async fn run_all(&self) -> StoreResult<()> {
        self.check_round_trip().await.context("round trip")?;
        self.check_presence().await.context("presence")?;
        self.check_absence().await.context("absence")?;
        self.check_size().await.context("size")?;
        self.check_overwrite().await.context("overwrite")?;
        self.check_delete().await.context("delete")?;
        self.check_listing().await.context("listing")?;
        self.cleanup().await
    }

    pub async fn check_round_trip(&self) -> StoreResult<()> {
        for (name, body) in [
            ("small", Bytes::from_static(b"cafs conformance")),
            ("empty", Bytes::new()),
            ("large", random_bytes(256 * 1024)),
        ] {
            let key = self.key(name);
            self.store.put_bytes(&key, body.clone()).await?;
            let back = self.store.read_bytes(&key).await?;
            ensure!(back == body, "{key}: read back {} bytes, wrote {}", back.len(), body.len());
        }
        Ok(())
    }

    pub async fn check_presence(&self) -> StoreResult<()> {
        let key = self.key("presence");
        ensure!(!self.store.exists(&key).await?, "{key} exists before any write");
        self.store.put_bytes(&key, Bytes::from_static(b"p")).await?;
        ensure!(self.store.exists(&key).await?, "{key} missing after write");
        Ok(())
    }

    /// Reads, sizes and deletes of unknown keys fail with `NotFound`.
    pub async fn check_absence(&self) -> StoreResult<()> {
        let key = self.key("never-written");
        let outcomes = [
            self.store.read_bytes(&key).await.map(|_| ()),
            self.store.size(&key).await.map(|_| ()),
            self.store.delete(&key).await,
        ];
        for outcome in outcomes {
            match outcome {
                Err(err) if StoreError::is_not_found(&err) => {}
                Err(err) => return Err(err.context(format!("{key}: expected NotFound"))),
                Ok(()) => anyhow::bail!("{key}: operation on a missing object succeeded"),
            }
        }
        Ok(())
    }

    pub async fn check_size(&self) -> StoreResult<()> {
        let key = self.key("sized");
        self.store
            .put_bytes(&key, Bytes::from(vec![7u8; 4321]))
            .await?;
        let size = self.store.size(&key).await?;
        ensure!(size == 4321, "{key}: size {size}, expected 4321");
        Ok(())
    }

    pub async fn check_overwrite(&self) -> StoreResult<()> {
        let key = self.key("replaced");
        self.store.put_bytes(&key, Bytes::from_static(b"first")).await?;
        self.store.put_bytes(&key, Bytes::from_static(b"second")).await?;
        let back = self.store.read_bytes(&key).await?;
        ensure!(back.as_ref() == b"second", "{key}: overwrite not visible");
        Ok(())
    }

    pub async fn check_delete(&self) -> StoreResult<()> {
        let key = self.key("deleted");
        self.store.put_bytes(&key, Bytes::from_static(b"d")).await?;
        self.store.delete(&key).await?;
        ensure!(!self.store.exists(&key).await?, "{key} still present after delete");
        Ok(())
    }

    pub async fn check_listing(&self) -> StoreResult<()> {
        let wanted = ["list/one", "list/two", "list/deeper/three"].map(|n| self.key(n));
        for key in &wanted {
            self.store.put_bytes(key, Bytes::from_static(b"l")).await?;
        }
        let listed = self.scoped_keys().await?;
        for key in &wanted {
            ensure!(listed.contains(key), "{key} missing from listing");
        }
        Ok(())
    }

    async fn scoped_keys(&self) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut listing = self.store.list().await?;
        while let Some(key) = listing.next().await {
            let key = key?;
            if key.starts_with(&self.scope) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    /// Deletes everything under the suite's prefix.
    pub async fn cleanup(&self) -> StoreResult<()> {
        for key in self.scoped_keys().await? {
            self.store.delete(&key).await?;
        }
        Ok(())
    }
}

/// `len` random bytes.
pub fn random_bytes(len: usize) -> Bytes {
    let mut buf = vec![0u8; len];
    rand::rng().fill(buf.as_mut_slice());
    Bytes::from(buf)
}
