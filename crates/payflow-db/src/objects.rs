//! Filesystem-backed [`crate::ObjectStore`] for local runs. Keys (from
//! `payflow_schemas::keys`) are `/`-separated; each segment becomes a path
//! component under `root`, mirroring the teacher's convention of treating
//! object-store keys as deterministic, centrally-derived paths rather than
//! opaque blobs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;

use crate::ObjectStore;

pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> PathBuf {
        self.root.join(Path::new(key))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.resolve(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| format!("create dirs for {key}"))?;
        }
        fs::write(&path, bytes).await.with_context(|| format!("write object: {key}"))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.resolve(key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read object: {key}")),
        }
    }
}
