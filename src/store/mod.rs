pub mod pool;

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::identity::IdentityProvider;
use crate::config::Config;
use crate::render::Templates;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Bill file contents, keyed by `blob::object_path`.
    pub blobs: opendal::Operator,
    pub templates: Arc<Templates>,
    pub identity: Arc<IdentityProvider>,
    pub config: Arc<Config>,
}

/// S3-compatible blob store, or an in-process one in dev mode.
pub fn blob_operator(cfg: &Config) -> anyhow::Result<opendal::Operator> {
    if cfg.dev_mode {
        tracing::warn!("dev mode: bill files are kept in memory");
        return Ok(opendal::Operator::new(opendal::services::Memory::default())?.finish());
    }

    let builder = opendal::services::S3::default()
        .endpoint(&cfg.minio_endpoint)
        .access_key_id(&cfg.minio_access_key)
        .secret_access_key(&cfg.minio_secret_key)
        .bucket(&cfg.blob_bucket)
        .region("us-east-1");
    Ok(opendal::Operator::new(builder)?.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dev_mode_uses_memory_store() {
        let mut cfg = Config::load();
        cfg.dev_mode = true;
        let op = blob_operator(&cfg).unwrap();
        op.write("bills/x", b"hello".to_vec()).await.unwrap();
        assert_eq!(op.read("bills/x").await.unwrap().to_vec(), b"hello");
    }

    #[test]
    fn s3_operator_builds_without_network() {
        let mut cfg = Config::load();
        cfg.dev_mode = false;
        assert!(blob_operator(&cfg).is_ok());
    }
}
