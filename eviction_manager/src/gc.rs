//! Node-level garbage collectors (`spec.md` §6): out of scope, only their
//! interface lives here.

use async_trait::async_trait;

#[async_trait]
pub trait ImageGc: Send + Sync {
    async fn delete_unused_images(&self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait ContainerGc: Send + Sync {
    async fn delete_all_unused_containers(&self) -> anyhow::Result<()>;
}
