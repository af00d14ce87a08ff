use super::IResourceRepo;
use crate::repos::shared::inmemory_repo::*;
use reminder_engine_domain::{ResourceSnapshot, ID};

pub struct InMemoryResourceRepo {
    resources: std::sync::Mutex<Vec<ResourceSnapshot>>,
}

impl InMemoryResourceRepo {
    pub fn new() -> Self {
        Self {
            resources: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IResourceRepo for InMemoryResourceRepo {
    async fn upsert(&self, resource: &ResourceSnapshot) -> anyhow::Result<()> {
        upsert(resource, &self.resources);
        Ok(())
    }

    async fn find(&self, resource_id: &ID) -> Option<ResourceSnapshot> {
        find(resource_id, &self.resources)
    }

    async fn delete(&self, resource_id: &ID) -> Option<ResourceSnapshot> {
        delete(resource_id, &self.resources)
    }
}
