use super::IChannelConnectionRepo;
use crate::repos::shared::inmemory_repo::*;
use reminder_engine_domain::{ChannelConnection, ID};

pub struct InMemoryChannelConnectionRepo {
    connections: std::sync::Mutex<Vec<ChannelConnection>>,
}

impl InMemoryChannelConnectionRepo {
    pub fn new() -> Self {
        Self {
            connections: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IChannelConnectionRepo for InMemoryChannelConnectionRepo {
    async fn find(&self, organization_id: &ID) -> Option<ChannelConnection> {
        find(organization_id, &self.connections)
    }

    async fn save(&self, connection: &ChannelConnection) -> anyhow::Result<()> {
        upsert(connection, &self.connections);
        Ok(())
    }

    async fn save_if_unchanged(
        &self,
        connection: &ChannelConnection,
        expected: Option<&ChannelConnection>,
    ) -> anyhow::Result<bool> {
        let mut connections = self.connections.lock().unwrap();
        let index = connections
            .iter()
            .position(|c| c.organization_id == connection.organization_id);
        match (index, expected) {
            (Some(index), Some(expected)) if connections[index] == *expected => {
                connections[index] = connection.clone();
                Ok(true)
            }
            (None, None) => {
                connections.push(connection.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
