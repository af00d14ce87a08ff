mod inmemory;
mod postgres;

pub use inmemory::InMemoryChannelConnectionRepo;
pub use postgres::PostgresChannelConnectionRepo;
use reminder_engine_domain::{ChannelConnection, ID};

#[async_trait::async_trait]
pub trait IChannelConnectionRepo: Send + Sync {
    async fn find(&self, organization_id: &ID) -> Option<ChannelConnection>;
    async fn save(&self, connection: &ChannelConnection) -> anyhow::Result<()>;
    /// Saves `connection` only when the stored row still is `expected`
    /// (`None` meaning no row). Returns whether it was saved.
    async fn save_if_unchanged(
        &self,
        connection: &ChannelConnection,
        expected: Option<&ChannelConnection>,
    ) -> anyhow::Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_if_unchanged_rejects_stale_writes() {
        let repo = InMemoryChannelConnectionRepo::new();
        let organization_id = ID::default();
        let first = ChannelConnection::absent(organization_id.clone(), 1);

        assert!(repo.save_if_unchanged(&first, None).await.unwrap());
        // The row exists now
        assert!(!repo.save_if_unchanged(&first, None).await.unwrap());

        let mut pairing = first.clone();
        pairing.begin_pairing("org-test".into(), None, 2).unwrap();
        repo.save(&pairing).await.unwrap();

        let mut stale = first.clone();
        stale.updated = 3;
        assert!(!repo.save_if_unchanged(&stale, Some(&first)).await.unwrap());
        assert_eq!(repo.find(&organization_id).await, Some(pairing.clone()));

        assert!(repo.save_if_unchanged(&stale, Some(&pairing)).await.unwrap());
        assert_eq!(repo.find(&organization_id).await, Some(stale));
    }
}
