use super::IReminderExpansionJobsRepo;
use crate::repos::shared::inmemory_repo::*;
use reminder_engine_domain::{ReminderExpansionJob, ID};

pub struct InMemoryReminderExpansionJobsRepo {
    jobs: std::sync::Mutex<Vec<ReminderExpansionJob>>,
}

impl InMemoryReminderExpansionJobsRepo {
    pub fn new() -> Self {
        Self {
            jobs: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IReminderExpansionJobsRepo for InMemoryReminderExpansionJobsRepo {
    async fn upsert(&self, job: &ReminderExpansionJob) -> anyhow::Result<()> {
        find_and_delete_by(&self.jobs, |j| {
            j.resource_id == job.resource_id && j.trigger_kind == job.trigger_kind
        });
        insert(job, &self.jobs);
        Ok(())
    }

    async fn delete_all_before(&self, before: i64) -> Vec<ReminderExpansionJob> {
        find_and_delete_by(&self.jobs, |job| job.run_at <= before)
    }

    async fn delete_by_resource(&self, resource_id: &ID) -> anyhow::Result<()> {
        find_and_delete_by(&self.jobs, |job| job.resource_id == *resource_id);
        Ok(())
    }
}
