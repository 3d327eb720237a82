//! AI inference job listing (read-only data source).

use medgrid_client::ai::InferenceJobs;

use crate::ProvisionError;

/// Names and ids of the inference jobs visible at an endpoint, projected
/// into parallel vectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferenceJobList {
    pub ids: Vec<String>,
    pub names: Vec<String>,
}

pub async fn read<C: InferenceJobs>(client: &C) -> Result<InferenceJobList, ProvisionError> {
    let jobs = client.list_jobs().await?;
    let mut list = InferenceJobList::default();
    for job in jobs {
        list.ids.push(job.id);
        list.names.push(job.name);
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use medgrid_client::ai::InferenceJob;
    use medgrid_core::{RemoteError, TokenRefresh};

    struct MockAi {
        jobs: Vec<InferenceJob>,
    }

    #[async_trait]
    impl TokenRefresh for MockAi {
        async fn refresh_token(&self) -> Result<(), RemoteError> {
            Ok(())
        }
    }

    #[async_trait]
    impl InferenceJobs for MockAi {
        async fn list_jobs(&self) -> Result<Vec<InferenceJob>, RemoteError> {
            Ok(self.jobs.clone())
        }
    }

    #[tokio::test]
    async fn projects_ids_and_names() {
        let mock = MockAi {
            jobs: vec![
                InferenceJob {
                    id: "job-1".into(),
                    name: "segmentation".into(),
                },
                InferenceJob {
                    id: "job-2".into(),
                    name: "triage".into(),
                },
            ],
        };

        let list = read(&mock).await.unwrap();
        assert_eq!(list.ids, vec!["job-1", "job-2"]);
        assert_eq!(list.names, vec!["segmentation", "triage"]);
    }

    #[tokio::test]
    async fn empty_listing_is_fine() {
        let mock = MockAi { jobs: vec![] };
        assert_eq!(read(&mock).await.unwrap(), InferenceJobList::default());
    }
}
