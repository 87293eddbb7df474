//! Tests for the job store and its status transitions

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use crate::jobs::{JobDraft, JobId, JobStatus, JobStore, ResourceUsage, Task};
    use crate::Error;

    fn draft(name: &str) -> JobDraft {
        let now = Utc::now();
        JobDraft {
            task: Task::new(name, 2.0, ResourceUsage::Medium).unwrap(),
            created_at: now,
            carbon_intensity: 450.0,
            scheduled_time: now + chrono::Duration::hours(4),
            expected_intensity: 300.0,
            carbon_saved: 0.18,
            confidence_score: 0.9,
            reasoning: "lower intensity overnight".to_string(),
            alternative_windows: vec![],
        }
    }

    #[tokio::test]
    async fn test_create_starts_pending_with_all_fields() {
        let store = JobStore::new();
        let job = store.create(draft("etl")).await;

        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.expected_intensity, 300.0);
        assert_eq!(job.carbon_intensity, 450.0);
        assert_eq!(store.get(job.id).await.unwrap(), job);
    }

    #[tokio::test]
    async fn test_list_is_creation_order() {
        let store = JobStore::new();
        for name in ["a", "b", "c", "d"] {
            store.create(draft(name)).await;
        }

        let names: Vec<String> = store
            .list()
            .await
            .into_iter()
            .map(|j| j.task.task_name)
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_cancel_pending_job() {
        let store = JobStore::new();
        let job = store.create(draft("report")).await;

        let cancelled = store.cancel(job.id).await.unwrap();
        assert_eq!(cancelled.status, JobStatus::Cancelled);
        assert_eq!(
            store.get(job.id).await.unwrap().status,
            JobStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_cancel_unknown_job_is_not_found() {
        let store = JobStore::new();
        assert!(matches!(
            store.cancel(JobId(99)).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_running_or_terminal_is_conflict() {
        let store = JobStore::new();

        let running = store.create(draft("running")).await;
        store.advance(running.id, JobStatus::Running).await.unwrap();

        let completed = store.create(draft("completed")).await;
        store.advance(completed.id, JobStatus::Running).await.unwrap();
        store
            .advance(completed.id, JobStatus::Completed)
            .await
            .unwrap();

        let failed = store.create(draft("failed")).await;
        store.advance(failed.id, JobStatus::Running).await.unwrap();
        store.advance(failed.id, JobStatus::Failed).await.unwrap();

        let cancelled = store.create(draft("cancelled")).await;
        store.cancel(cancelled.id).await.unwrap();

        for (id, expected) in [
            (running.id, JobStatus::Running),
            (completed.id, JobStatus::Completed),
            (failed.id, JobStatus::Failed),
            (cancelled.id, JobStatus::Cancelled),
        ] {
            assert!(matches!(store.cancel(id).await, Err(Error::Conflict(_))));
            assert_eq!(store.get(id).await.unwrap().status, expected);
        }
    }

    #[tokio::test]
    async fn test_advance_rejects_edges_off_the_graph() {
        let store = JobStore::new();
        let job = store.create(draft("train")).await;

        assert!(matches!(
            store.advance(job.id, JobStatus::Completed).await,
            Err(Error::Conflict(_))
        ));
        assert!(matches!(
            store.advance(job.id, JobStatus::Pending).await,
            Err(Error::Conflict(_))
        ));
        assert_eq!(store.get(job.id).await.unwrap().status, JobStatus::Pending);

        store.advance(job.id, JobStatus::Running).await.unwrap();
        store.advance(job.id, JobStatus::Completed).await.unwrap();
        for next in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ] {
            assert!(matches!(
                store.advance(job.id, next).await,
                Err(Error::Conflict(_))
            ));
        }
        assert_eq!(
            store.get(job.id).await.unwrap().status,
            JobStatus::Completed
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_cancel_and_advance_have_one_winner() {
        let store = Arc::new(JobStore::new());

        for _ in 0..50 {
            let job = store.create(draft("race")).await;

            let s1 = store.clone();
            let s2 = store.clone();
            let cancel = tokio::spawn(async move { s1.cancel(job.id).await });
            let advance =
                tokio::spawn(async move { s2.advance(job.id, JobStatus::Running).await });

            let cancel = cancel.await.unwrap();
            let advance = advance.await.unwrap();
            let final_status = store.get(job.id).await.unwrap().status;

            match (cancel, advance) {
                (Ok(_), Err(Error::Conflict(_))) => {
                    assert_eq!(final_status, JobStatus::Cancelled)
                }
                (Err(Error::Conflict(_)), Ok(_)) => {
                    assert_eq!(final_status, JobStatus::Running)
                }
                (c, a) => panic!("expected exactly one winner, got {:?} / {:?}", c, a),
            }
        }
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let store = JobStore::new();
        assert_eq!(store.clear().await, 0);

        store.create(draft("a")).await;
        store.create(draft("b")).await;
        assert_eq!(store.clear().await, 2);
        assert_eq!(store.clear().await, 0);
        assert!(store.list().await.is_empty());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_clear() {
        let store = JobStore::new();
        let first = store.create(draft("a")).await;
        store.clear().await;
        let second = store.create(draft("b")).await;
        assert!(second.id > first.id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_list_never_observes_partial_clear() {
        let store = Arc::new(JobStore::new());
        for i in 0..200 {
            store.create(draft(&format!("job-{}", i))).await;
        }

        let reader = {
            let store = store.clone();
            tokio::spawn(async move {
                let mut seen = Vec::new();
                for _ in 0..100 {
                    seen.push(store.list().await.len());
                    tokio::task::yield_now().await;
                }
                seen
            })
        };
        let removed = store.clear().await;

        assert_eq!(removed, 200);
        for len in reader.await.unwrap() {
            assert!(len == 0 || len == 200, "observed partial clear: {}", len);
        }
    }
}
