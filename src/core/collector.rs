use std::time::Duration;
use tokio::time::Instant;

use crate::core::dispatcher::PendingCall;
use crate::models::RegionOutcome;

/// Collects dispatched region calls under a single overall deadline
#[derive(Debug, Clone, Copy)]
pub struct ResultCollector {
    budget: Duration,
}

impl ResultCollector {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Wait for every pending call until `deadline`, in dispatch order
    ///
    /// Calls still running at the deadline are aborted and recorded as
    /// timeouts. Returns exactly one outcome per pending call.
    pub async fn collect(&self, pending: Vec<PendingCall>, deadline: Instant) -> Vec<RegionOutcome> {
        let budget_ms = self.budget.as_millis() as u64;
        let mut outcomes = Vec::with_capacity(pending.len());

        for mut call in pending {
            let region = &call.region;
            let outcome = match tokio::time::timeout_at(deadline, &mut call.handle).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(join_error)) => {
                    tracing::error!("Region {} task aborted: {}", region.id, join_error);
                    RegionOutcome::failure(region, format!("Region task failed: {}", join_error), budget_ms)
                }
                Err(_) => {
                    call.handle.abort();
                    tracing::warn!("Region {} timed out after {}ms", region.id, budget_ms);
                    RegionOutcome::timeout(region, budget_ms)
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }

    /// Deadline for calls dispatched now
    pub fn deadline_from_now(&self) -> Instant {
        Instant::now() + self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OutcomeStatus, RegionDescriptor};

    fn region(id: &str) -> RegionDescriptor {
        RegionDescriptor {
            id: id.to_string(),
            name: id.to_string(),
            healthy: true,
            priority: 0.0,
        }
    }

    fn delayed(id: &str, delay: Duration) -> PendingCall {
        let r = region(id);
        let task_region = r.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            RegionOutcome::success(&task_region, vec![], delay.as_millis() as u64)
        });
        PendingCall { region: r, handle }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_region_times_out_without_blocking_others() {
        let collector = ResultCollector::new(Duration::from_millis(500));
        let deadline = collector.deadline_from_now();
        let pending = vec![
            delayed("fast", Duration::from_millis(50)),
            delayed("slow", Duration::from_secs(30)),
            delayed("medium", Duration::from_millis(300)),
        ];

        let started = Instant::now();
        let outcomes = collector.collect(pending, deadline).await;

        assert!(started.elapsed() <= Duration::from_millis(510));
        let statuses: Vec<_> = outcomes.iter().map(|o| o.status).collect();
        assert_eq!(statuses, vec![OutcomeStatus::Success, OutcomeStatus::Timeout, OutcomeStatus::Success]);
        assert_eq!(outcomes[1].region_id, "slow");
        assert!(outcomes[1].error.as_deref().unwrap().contains("500ms"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_slow_regions_bounded_by_budget() {
        let collector = ResultCollector::new(Duration::from_millis(200));
        let deadline = collector.deadline_from_now();
        let pending = (0..5)
            .map(|i| delayed(&format!("r{}", i), Duration::from_secs(10)))
            .collect();

        let started = Instant::now();
        let outcomes = collector.collect(pending, deadline).await;

        assert_eq!(outcomes.len(), 5);
        assert!(outcomes.iter().all(|o| o.status == OutcomeStatus::Timeout));
        assert!(started.elapsed() <= Duration::from_millis(210));
    }

    #[tokio::test]
    async fn test_panicking_task_recorded_as_failure() {
        let r = region("broken");
        let handle = tokio::spawn(async { panic!("backend exploded") });
        let collector = ResultCollector::new(Duration::from_secs(1));

        let outcomes = collector
            .collect(vec![PendingCall { region: r, handle }], collector.deadline_from_now())
            .await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, OutcomeStatus::Failure);
    }
}
