use crate::core::report::StageOutcome;
use crate::domain::model::{EnvironmentDescription, WaitPolicy};
use crate::domain::ports::AppPlatform;
use crate::utils::error::{ProvisionError, Result};
use tokio::time::{sleep, Instant};

#[derive(Debug)]
pub enum Readiness {
    Ready(EnvironmentDescription),
    /// The deadline passed; `last_status` is what the final query reported.
    TimedOut { last_status: Option<String> },
    NotFound,
    QueryFailed(ProvisionError),
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn into_result(self, environment: &str, policy: WaitPolicy) -> Result<EnvironmentDescription> {
        match self {
            Self::Ready(description) => Ok(description),
            Self::TimedOut { .. } => Err(ProvisionError::EnvironmentNotReady {
                environment: environment.to_string(),
                waited: policy.timeout,
            }),
            Self::NotFound => Err(ProvisionError::EnvironmentNotFound {
                environment: environment.to_string(),
            }),
            Self::QueryFailed(e) => Err(e),
        }
    }
}

impl StageOutcome for EnvironmentDescription {
    fn summary(&self) -> String {
        format!(
            "{} is {} (health {}, cname {})",
            self.name,
            self.status,
            self.health.as_deref().unwrap_or("unknown"),
            self.cname.as_deref().unwrap_or("none")
        )
    }
}

/// Polls `environment` every `policy.interval` until it is Ready.
///
/// Never queries at or after the deadline. A missing environment or a failed query ends the
/// wait at once; neither is retried.
pub async fn wait_for_environment<A: AppPlatform + ?Sized>(
    platform: &A,
    environment: &str,
    policy: WaitPolicy,
) -> Readiness {
    let deadline = Instant::now() + policy.timeout;
    let mut last_status = None;

    tracing::info!(
        "Waiting up to {:?} for environment {} to become Ready",
        policy.timeout,
        environment
    );

    loop {
        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(
                "Environment {} not ready after {:?} (last status: {})",
                environment,
                policy.timeout,
                last_status.as_deref().unwrap_or("unknown")
            );
            return Readiness::TimedOut { last_status };
        }

        match platform.describe_environment(environment).await {
            Ok(Some(description)) if description.is_ready() => {
                tracing::info!(
                    "Environment {} is Ready (health: {})",
                    environment,
                    description.health.as_deref().unwrap_or("unknown")
                );
                return Readiness::Ready(description);
            }
            Ok(Some(description)) => {
                tracing::info!(
                    "Environment {} status: {}, health: {}",
                    environment,
                    description.status,
                    description.health.as_deref().unwrap_or("unknown")
                );
                last_status = Some(description.status);
            }
            Ok(None) => {
                tracing::error!("Environment {} not found", environment);
                return Readiness::NotFound;
            }
            Err(e) => {
                tracing::error!("Error checking environment {}: {}", environment, e);
                return Readiness::QueryFailed(e);
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        sleep(policy.interval.min(remaining)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCloud;
    use std::time::Duration;

    const CNAME: &str = "ra-env.us-east-1.elasticbeanstalk.com";

    fn policy(interval: u64, timeout: u64) -> WaitPolicy {
        WaitPolicy::new(Duration::from_secs(interval), Duration::from_secs(timeout))
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_before_deadline() {
        let cloud = InMemoryCloud::new("us-east-1").with_environment(
            "ra-env",
            CNAME,
            &["Launching", "Updating", "Ready"],
        );

        let readiness = wait_for_environment(&cloud, "ra-env", policy(10, 60)).await;

        assert!(readiness.is_ready());
        assert_eq!(cloud.environment_queries().len(), 3);
        let description = readiness.into_result("ra-env", policy(10, 60)).unwrap();
        assert_eq!(description.cname.as_deref(), Some(CNAME));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_without_querying_after_deadline() {
        let cloud = InMemoryCloud::new("us-east-1").with_environment("ra-env", CNAME, &["Updating"]);
        let started = Instant::now();
        let deadline = started + Duration::from_secs(25);

        let readiness = wait_for_environment(&cloud, "ra-env", policy(10, 25)).await;

        assert!(!readiness.is_ready());
        assert!(matches!(
            readiness,
            Readiness::TimedOut { ref last_status } if last_status.as_deref() == Some("Updating")
        ));
        let queries = cloud.environment_queries();
        assert_eq!(queries.len(), 3);
        assert!(queries.iter().all(|at| *at < deadline));
        assert!(Instant::now() >= deadline);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_environment_fails_immediately() {
        let cloud = InMemoryCloud::new("us-east-1");
        let started = Instant::now();

        let readiness = wait_for_environment(&cloud, "ghost-env", policy(10, 600)).await;

        assert!(matches!(readiness, Readiness::NotFound));
        assert_eq!(cloud.environment_queries().len(), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(matches!(
            readiness.into_result("ghost-env", policy(10, 600)),
            Err(ProvisionError::EnvironmentNotFound { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_error_is_not_retried() {
        let cloud = InMemoryCloud::new("us-east-1")
            .with_environment("ra-env", CNAME, &["Ready"])
            .failing("elasticbeanstalk:DescribeEnvironments");

        let readiness = wait_for_environment(&cloud, "ra-env", policy(10, 600)).await;

        assert!(matches!(readiness, Readiness::QueryFailed(_)));
        assert_eq!(cloud.environment_queries().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_never_queries() {
        let cloud = InMemoryCloud::new("us-east-1").with_environment("ra-env", CNAME, &["Ready"]);

        let readiness = wait_for_environment(&cloud, "ra-env", policy(10, 0)).await;

        assert!(matches!(readiness, Readiness::TimedOut { last_status: None }));
        assert!(cloud.environment_queries().is_empty());
    }
}
