use crate::core::dns::{self, DnsOutcome};
use crate::core::report::StageOutcome;
use crate::domain::model::{
    CertificateDetails, CertificateRequest, CertificateState, RecordSet, RecordTarget, RecordType,
    WaitPolicy,
};
use crate::domain::ports::{CertificateAuthority, DnsZones};
use crate::utils::error::{ProvisionError, Result};
use tokio::time::{sleep, Instant};

/// TTL of the ACM validation CNAMEs.
const VALIDATION_RECORD_TTL: i64 = 300;

/// How the certificate stage obtains a usable certificate.
#[derive(Debug, Clone)]
pub struct CertificatePlan {
    /// Reuse this certificate instead of requesting one.
    pub existing_arn: Option<String>,
    pub publish_validation_records: bool,
    pub wait: WaitPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateOutcome {
    pub arn: String,
    pub reused: bool,
    pub validation_records_published: usize,
}

impl StageOutcome for CertificateOutcome {
    fn summary(&self) -> String {
        if self.reused {
            format!("reusing issued certificate {}", self.arn)
        } else {
            format!(
                "certificate {} issued ({} validation records published)",
                self.arn, self.validation_records_published
            )
        }
    }
}

/// Requests a DNS-validated certificate for `primary` plus `alternate`.
pub async fn request_certificate<C: CertificateAuthority + ?Sized>(
    acm: &C,
    primary: &str,
    alternate: &str,
) -> Result<String> {
    let request = CertificateRequest {
        domain_name: primary.to_string(),
        alternative_names: vec![alternate.to_string()],
    };
    tracing::info!("Requesting certificate for {} (alt: {})", primary, alternate);
    let arn = acm.request_certificate(&request).await?;
    tracing::info!("Certificate requested: {}", arn);
    Ok(arn)
}

/// Describes `arn` every `policy.interval` until `done` holds or `deadline` passes.
///
/// Terminal ACM failures end the poll at once.
async fn poll_certificate<C, F>(
    acm: &C,
    arn: &str,
    policy: WaitPolicy,
    deadline: Instant,
    done: F,
) -> Result<CertificateDetails>
where
    C: CertificateAuthority + ?Sized,
    F: Fn(&CertificateDetails) -> bool,
{
    loop {
        if Instant::now() >= deadline {
            return Err(ProvisionError::CertificateValidationTimedOut {
                arn: arn.to_string(),
                waited: policy.timeout,
            });
        }

        let details = acm.describe_certificate(arn).await?;
        if let CertificateState::Failed(status) = &details.state {
            tracing::error!("Certificate {} is {}", arn, status);
            return Err(ProvisionError::CertificateNotIssued {
                arn: arn.to_string(),
                status: status.clone(),
            });
        }
        if done(&details) {
            return Ok(details);
        }
        tracing::debug!("Certificate {} is {}", arn, details.state);

        let remaining = deadline.saturating_duration_since(Instant::now());
        sleep(policy.interval.min(remaining)).await;
    }
}

/// Upserts every ACM validation CNAME into the zone of its domain.
pub async fn publish_validation_records<P>(
    provider: &P,
    arn: &str,
    policy: WaitPolicy,
    deadline: Instant,
) -> Result<usize>
where
    P: CertificateAuthority + DnsZones + ?Sized,
{
    // ACM fills in the records a few seconds after the request.
    let details = poll_certificate(provider, arn, policy, deadline, |d| {
        d.state == CertificateState::Issued || d.validation_records.len() >= d.domain_count
    })
    .await?;

    let mut published = 0;
    for record in &details.validation_records {
        let record_set = RecordSet {
            name: record.name.clone(),
            record_type: RecordType::Cname,
            target: RecordTarget::Values {
                ttl: VALIDATION_RECORD_TTL,
                values: vec![record.value.clone()],
            },
        };
        match dns::upsert_in_base_zone(provider, record_set).await? {
            DnsOutcome::Upserted { .. } => published += 1,
            DnsOutcome::NoMatchingZone { base_domain } => tracing::warn!(
                "Validation record for {} must be created by hand in the {} zone",
                record.domain_name,
                base_domain
            ),
        }
    }
    Ok(published)
}

/// Waits until ACM reports the certificate as ISSUED, at most until `deadline`.
pub async fn wait_for_issued<C: CertificateAuthority + ?Sized>(
    acm: &C,
    arn: &str,
    policy: WaitPolicy,
    deadline: Instant,
) -> Result<()> {
    tracing::info!(
        "Waiting up to {:?} for certificate {} to be issued",
        deadline.saturating_duration_since(Instant::now()),
        arn
    );
    poll_certificate(acm, arn, policy, deadline, |d| d.state == CertificateState::Issued).await?;
    tracing::info!("Certificate {} is issued", arn);
    Ok(())
}

/// Returns an issued certificate covering `primary` and `alternate`.
///
/// Publishing the validation records and waiting for ISSUED share one `plan.wait.timeout`.
pub async fn obtain_certificate<P>(
    provider: &P,
    primary: &str,
    alternate: &str,
    plan: &CertificatePlan,
) -> Result<CertificateOutcome>
where
    P: CertificateAuthority + DnsZones + ?Sized,
{
    let (arn, reused) = match &plan.existing_arn {
        Some(arn) => {
            tracing::info!("Reusing configured certificate {}", arn);
            (arn.clone(), true)
        }
        None => (request_certificate(provider, primary, alternate).await?, false),
    };

    let deadline = Instant::now() + plan.wait.timeout;

    let validation_records_published = if plan.publish_validation_records {
        publish_validation_records(provider, &arn, plan.wait, deadline).await?
    } else {
        0
    };

    wait_for_issued(provider, &arn, plan.wait, deadline).await?;

    Ok(CertificateOutcome {
        arn,
        reused,
        validation_records_published,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCloud;
    use std::time::Duration;

    fn plan(existing_arn: Option<&str>, publish: bool) -> CertificatePlan {
        CertificatePlan {
            existing_arn: existing_arn.map(str::to_string),
            publish_validation_records: publish,
            wait: WaitPolicy::new(Duration::from_secs(15), Duration::from_secs(120)),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_publishes_and_waits() {
        let cloud = InMemoryCloud::new("us-east-1").with_hosted_zone("example.com");

        let outcome = obtain_certificate(&cloud, "ra.example.com", "ra-api.example.com", &plan(None, true))
            .await
            .unwrap();

        assert!(!outcome.reused);
        assert_eq!(outcome.validation_records_published, 2);
        let requests = cloud.certificate_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].domain_name, "ra.example.com");
        assert_eq!(requests[0].alternative_names, vec!["ra-api.example.com".to_string()]);
        assert_eq!(
            cloud.describe_certificate(&outcome.arn).await.unwrap().state,
            CertificateState::Issued
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unvalidated_certificate_times_out() {
        let cloud = InMemoryCloud::new("us-east-1").with_hosted_zone("example.com");

        let err = obtain_certificate(&cloud, "ra.example.com", "ra-api.example.com", &plan(None, false))
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::CertificateValidationTimedOut { .. }));
        assert_eq!(cloud.record_count(), 0);
    }

    fn late_records_plan() -> CertificatePlan {
        CertificatePlan {
            existing_arn: None,
            publish_validation_records: true,
            wait: WaitPolicy::new(Duration::from_secs(10), Duration::from_secs(120)),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_validation_records_are_published() {
        let cloud = InMemoryCloud::new("us-east-1")
            .with_hosted_zone("example.com")
            .with_validation_delay(Duration::from_secs(110));
        let started = Instant::now();

        let outcome = obtain_certificate(&cloud, "ra.example.com", "ra-api.example.com", &late_records_plan())
            .await
            .unwrap();

        assert_eq!(outcome.validation_records_published, 2);
        assert!(started.elapsed() >= Duration::from_secs(110));
        assert!(started.elapsed() <= Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_and_issue_wait_share_one_timeout() {
        // records show up late and no zone exists, so the certificate never issues
        let cloud = InMemoryCloud::new("us-east-1").with_validation_delay(Duration::from_secs(110));
        let started = Instant::now();

        let err = obtain_certificate(&cloud, "ra.example.com", "ra-api.example.com", &late_records_plan())
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::CertificateValidationTimedOut { .. }));
        assert!(started.elapsed() <= Duration::from_secs(120), "{:?}", started.elapsed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reuses_configured_certificate() {
        let arn = "arn:aws:acm:us-east-1:000000000000:certificate/existing";
        let cloud = InMemoryCloud::new("us-east-1").with_certificate(
            arn,
            "ra.example.com",
            CertificateState::Issued,
        );

        let outcome = obtain_certificate(&cloud, "ra.example.com", "ra-api.example.com", &plan(Some(arn), true))
            .await
            .unwrap();

        assert!(outcome.reused);
        assert_eq!(outcome.arn, arn);
        assert!(cloud.certificate_requests().iter().all(|r| r.domain_name == "ra.example.com"));
        assert!(!cloud.calls().iter().any(|c| c.starts_with("acm:RequestCertificate")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_certificate_stops_immediately() {
        let arn = "arn:aws:acm:us-east-1:000000000000:certificate/broken";
        let cloud = InMemoryCloud::new("us-east-1").with_certificate(
            arn,
            "ra.example.com",
            CertificateState::Failed("FAILED".to_string()),
        );
        let started = Instant::now();

        let wait = plan(None, false).wait;
        let err = wait_for_issued(&cloud, arn, wait, started + wait.timeout).await.unwrap_err();

        assert!(matches!(err, ProvisionError::CertificateNotIssued { ref status, .. } if status == "FAILED"));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_request_failure_propagates() {
        let cloud = InMemoryCloud::new("us-east-1").failing("acm:RequestCertificate");

        let result = request_certificate(&cloud, "ra.example.com", "ra-api.example.com").await;

        assert!(matches!(result, Err(ProvisionError::Provider { .. })));
    }
}
