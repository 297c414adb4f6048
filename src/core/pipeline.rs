use crate::config::DeployConfig;
use crate::core::bucket::{self, BucketOutcome};
use crate::core::certificate::{self, CertificatePlan, CertificateOutcome};
use crate::core::report::{DeploymentReport, Stage, StageOutcome, StageStatus};
use crate::core::{cdn, dns, https, readiness};
use crate::domain::model::{Distribution, EnvironmentDescription};
use crate::domain::ports::CloudProvider;
use crate::utils::error::{ProvisionError, Result};
use std::future::Future;
use tokio::time::Instant;

/// Runs the provisioning stages in order against one provider.
pub struct Deployment<P: CloudProvider> {
    provider: P,
    config: DeployConfig,
}

impl<P: CloudProvider> Deployment<P> {
    pub fn new(provider: P, config: DeployConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    fn certificate_plan(&self) -> CertificatePlan {
        CertificatePlan {
            existing_arn: self.config.certificate.arn.clone(),
            publish_validation_records: self.config.certificate.publish_validation_records,
            wait: self.config.certificate_wait(),
        }
    }

    /// Runs `work` as `stage` and records how it went.
    async fn track<T, F>(&self, report: &mut DeploymentReport, stage: Stage, work: F) -> Option<T>
    where
        T: StageOutcome,
        F: Future<Output = Result<T>>,
    {
        tracing::info!("▶️ Stage {}", stage);
        let started = Instant::now();
        let result = work.await;
        let duration = started.elapsed();

        match result {
            Ok(outcome) => {
                let summary = outcome.summary();
                let status = if outcome.is_recovered() {
                    tracing::warn!("Stage {} recovered: {}", stage, summary);
                    StageStatus::Recovered(summary)
                } else {
                    tracing::info!("Stage {} completed: {}", stage, summary);
                    StageStatus::Completed(summary)
                };
                report.record(stage, status, duration);
                Some(outcome)
            }
            Err(e) => {
                tracing::error!("Stage {} failed: {}", stage, e);
                report.record(stage, StageStatus::Failed(e), duration);
                None
            }
        }
    }

    /// Never rolls back: whatever earlier stages created stays in place and is listed in
    /// the report's artifacts.
    ///
    /// A stage runs only when `DeploymentReport::admit` finds every stage it requires usable;
    /// `track` yields a value exactly for usable stages.
    pub async fn run(&self) -> DeploymentReport {
        let mut report = DeploymentReport::default();

        let region = self.config.aws.region.as_str();
        let frontend = self.config.frontend_host();
        let backend = self.config.backend_host();
        let bucket_name = self.config.bucket_name();
        let documents = self.config.website_documents();
        let environment = self.config.environment.name.as_str();
        let environment_wait = self.config.environment_wait();

        if region != "us-east-1" {
            tracing::warn!(
                "CloudFront only accepts certificates issued in us-east-1; region is {}",
                region
            );
        }

        let site: Option<BucketOutcome> = if report.admit(Stage::Bucket) {
            self.track(
                &mut report,
                Stage::Bucket,
                bucket::provision_bucket(&self.provider, &bucket_name, region, &documents),
            )
            .await
        } else {
            None
        };
        if let Some(site) = &site {
            report.artifacts.website_url = Some(site.endpoint().url());
        }

        let plan = self.certificate_plan();
        let certificate: Option<CertificateOutcome> = if report.admit(Stage::Certificate) {
            self.track(
                &mut report,
                Stage::Certificate,
                certificate::obtain_certificate(&self.provider, &frontend, &backend, &plan),
            )
            .await
        } else {
            None
        };
        if let Some(certificate) = &certificate {
            report.artifacts.certificate_arn = Some(certificate.arn.clone());
        }

        let distribution: Option<Distribution> =
            match (report.admit(Stage::Distribution), &certificate) {
                (true, Some(certificate)) => {
                    let work = async {
                        let endpoint =
                            cdn::lookup_website_endpoint(&self.provider, &bucket_name, region)
                                .await?;
                        cdn::provision_distribution(
                            &self.provider,
                            &frontend,
                            &certificate.arn,
                            &endpoint,
                            &self.config.cdn,
                            &documents.index_document,
                        )
                        .await
                    };
                    self.track(&mut report, Stage::Distribution, work).await
                }
                _ => None,
            };
        if let Some(distribution) = &distribution {
            report.artifacts.distribution_id = Some(distribution.id.clone());
            report.artifacts.distribution_domain = Some(distribution.domain_name.clone());
        }

        if let (true, Some(distribution)) = (report.admit(Stage::FrontendDns), &distribution) {
            self.track(
                &mut report,
                Stage::FrontendDns,
                dns::bind_frontend_alias(&self.provider, &frontend, &distribution.domain_name),
            )
            .await;
        }

        let ready: Option<EnvironmentDescription> = if report.admit(Stage::EnvironmentReady) {
            self.track(&mut report, Stage::EnvironmentReady, async {
                readiness::wait_for_environment(&self.provider, environment, environment_wait)
                    .await
                    .into_result(environment, environment_wait)
            })
            .await
        } else {
            None
        };
        if let Some(ready) = &ready {
            report.artifacts.environment_cname = ready.cname.clone();
        }

        if let (true, Some(certificate)) = (report.admit(Stage::BackendHttps), &certificate) {
            self.track(
                &mut report,
                Stage::BackendHttps,
                https::configure_https(&self.provider, environment, &certificate.arn, environment_wait),
            )
            .await;
        }

        if let (true, Some(ready)) = (report.admit(Stage::BackendDns), &ready) {
            let work = async {
                let cname = ready.cname.as_deref().ok_or_else(|| {
                    ProvisionError::provider(
                        "elasticbeanstalk",
                        format!("environment {} reports no CNAME", environment),
                    )
                })?;
                dns::bind_backend_cname(&self.provider, &backend, cname, self.config.dns.backend_ttl)
                    .await
            };
            self.track(&mut report, Stage::BackendDns, work).await;
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCloud;

    fn config() -> DeployConfig {
        let mut config = DeployConfig::default();
        config.certificate.poll_interval_seconds = 5;
        config.certificate.validation_timeout_seconds = 60;
        config.environment.poll_interval_seconds = 5;
        config.environment.ready_timeout_seconds = 30;
        config
    }

    fn cloud() -> InMemoryCloud {
        InMemoryCloud::new("us-east-1")
            .with_hosted_zone("example.com")
            .with_environment("ra-env", "ra-env.us-east-1.elasticbeanstalk.com", &["Ready"])
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_certificate_skips_dependants() {
        let deployment = Deployment::new(cloud().failing("acm:RequestCertificate"), config());

        let report = deployment.run().await;

        // every stage is reported exactly once, skipped ones included
        let order: Vec<Stage> = report.stages.iter().map(|r| r.stage).collect();
        assert_eq!(order, Stage::ALL.to_vec());
        assert!(matches!(report.status(Stage::Certificate), Some(StageStatus::Failed(_))));
        assert!(matches!(
            report.status(Stage::Distribution),
            Some(StageStatus::Skipped { missing: Stage::Certificate })
        ));
        assert!(matches!(
            report.status(Stage::FrontendDns),
            Some(StageStatus::Skipped { missing: Stage::Distribution })
        ));
        assert!(matches!(
            report.status(Stage::BackendHttps),
            Some(StageStatus::Skipped { missing: Stage::Certificate })
        ));
        // independent stages still run
        assert!(report.is_usable(Stage::Bucket));
        assert!(report.is_usable(Stage::BackendDns));
        assert!(deployment.provider().distributions().is_empty());
        assert!(deployment.provider().environment_updates().is_empty());
        assert!(!report.succeeded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_environment_timeout_skips_backend_stages() {
        let cloud = InMemoryCloud::new("us-east-1")
            .with_hosted_zone("example.com")
            .with_environment("ra-env", "ra-env.us-east-1.elasticbeanstalk.com", &["Launching"]);
        let deployment = Deployment::new(cloud, config());

        let report = deployment.run().await;

        assert!(matches!(
            report.status(Stage::EnvironmentReady),
            Some(StageStatus::Failed(ProvisionError::EnvironmentNotReady { .. }))
        ));
        assert!(matches!(report.status(Stage::BackendHttps), Some(StageStatus::Skipped { .. })));
        assert!(matches!(report.status(Stage::BackendDns), Some(StageStatus::Skipped { .. })));
        assert!(report.is_usable(Stage::FrontendDns));
        assert!(report.artifacts.distribution_domain.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stages_run_in_declared_order() {
        let deployment = Deployment::new(cloud(), config());

        let report = deployment.run().await;

        let order: Vec<Stage> = report.stages.iter().map(|r| r.stage).collect();
        assert_eq!(order, Stage::ALL.to_vec());
        assert!(report.succeeded(), "{:?}", report.stages);
    }
}
