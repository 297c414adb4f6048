//! In-memory cloud used for `--dry-run` rehearsals and tests.
//!
//! Behaves like the real control planes where the pipeline cares: bucket names are global,
//! record writes are upserts, certificates issue once their validation CNAMEs exist in a hosted
//! zone, and environments walk through a scripted list of statuses.

use crate::config::DeployConfig;
use crate::core::dns::base_domain;
use crate::domain::model::{
    CertificateDetails, CertificateRequest, CertificateState, Distribution, DistributionSpec,
    EnvironmentDescription, HostedZone, OptionSetting, RecordSet, RecordTarget, RecordType,
    ValidationRecord, WebsiteDocuments,
};
use crate::domain::ports::{AppPlatform, CertificateAuthority, ContentDelivery, DnsZones, ObjectStorage};
use crate::utils::error::{ProvisionError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketEntry {
    pub public_access_blocked: bool,
    pub policy: Option<String>,
    pub website: Option<WebsiteDocuments>,
}

#[derive(Debug, Clone)]
struct CertificateEntry {
    request: CertificateRequest,
    state: CertificateState,
    validation_records: Vec<ValidationRecord>,
    requested_at: Instant,
}

#[derive(Debug, Clone)]
struct EnvironmentEntry {
    cname: String,
    health: String,
    /// Front is the status reported by the next query; the last one sticks.
    statuses: VecDeque<String>,
    after_update: Vec<String>,
}

impl EnvironmentEntry {
    fn next_status(&mut self) -> String {
        if self.statuses.len() > 1 {
            self.statuses.pop_front().unwrap_or_default()
        } else {
            self.statuses.front().cloned().unwrap_or_default()
        }
    }
}

#[derive(Debug, Default)]
struct CloudState {
    buckets: BTreeMap<String, BucketEntry>,
    foreign_buckets: HashSet<String>,
    certificates: BTreeMap<String, CertificateEntry>,
    distributions: Vec<(DistributionSpec, Distribution)>,
    zones: Vec<HostedZone>,
    records: BTreeMap<String, BTreeMap<(String, RecordType), RecordSet>>,
    environments: HashMap<String, EnvironmentEntry>,
    environment_updates: Vec<(String, Vec<OptionSetting>)>,
    environment_queries: Vec<Instant>,
    /// How long after a request ACM starts listing the validation records.
    validation_delay: Duration,
    failing: HashSet<String>,
    calls: Vec<String>,
}

impl CloudState {
    fn call(&mut self, operation: &str, target: &str) -> Result<()> {
        self.calls.push(format!("{} {}", operation, target));
        if self.failing.contains(operation) {
            return Err(ProvisionError::Provider {
                service: "memory",
                code: Some("InjectedFailure".to_string()),
                message: format!("{} failed for {}", operation, target),
            });
        }
        Ok(())
    }

    fn has_cname(&self, name: &str, value: &str) -> bool {
        self.records.values().any(|zone| {
            zone.get(&(name.to_string(), RecordType::Cname))
                .map(|record| match &record.target {
                    RecordTarget::Values { values, .. } => values.iter().any(|v| v == value),
                    RecordTarget::Alias { .. } => false,
                })
                .unwrap_or(false)
        })
    }
}

#[derive(Debug)]
pub struct InMemoryCloud {
    region: String,
    state: Mutex<CloudState>,
}

impl InMemoryCloud {
    pub fn new(region: &str) -> Self {
        Self {
            region: region.to_string(),
            state: Mutex::new(CloudState::default()),
        }
    }

    /// A cloud where the configured zones exist, the environment is already Ready and a
    /// configured `certificate.arn` is issued.
    pub fn rehearsal(config: &DeployConfig) -> Self {
        let mut cloud = Self::new(&config.aws.region);
        let mut zones: Vec<String> = vec![
            base_domain(&config.frontend_host()),
            base_domain(&config.backend_host()),
        ];
        zones.dedup();
        for zone in zones {
            cloud = cloud.with_hosted_zone(&zone);
        }
        let cname = format!(
            "{}.{}.elasticbeanstalk.com",
            config.environment.name, config.aws.region
        );
        if let Some(arn) = &config.certificate.arn {
            cloud = cloud.with_certificate(arn, &config.frontend_host(), CertificateState::Issued);
        }
        cloud.with_environment(&config.environment.name, &cname, &["Ready"])
    }

    fn lock(&self) -> MutexGuard<'_, CloudState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_hosted_zone(self, name: &str) -> Self {
        {
            let mut state = self.lock();
            let id = format!("Z{:05}EXAMPLE", state.zones.len() + 1);
            let name = format!("{}.", name.trim_end_matches('.'));
            state.records.insert(id.clone(), BTreeMap::new());
            state.zones.push(HostedZone { id, name });
        }
        self
    }

    pub fn with_foreign_bucket(self, name: &str) -> Self {
        self.lock().foreign_buckets.insert(name.to_string());
        self
    }

    pub fn with_bucket(self, name: &str, website: Option<WebsiteDocuments>) -> Self {
        self.lock().buckets.insert(
            name.to_string(),
            BucketEntry {
                public_access_blocked: false,
                policy: None,
                website,
            },
        );
        self
    }

    pub fn with_certificate(self, arn: &str, domain_name: &str, state: CertificateState) -> Self {
        self.lock().certificates.insert(
            arn.to_string(),
            CertificateEntry {
                request: CertificateRequest {
                    domain_name: domain_name.to_string(),
                    alternative_names: Vec::new(),
                },
                state,
                validation_records: Vec::new(),
                requested_at: Instant::now(),
            },
        );
        self
    }

    /// Hides the validation records of new certificates for `delay` after the request.
    pub fn with_validation_delay(self, delay: Duration) -> Self {
        self.lock().validation_delay = delay;
        self
    }

    pub fn with_environment(self, name: &str, cname: &str, statuses: &[&str]) -> Self {
        self.lock().environments.insert(
            name.to_string(),
            EnvironmentEntry {
                cname: cname.to_string(),
                health: "Green".to_string(),
                statuses: statuses.iter().map(|s| s.to_string()).collect(),
                after_update: vec!["Updating".to_string(), "Ready".to_string()],
            },
        );
        self
    }

    /// Statuses the environment reports after a configuration update.
    pub fn with_post_update_statuses(self, name: &str, statuses: &[&str]) -> Self {
        if let Some(env) = self.lock().environments.get_mut(name) {
            env.after_update = statuses.iter().map(|s| s.to_string()).collect();
        }
        self
    }

    /// Makes every call of `operation` (e.g. `acm:RequestCertificate`) fail.
    pub fn failing(self, operation: &str) -> Self {
        self.lock().failing.insert(operation.to_string());
        self
    }

    pub fn bucket(&self, name: &str) -> Option<BucketEntry> {
        self.lock().buckets.get(name).cloned()
    }

    pub fn record(&self, name: &str, record_type: RecordType) -> Option<RecordSet> {
        let key = (name.to_string(), record_type);
        self.lock()
            .records
            .values()
            .find_map(|zone| zone.get(&key).cloned())
    }

    pub fn record_count(&self) -> usize {
        self.lock().records.values().map(|zone| zone.len()).sum()
    }

    pub fn certificate_requests(&self) -> Vec<CertificateRequest> {
        self.lock()
            .certificates
            .values()
            .map(|c| c.request.clone())
            .collect()
    }

    pub fn distributions(&self) -> Vec<(DistributionSpec, Distribution)> {
        self.lock().distributions.clone()
    }

    pub fn environment_updates(&self) -> Vec<(String, Vec<OptionSetting>)> {
        self.lock().environment_updates.clone()
    }

    pub fn environment_queries(&self) -> Vec<Instant> {
        self.lock().environment_queries.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }
}

#[async_trait]
impl ObjectStorage for InMemoryCloud {
    async fn create_bucket(&self, bucket: &str, _region: &str) -> Result<()> {
        let mut state = self.lock();
        state.call("s3:CreateBucket", bucket)?;
        if state.foreign_buckets.contains(bucket) {
            return Err(ProvisionError::BucketNameTaken {
                bucket: bucket.to_string(),
            });
        }
        if state.buckets.contains_key(bucket) {
            return Err(ProvisionError::BucketAlreadyOwned {
                bucket: bucket.to_string(),
            });
        }
        state.buckets.insert(
            bucket.to_string(),
            BucketEntry {
                public_access_blocked: true,
                policy: None,
                website: None,
            },
        );
        Ok(())
    }

    async fn disable_public_access_block(&self, bucket: &str) -> Result<()> {
        let mut state = self.lock();
        state.call("s3:PutPublicAccessBlock", bucket)?;
        let entry = state.buckets.get_mut(bucket).ok_or_else(|| no_such_bucket(bucket))?;
        entry.public_access_blocked = false;
        Ok(())
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<()> {
        let mut state = self.lock();
        state.call("s3:PutBucketPolicy", bucket)?;
        let entry = state.buckets.get_mut(bucket).ok_or_else(|| no_such_bucket(bucket))?;
        if entry.public_access_blocked {
            return Err(ProvisionError::Provider {
                service: "s3",
                code: Some("AccessDenied".to_string()),
                message: "public policies are blocked by the BlockPublicPolicy setting".to_string(),
            });
        }
        entry.policy = Some(policy.to_string());
        Ok(())
    }

    async fn put_bucket_website(&self, bucket: &str, documents: &WebsiteDocuments) -> Result<()> {
        let mut state = self.lock();
        state.call("s3:PutBucketWebsite", bucket)?;
        let entry = state.buckets.get_mut(bucket).ok_or_else(|| no_such_bucket(bucket))?;
        entry.website = Some(documents.clone());
        Ok(())
    }

    async fn get_bucket_website(&self, bucket: &str) -> Result<Option<WebsiteDocuments>> {
        let mut state = self.lock();
        state.call("s3:GetBucketWebsite", bucket)?;
        let entry = state.buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))?;
        Ok(entry.website.clone())
    }
}

fn no_such_bucket(bucket: &str) -> ProvisionError {
    ProvisionError::Provider {
        service: "s3",
        code: Some("NoSuchBucket".to_string()),
        message: format!("The specified bucket does not exist: {}", bucket),
    }
}

#[async_trait]
impl CertificateAuthority for InMemoryCloud {
    async fn request_certificate(&self, request: &CertificateRequest) -> Result<String> {
        let mut state = self.lock();
        state.call("acm:RequestCertificate", &request.domain_name)?;
        let serial = state.certificates.len() + 1;
        let arn = format!(
            "arn:aws:acm:{}:000000000000:certificate/{:08}-0000-4000-8000-000000000000",
            self.region, serial
        );
        let validation_records = std::iter::once(&request.domain_name)
            .chain(request.alternative_names.iter())
            .enumerate()
            .map(|(i, domain)| ValidationRecord {
                domain_name: domain.clone(),
                name: format!("_{:04}{:04}.{}.", serial, i, domain),
                value: format!("_{:04}{:04}.acm-validations.aws.", serial, i),
            })
            .collect();
        state.certificates.insert(
            arn.clone(),
            CertificateEntry {
                request: request.clone(),
                state: CertificateState::PendingValidation,
                validation_records,
                requested_at: Instant::now(),
            },
        );
        Ok(arn)
    }

    async fn describe_certificate(&self, arn: &str) -> Result<CertificateDetails> {
        let mut state = self.lock();
        state.call("acm:DescribeCertificate", arn)?;
        let entry = state.certificates.get(arn).cloned().ok_or_else(|| ProvisionError::Provider {
            service: "acm",
            code: Some("ResourceNotFoundException".to_string()),
            message: format!("Could not find certificate {}", arn),
        })?;

        let validation_records = if Instant::now() >= entry.requested_at + state.validation_delay {
            entry.validation_records.clone()
        } else {
            Vec::new()
        };
        let validated = !validation_records.is_empty()
            && validation_records
                .iter()
                .all(|r| state.has_cname(&r.name, &r.value));
        let current = if entry.state == CertificateState::PendingValidation && validated {
            CertificateState::Issued
        } else {
            entry.state.clone()
        };
        if let Some(stored) = state.certificates.get_mut(arn) {
            stored.state = current.clone();
        }

        Ok(CertificateDetails {
            arn: arn.to_string(),
            state: current,
            domain_count: 1 + entry.request.alternative_names.len(),
            validation_records,
        })
    }
}

#[async_trait]
impl ContentDelivery for InMemoryCloud {
    async fn create_distribution(&self, spec: &DistributionSpec) -> Result<Distribution> {
        let mut state = self.lock();
        state.call("cloudfront:CreateDistribution", &spec.caller_reference)?;
        match state.certificates.get(&spec.certificate_arn) {
            Some(cert) if cert.state == CertificateState::Issued => {}
            _ => {
                return Err(ProvisionError::Provider {
                    service: "cloudfront",
                    code: Some("InvalidViewerCertificate".to_string()),
                    message: format!(
                        "The certificate {} is missing or not issued",
                        spec.certificate_arn
                    ),
                })
            }
        }
        let serial = state.distributions.len() + 1;
        let distribution = Distribution {
            id: format!("E{:012}", serial),
            domain_name: format!("d{:012}.cloudfront.net", serial),
            status: "InProgress".to_string(),
        };
        state.distributions.push((spec.clone(), distribution.clone()));
        Ok(distribution)
    }
}

#[async_trait]
impl DnsZones for InMemoryCloud {
    async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>> {
        let mut state = self.lock();
        state.call("route53:ListHostedZones", "*")?;
        Ok(state.zones.clone())
    }

    async fn upsert_record(&self, zone_id: &str, record: &RecordSet) -> Result<()> {
        let mut state = self.lock();
        state.call("route53:ChangeResourceRecordSets", &record.name)?;
        let zone = state.records.get_mut(zone_id).ok_or_else(|| ProvisionError::Provider {
            service: "route53",
            code: Some("NoSuchHostedZone".to_string()),
            message: format!("No hosted zone found with ID: {}", zone_id),
        })?;
        zone.insert((record.name.clone(), record.record_type), record.clone());
        Ok(())
    }
}

#[async_trait]
impl AppPlatform for InMemoryCloud {
    async fn describe_environment(&self, name: &str) -> Result<Option<EnvironmentDescription>> {
        let mut state = self.lock();
        state.environment_queries.push(Instant::now());
        state.call("elasticbeanstalk:DescribeEnvironments", name)?;
        Ok(state.environments.get_mut(name).map(|env| EnvironmentDescription {
            name: name.to_string(),
            status: env.next_status(),
            health: Some(env.health.clone()),
            cname: Some(env.cname.clone()),
        }))
    }

    async fn update_environment_options(
        &self,
        name: &str,
        settings: &[OptionSetting],
    ) -> Result<()> {
        let mut state = self.lock();
        state.call("elasticbeanstalk:UpdateEnvironment", name)?;
        let env = state.environments.get_mut(name).ok_or_else(|| ProvisionError::Provider {
            service: "elasticbeanstalk",
            code: Some("InvalidParameterValue".to_string()),
            message: format!("No Environment found for EnvironmentName = '{}'", name),
        })?;
        env.statuses = env.after_update.iter().cloned().collect();
        state
            .environment_updates
            .push((name.to_string(), settings.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bucket_names_are_global() {
        let cloud = InMemoryCloud::new("us-east-1").with_foreign_bucket("taken.example.com");

        assert!(cloud.create_bucket("ra.example.com", "us-east-1").await.is_ok());
        assert!(matches!(
            cloud.create_bucket("ra.example.com", "us-east-1").await,
            Err(ProvisionError::BucketAlreadyOwned { .. })
        ));
        assert!(matches!(
            cloud.create_bucket("taken.example.com", "us-east-1").await,
            Err(ProvisionError::BucketNameTaken { .. })
        ));
    }

    #[tokio::test]
    async fn test_certificate_issues_once_validation_records_exist() {
        let cloud = InMemoryCloud::new("us-east-1").with_hosted_zone("example.com");
        let arn = cloud
            .request_certificate(&CertificateRequest {
                domain_name: "ra.example.com".to_string(),
                alternative_names: vec!["ra-api.example.com".to_string()],
            })
            .await
            .unwrap();

        let details = cloud.describe_certificate(&arn).await.unwrap();
        assert_eq!(details.state, CertificateState::PendingValidation);
        assert_eq!(details.validation_records.len(), 2);

        let zone_id = cloud.list_hosted_zones().await.unwrap()[0].id.clone();
        for record in &details.validation_records {
            cloud
                .upsert_record(
                    &zone_id,
                    &RecordSet {
                        name: record.name.clone(),
                        record_type: RecordType::Cname,
                        target: RecordTarget::Values {
                            ttl: 300,
                            values: vec![record.value.clone()],
                        },
                    },
                )
                .await
                .unwrap();
        }

        let details = cloud.describe_certificate(&arn).await.unwrap();
        assert_eq!(details.state, CertificateState::Issued);
    }

    #[tokio::test]
    async fn test_environment_statuses_advance_and_stick() {
        let cloud = InMemoryCloud::new("us-east-1").with_environment(
            "ra-env",
            "ra-env.us-east-1.elasticbeanstalk.com",
            &["Launching", "Ready"],
        );

        let first = cloud.describe_environment("ra-env").await.unwrap().unwrap();
        let second = cloud.describe_environment("ra-env").await.unwrap().unwrap();
        let third = cloud.describe_environment("ra-env").await.unwrap().unwrap();
        assert_eq!(first.status, "Launching");
        assert!(second.is_ready());
        assert!(third.is_ready());
        assert!(cloud.describe_environment("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failing_operation() {
        let cloud = InMemoryCloud::new("us-east-1").failing("route53:ListHostedZones");
        let err = cloud.list_hosted_zones().await.unwrap_err();
        assert!(matches!(err, ProvisionError::Provider { service: "memory", .. }));
    }
}
