use crate::domain::model::{
    CertificateDetails, CertificateRequest, Distribution, DistributionSpec,
    EnvironmentDescription, HostedZone, OptionSetting, RecordSet, WebsiteDocuments,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Bucket operations used for static website hosting.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Fails with `BucketAlreadyOwned` or `BucketNameTaken` when the name is in use.
    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()>;
    async fn disable_public_access_block(&self, bucket: &str) -> Result<()>;
    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<()>;
    async fn put_bucket_website(&self, bucket: &str, documents: &WebsiteDocuments) -> Result<()>;
    /// `None` when the bucket has no website configuration.
    async fn get_bucket_website(&self, bucket: &str) -> Result<Option<WebsiteDocuments>>;
}

#[async_trait]
pub trait CertificateAuthority: Send + Sync {
    /// Returns the ARN of the new certificate.
    async fn request_certificate(&self, request: &CertificateRequest) -> Result<String>;
    async fn describe_certificate(&self, arn: &str) -> Result<CertificateDetails>;
}

#[async_trait]
pub trait ContentDelivery: Send + Sync {
    async fn create_distribution(&self, spec: &DistributionSpec) -> Result<Distribution>;
}

#[async_trait]
pub trait DnsZones: Send + Sync {
    async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>>;
    /// Create-or-replace semantics.
    async fn upsert_record(&self, zone_id: &str, record: &RecordSet) -> Result<()>;
}

#[async_trait]
pub trait AppPlatform: Send + Sync {
    /// `None` when no live environment has this name.
    async fn describe_environment(&self, name: &str) -> Result<Option<EnvironmentDescription>>;
    async fn update_environment_options(&self, name: &str, settings: &[OptionSetting])
        -> Result<()>;
}

/// Everything the deployment pipeline talks to.
pub trait CloudProvider:
    ObjectStorage + CertificateAuthority + ContentDelivery + DnsZones + AppPlatform
{
}

impl<T> CloudProvider for T where
    T: ObjectStorage + CertificateAuthority + ContentDelivery + DnsZones + AppPlatform
{
}
