use crate::config::CdnConfig;
use crate::core::report::StageOutcome;
use crate::domain::model::{
    Distribution, DistributionSpec, OriginProtocolPolicy, WebsiteEndpoint,
};
use crate::domain::ports::{ContentDelivery, ObjectStorage};
use crate::utils::error::{ProvisionError, Result};
use chrono::{DateTime, Utc};

impl StageOutcome for Distribution {
    fn summary(&self) -> String {
        format!("distribution {} at {} ({})", self.id, self.domain_name, self.status)
    }
}

/// The bucket's public website endpoint; fails when website hosting is off.
pub async fn lookup_website_endpoint<S: ObjectStorage + ?Sized>(
    storage: &S,
    bucket: &str,
    region: &str,
) -> Result<WebsiteEndpoint> {
    match storage.get_bucket_website(bucket).await? {
        Some(documents) => {
            let endpoint = WebsiteEndpoint::for_bucket(bucket, region);
            tracing::debug!(
                "Bucket {} serves {} at {}",
                bucket,
                documents.index_document,
                endpoint
            );
            Ok(endpoint)
        }
        None => {
            tracing::error!("Bucket {} has no website configuration", bucket);
            Err(ProvisionError::WebsiteNotConfigured {
                bucket: bucket.to_string(),
            })
        }
    }
}

/// Single custom origin over plain HTTP; website endpoints do not serve HTTPS.
pub fn distribution_spec(
    hostname: &str,
    certificate_arn: &str,
    endpoint: &WebsiteEndpoint,
    settings: &CdnConfig,
    default_root_object: &str,
    now: DateTime<Utc>,
) -> DistributionSpec {
    DistributionSpec {
        caller_reference: format!("{}-{}", hostname, now.format("%Y%m%d%H%M%S%3f")),
        aliases: vec![hostname.to_string()],
        origin_id: format!("S3-Website-{}", hostname),
        origin_domain: endpoint.host.clone(),
        origin_protocol: OriginProtocolPolicy::HttpOnly,
        viewer_protocol: settings.viewer_protocol_policy,
        cache_policy_id: settings.cache_policy_id.clone(),
        default_root_object: default_root_object.to_string(),
        certificate_arn: certificate_arn.to_string(),
        minimum_protocol_version: settings.minimum_protocol_version.clone(),
    }
}

pub async fn provision_distribution<C: ContentDelivery + ?Sized>(
    cdn: &C,
    hostname: &str,
    certificate_arn: &str,
    endpoint: &WebsiteEndpoint,
    settings: &CdnConfig,
    default_root_object: &str,
) -> Result<Distribution> {
    let spec = distribution_spec(
        hostname,
        certificate_arn,
        endpoint,
        settings,
        default_root_object,
        Utc::now(),
    );
    tracing::info!(
        "Creating CloudFront distribution for {} (origin {}, viewer policy {})",
        hostname,
        spec.origin_domain,
        spec.viewer_protocol.as_str()
    );

    let distribution = cdn.create_distribution(&spec).await?;
    tracing::info!(
        "CloudFront distribution created: {} ({})",
        distribution.id,
        distribution.domain_name
    );
    Ok(distribution)
}
