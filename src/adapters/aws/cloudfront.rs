use super::{build_error, service_error, AwsProvider};
use crate::domain::model::{Distribution, DistributionSpec, OriginProtocolPolicy};
use crate::domain::ports::ContentDelivery;
use crate::utils::error::{ProvisionError, Result};
use async_trait::async_trait;
use aws_sdk_cloudfront::types::{
    Aliases, CustomOriginConfig, DefaultCacheBehavior, DistributionConfig,
    MinimumProtocolVersion, Origin, OriginProtocolPolicy as CfOriginProtocolPolicy, Origins,
    SslSupportMethod, ViewerCertificate, ViewerProtocolPolicy as CfViewerProtocolPolicy,
};

fn distribution_config(spec: &DistributionSpec) -> Result<DistributionConfig> {
    let invalid = |e| build_error("cloudfront", e);

    let origin_protocol = match spec.origin_protocol {
        OriginProtocolPolicy::HttpOnly => CfOriginProtocolPolicy::HttpOnly,
        OriginProtocolPolicy::HttpsOnly => CfOriginProtocolPolicy::HttpsOnly,
    };

    let origin = Origin::builder()
        .id(&spec.origin_id)
        .domain_name(&spec.origin_domain)
        .custom_origin_config(
            CustomOriginConfig::builder()
                .http_port(80)
                .https_port(443)
                .origin_protocol_policy(origin_protocol)
                .build()
                .map_err(invalid)?,
        )
        .build()
        .map_err(invalid)?;

    let cache_behavior = DefaultCacheBehavior::builder()
        .target_origin_id(&spec.origin_id)
        .viewer_protocol_policy(CfViewerProtocolPolicy::from(spec.viewer_protocol.as_str()))
        .cache_policy_id(&spec.cache_policy_id)
        .compress(true)
        .build()
        .map_err(invalid)?;

    let viewer_certificate = ViewerCertificate::builder()
        .acm_certificate_arn(&spec.certificate_arn)
        .ssl_support_method(SslSupportMethod::SniOnly)
        .minimum_protocol_version(MinimumProtocolVersion::from(
            spec.minimum_protocol_version.as_str(),
        ))
        .cloud_front_default_certificate(false)
        .build();

    DistributionConfig::builder()
        .caller_reference(&spec.caller_reference)
        .comment(format!("Static site for {}", spec.aliases.join(", ")))
        .aliases(
            Aliases::builder()
                .quantity(spec.aliases.len() as i32)
                .set_items(Some(spec.aliases.clone()))
                .build()
                .map_err(invalid)?,
        )
        .default_root_object(&spec.default_root_object)
        .origins(
            Origins::builder()
                .quantity(1)
                .items(origin)
                .build()
                .map_err(invalid)?,
        )
        .default_cache_behavior(cache_behavior)
        .viewer_certificate(viewer_certificate)
        .enabled(true)
        .build()
        .map_err(invalid)
}

#[async_trait]
impl ContentDelivery for AwsProvider {
    async fn create_distribution(&self, spec: &DistributionSpec) -> Result<Distribution> {
        let output = self
            .cloudfront
            .create_distribution()
            .distribution_config(distribution_config(spec)?)
            .send()
            .await
            .map_err(|e| service_error("cloudfront", e))?;

        let distribution = output.distribution().ok_or_else(|| {
            ProvisionError::provider("cloudfront", "CreateDistribution returned no distribution")
        })?;

        Ok(Distribution {
            id: distribution.id().to_string(),
            domain_name: distribution.domain_name().to_string(),
            status: distribution.status().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ViewerProtocolPolicy;
    use aws_sdk_cloudfront::types::MinimumProtocolVersion as CfMinimumProtocolVersion;

    fn spec(viewer_protocol: ViewerProtocolPolicy) -> DistributionSpec {
        DistributionSpec {
            caller_reference: "ra.example.com-20240309070501000".to_string(),
            aliases: vec!["ra.example.com".to_string()],
            origin_id: "S3-Website-ra.example.com".to_string(),
            origin_domain: "ra.example.com.s3-website-us-east-1.amazonaws.com".to_string(),
            origin_protocol: OriginProtocolPolicy::HttpOnly,
            viewer_protocol,
            cache_policy_id: "658327ea-f89d-4fab-a63d-7e88639e58f6".to_string(),
            default_root_object: "index.html".to_string(),
            certificate_arn: "arn:aws:acm:us-east-1:000000000000:certificate/issued".to_string(),
            minimum_protocol_version: "TLSv1.2_2021".to_string(),
        }
    }

    #[test]
    fn test_website_distribution_config() {
        let config = distribution_config(&spec(ViewerProtocolPolicy::HttpsOnly)).unwrap();

        assert!(config.enabled());
        assert_eq!(config.caller_reference(), "ra.example.com-20240309070501000");
        assert_eq!(config.default_root_object(), Some("index.html"));

        let aliases = config.aliases().unwrap();
        assert_eq!(aliases.quantity(), 1);
        assert_eq!(aliases.items(), ["ra.example.com".to_string()]);

        let origins = config.origins().unwrap();
        assert_eq!(origins.quantity(), 1);
        let origin = &origins.items()[0];
        assert_eq!(origin.domain_name(), "ra.example.com.s3-website-us-east-1.amazonaws.com");
        let custom = origin.custom_origin_config().unwrap();
        assert_eq!(custom.origin_protocol_policy(), &CfOriginProtocolPolicy::HttpOnly);
        assert_eq!((custom.http_port(), custom.https_port()), (80, 443));

        let behavior = config.default_cache_behavior().unwrap();
        assert_eq!(behavior.target_origin_id(), origin.id());
        assert_eq!(behavior.viewer_protocol_policy(), &CfViewerProtocolPolicy::HttpsOnly);
        assert_eq!(behavior.cache_policy_id(), Some("658327ea-f89d-4fab-a63d-7e88639e58f6"));

        let certificate = config.viewer_certificate().unwrap();
        assert_eq!(
            certificate.acm_certificate_arn(),
            Some("arn:aws:acm:us-east-1:000000000000:certificate/issued")
        );
        assert_eq!(certificate.ssl_support_method(), Some(&SslSupportMethod::SniOnly));
        let version = certificate.minimum_protocol_version().unwrap();
        assert!(CfMinimumProtocolVersion::values().contains(&version.as_str()));
    }

    #[test]
    fn test_every_viewer_policy_maps_to_a_known_value() {
        for policy in [
            ViewerProtocolPolicy::HttpsOnly,
            ViewerProtocolPolicy::RedirectToHttps,
            ViewerProtocolPolicy::AllowAll,
        ] {
            let config = distribution_config(&spec(policy)).unwrap();
            let mapped = config.default_cache_behavior().unwrap().viewer_protocol_policy();
            assert!(CfViewerProtocolPolicy::values().contains(&mapped.as_str()), "{:?}", policy);
        }
    }
}
