//! `CloudProvider` backed by the AWS SDK for Rust.

mod acm;
mod beanstalk;
mod cloudfront;
mod route53;
mod s3;

use crate::config::DeployConfig;
use crate::utils::error::ProvisionError;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::error::ProvideErrorMetadata;
use std::fmt;

#[derive(Debug, Clone)]
pub struct AwsProvider {
    s3: aws_sdk_s3::Client,
    acm: aws_sdk_acm::Client,
    cloudfront: aws_sdk_cloudfront::Client,
    route53: aws_sdk_route53::Client,
    beanstalk: aws_sdk_elasticbeanstalk::Client,
    /// Narrows environment lookups to one Beanstalk application.
    application: Option<String>,
}

impl AwsProvider {
    /// Loads credentials from the default chain, pinned to the configured region.
    pub async fn from_config(config: &DeployConfig) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.aws.region.clone()))
            .load()
            .await;
        Self::new(&sdk_config).with_application(&config.environment.application)
    }

    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            s3: aws_sdk_s3::Client::new(sdk_config),
            acm: aws_sdk_acm::Client::new(sdk_config),
            cloudfront: aws_sdk_cloudfront::Client::new(sdk_config),
            route53: aws_sdk_route53::Client::new(sdk_config),
            beanstalk: aws_sdk_elasticbeanstalk::Client::new(sdk_config),
            application: None,
        }
    }

    pub fn with_application(mut self, application: &str) -> Self {
        self.application = Some(application.to_string()).filter(|a| !a.is_empty());
        self
    }
}

/// Keeps the provider's error code and message verbatim.
pub(crate) fn service_error<E>(service: &'static str, err: E) -> ProvisionError
where
    E: ProvideErrorMetadata + fmt::Display,
{
    let code = err.code().map(str::to_string);
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string());
    ProvisionError::Provider {
        service,
        code,
        message,
    }
}

/// A request builder rejected its input before anything was sent.
pub(crate) fn build_error(service: &'static str, err: impl fmt::Display) -> ProvisionError {
    ProvisionError::provider(service, format!("invalid request: {}", err))
}
