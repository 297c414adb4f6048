use std::time::Duration;
use thiserror::Error;

/// Whether a failure leaves the stage usable or stops it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// The resource is in the wanted state anyway, or nothing needed to change.
    Recoverable,
    /// The stage produced nothing usable; dependants are skipped.
    Fatal,
}

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Bucket {bucket} already exists and is owned by you")]
    BucketAlreadyOwned { bucket: String },

    #[error("Bucket {bucket} already exists and is owned by another AWS account")]
    BucketNameTaken { bucket: String },

    #[error("Bucket {bucket} has no website configuration")]
    WebsiteNotConfigured { bucket: String },

    #[error("No hosted zone in this account matches {domain}")]
    HostedZoneNotFound { domain: String },

    #[error("Environment {environment} was not found")]
    EnvironmentNotFound { environment: String },

    #[error("Environment {environment} was not ready within {waited:?}")]
    EnvironmentNotReady { environment: String, waited: Duration },

    #[error("Certificate {arn} ended in status {status}")]
    CertificateNotIssued { arn: String, status: String },

    #[error("Certificate {arn} was not validated within {waited:?}")]
    CertificateValidationTimedOut { arn: String, waited: Duration },

    #[error("{service} request failed: {message}")]
    Provider {
        service: &'static str,
        code: Option<String>,
        message: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration value: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

impl ProvisionError {
    pub fn provider(service: &'static str, message: impl Into<String>) -> Self {
        Self::Provider {
            service,
            code: None,
            message: message.into(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::BucketAlreadyOwned { .. } | Self::HostedZoneNotFound { .. } => {
                ErrorSeverity::Recoverable
            }
            _ => ErrorSeverity::Fatal,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.severity() == ErrorSeverity::Recoverable
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigError { .. }
                | Self::MissingConfigError { .. }
                | Self::InvalidConfigValueError { .. }
        )
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::BucketAlreadyOwned { .. } => "Nothing to do, the bucket is reused",
            Self::BucketNameTaken { .. } => "Pick another frontend hostname; bucket names are global",
            Self::WebsiteNotConfigured { .. } => "Re-run so the bucket stage can enable website hosting",
            Self::HostedZoneNotFound { .. } => "Create a Route 53 hosted zone for the base domain",
            Self::EnvironmentNotFound { .. } => "Check environment.name against the Beanstalk console",
            Self::EnvironmentNotReady { .. } => "Wait for the environment to settle, or raise environment.ready_timeout_seconds",
            Self::CertificateNotIssued { .. } => "Inspect the certificate in ACM and request a new one",
            Self::CertificateValidationTimedOut { .. } => "Check the validation CNAMEs in Route 53, then set certificate.arn and re-run",
            Self::Provider { .. } => "Check AWS credentials, region and service quotas",
            Self::IoError(_) => "Check file permissions and paths",
            Self::SerializationError(_) => "This is a bug in the policy document builder",
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => "Fix the configuration file and retry",
        }
    }
}

pub type Result<T> = std::result::Result<T, ProvisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_taxonomy() {
        let owned = ProvisionError::BucketAlreadyOwned {
            bucket: "ra.example.com".to_string(),
        };
        let taken = ProvisionError::BucketNameTaken {
            bucket: "ra.example.com".to_string(),
        };
        let zone = ProvisionError::HostedZoneNotFound {
            domain: "example.com".to_string(),
        };

        assert_eq!(owned.severity(), ErrorSeverity::Recoverable);
        assert_eq!(zone.severity(), ErrorSeverity::Recoverable);
        assert_eq!(taken.severity(), ErrorSeverity::Fatal);
        assert_eq!(
            ProvisionError::provider("s3", "AccessDenied").severity(),
            ErrorSeverity::Fatal
        );
    }

    #[test]
    fn test_provider_message_is_verbatim() {
        let err = ProvisionError::Provider {
            service: "s3",
            code: Some("AccessDenied".to_string()),
            message: "Access Denied".to_string(),
        };
        assert_eq!(err.to_string(), "s3 request failed: Access Denied");
    }
}
