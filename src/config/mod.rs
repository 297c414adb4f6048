#[cfg(feature = "cli")]
pub mod cli;

use crate::domain::model::{ViewerProtocolPolicy, WaitPolicy, WebsiteDocuments};
use crate::utils::error::{ProvisionError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Picked up from the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "deploy.toml";

/// Everything one deployment run needs, built once at the entry point.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub aws: AwsConfig,
    pub site: SiteConfig,
    pub certificate: CertificateConfig,
    pub cdn: CdnConfig,
    pub environment: EnvironmentConfig,
    pub dns: DnsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    pub region: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub domain: String,
    pub frontend_subdomain: String,
    pub backend_subdomain: String,
    pub index_document: String,
    pub error_document: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let documents = WebsiteDocuments::default();
        Self {
            domain: "example.com".to_string(),
            frontend_subdomain: "ra".to_string(),
            backend_subdomain: "ra-api".to_string(),
            index_document: documents.index_document,
            error_document: documents.error_document,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateConfig {
    /// Reuse this certificate instead of requesting a new one.
    pub arn: Option<String>,
    pub publish_validation_records: bool,
    pub validation_timeout_seconds: u64,
    pub poll_interval_seconds: u64,
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            arn: None,
            publish_validation_records: true,
            validation_timeout_seconds: 1800,
            poll_interval_seconds: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CdnConfig {
    pub viewer_protocol_policy: ViewerProtocolPolicy,
    /// Managed "CachingOptimized" policy.
    pub cache_policy_id: String,
    pub minimum_protocol_version: String,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            viewer_protocol_policy: ViewerProtocolPolicy::HttpsOnly,
            cache_policy_id: "658327ea-f89d-4fab-a63d-7e88639e58f6".to_string(),
            minimum_protocol_version: "TLSv1.2_2021".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub application: String,
    pub name: String,
    pub ready_timeout_seconds: u64,
    pub poll_interval_seconds: u64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            application: "ra-app".to_string(),
            name: "ra-env".to_string(),
            ready_timeout_seconds: 600,
            poll_interval_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsConfig {
    pub backend_ttl: i64,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self { backend_ttl: 300 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
        }
    }
}

impl DeployConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ProvisionError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ProvisionError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Explicit path, then `deploy.toml` if present, then built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ProvisionError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn frontend_host(&self) -> String {
        format!("{}.{}", self.site.frontend_subdomain, self.site.domain)
    }

    pub fn backend_host(&self) -> String {
        format!("{}.{}", self.site.backend_subdomain, self.site.domain)
    }

    /// The bucket is named after the site it serves.
    pub fn bucket_name(&self) -> String {
        self.frontend_host()
    }

    pub fn website_documents(&self) -> WebsiteDocuments {
        WebsiteDocuments {
            index_document: self.site.index_document.clone(),
            error_document: self.site.error_document.clone(),
        }
    }

    pub fn environment_wait(&self) -> WaitPolicy {
        WaitPolicy::new(
            Duration::from_secs(self.environment.poll_interval_seconds),
            Duration::from_secs(self.environment.ready_timeout_seconds),
        )
    }

    pub fn certificate_wait(&self) -> WaitPolicy {
        WaitPolicy::new(
            Duration::from_secs(self.certificate.poll_interval_seconds),
            Duration::from_secs(self.certificate.validation_timeout_seconds),
        )
    }
}

impl Validate for DeployConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_aws_region("aws.region", &self.aws.region)?;

        validation::validate_hostname("site.domain", &self.site.domain)?;
        validation::validate_hostname("site.frontend_subdomain", &self.frontend_host())?;
        validation::validate_hostname("site.backend_subdomain", &self.backend_host())?;
        validation::validate_s3_bucket_name("site.frontend_subdomain", &self.bucket_name())?;
        validation::validate_non_empty_string("site.index_document", &self.site.index_document)?;
        validation::validate_non_empty_string("site.error_document", &self.site.error_document)?;

        if let Some(arn) = &self.certificate.arn {
            if !arn.starts_with("arn:") {
                return Err(ProvisionError::InvalidConfigValueError {
                    field: "certificate.arn".to_string(),
                    value: arn.clone(),
                    reason: "Expected an ACM certificate ARN".to_string(),
                });
            }
        }
        validation::validate_positive_number(
            "certificate.poll_interval_seconds",
            self.certificate.poll_interval_seconds,
            1,
        )?;
        validation::validate_positive_number(
            "certificate.validation_timeout_seconds",
            self.certificate.validation_timeout_seconds,
            1,
        )?;

        validation::validate_non_empty_string("environment.name", &self.environment.name)?;
        validation::validate_positive_number(
            "environment.poll_interval_seconds",
            self.environment.poll_interval_seconds,
            1,
        )?;
        validation::validate_positive_number(
            "environment.ready_timeout_seconds",
            self.environment.ready_timeout_seconds,
            1,
        )?;

        validation::validate_range("dns.backend_ttl", self.dns.backend_ttl, 1, 172_800)?;

        tracing::debug!("Configuration validation passed");
        Ok(())
    }
}
