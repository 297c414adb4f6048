use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Public website endpoint of a bucket, e.g. `ra.example.com.s3-website-us-east-1.amazonaws.com`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteEndpoint {
    pub host: String,
}

impl WebsiteEndpoint {
    pub fn for_bucket(bucket: &str, region: &str) -> Self {
        Self {
            host: format!("{}.s3-website-{}.amazonaws.com", bucket, region),
        }
    }

    /// Website endpoints only speak plain HTTP.
    pub fn url(&self) -> String {
        format!("http://{}", self.host)
    }
}

impl fmt::Display for WebsiteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.host)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteDocuments {
    pub index_document: String,
    pub error_document: String,
}

impl Default for WebsiteDocuments {
    fn default() -> Self {
        Self {
            index_document: "index.html".to_string(),
            error_document: "index.html".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    pub domain_name: String,
    pub alternative_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateState {
    PendingValidation,
    Issued,
    /// Terminal states ACM never leaves (`FAILED`, `VALIDATION_TIMED_OUT`, `REVOKED`, ...).
    Failed(String),
    Other(String),
}

impl CertificateState {
    pub fn from_status(status: &str) -> Self {
        match status {
            "PENDING_VALIDATION" => Self::PendingValidation,
            "ISSUED" => Self::Issued,
            "FAILED" | "VALIDATION_TIMED_OUT" | "REVOKED" | "EXPIRED" => {
                Self::Failed(status.to_string())
            }
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for CertificateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PendingValidation => f.write_str("PENDING_VALIDATION"),
            Self::Issued => f.write_str("ISSUED"),
            Self::Failed(s) | Self::Other(s) => f.write_str(s),
        }
    }
}

/// CNAME that ACM wants to see before issuing the certificate for `domain_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRecord {
    pub domain_name: String,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateDetails {
    pub arn: String,
    pub state: CertificateState,
    /// Empty until ACM has generated the records, which happens shortly after the request.
    pub validation_records: Vec<ValidationRecord>,
    /// Number of names on the certificate.
    pub domain_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewerProtocolPolicy {
    HttpsOnly,
    RedirectToHttps,
    AllowAll,
}

impl ViewerProtocolPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HttpsOnly => "https-only",
            Self::RedirectToHttps => "redirect-to-https",
            Self::AllowAll => "allow-all",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginProtocolPolicy {
    HttpOnly,
    HttpsOnly,
}

/// Provider-neutral shape of a single-origin distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionSpec {
    pub caller_reference: String,
    pub aliases: Vec<String>,
    pub origin_id: String,
    pub origin_domain: String,
    pub origin_protocol: OriginProtocolPolicy,
    pub viewer_protocol: ViewerProtocolPolicy,
    pub cache_policy_id: String,
    pub default_root_object: String,
    pub certificate_arn: String,
    pub minimum_protocol_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    pub id: String,
    pub domain_name: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedZone {
    pub id: String,
    /// As Route 53 returns it, with the trailing dot.
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordType {
    A,
    Cname,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Cname => "CNAME",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordTarget {
    Alias {
        hosted_zone_id: String,
        dns_name: String,
    },
    Values {
        ttl: i64,
        values: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    pub name: String,
    pub record_type: RecordType,
    pub target: RecordTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentDescription {
    pub name: String,
    pub status: String,
    pub health: Option<String>,
    pub cname: Option<String>,
}

impl EnvironmentDescription {
    pub fn is_ready(&self) -> bool {
        self.status == "Ready"
    }
}

/// One Beanstalk `ConfigurationOptionSetting`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSetting {
    pub namespace: String,
    pub option_name: String,
    pub value: String,
}

impl OptionSetting {
    pub fn new(namespace: &str, option_name: &str, value: impl Into<String>) -> Self {
        Self {
            namespace: namespace.to_string(),
            option_name: option_name.to_string(),
            value: value.into(),
        }
    }
}

/// Fixed-interval poll bounded by a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl WaitPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}
