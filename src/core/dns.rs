use crate::core::report::StageOutcome;
use crate::domain::model::{HostedZone, RecordSet, RecordTarget, RecordType};
use crate::domain::ports::DnsZones;
use crate::utils::error::Result;

/// Hosted zone of every CloudFront distribution, the same in all accounts.
pub const CLOUDFRONT_HOSTED_ZONE_ID: &str = "Z2FDTNDATAQYW2";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsOutcome {
    Upserted {
        zone_id: String,
        record_name: String,
        record_type: RecordType,
    },
    /// The base domain is not hosted in this account; nothing was written.
    NoMatchingZone { base_domain: String },
}

impl StageOutcome for DnsOutcome {
    fn summary(&self) -> String {
        match self {
            Self::Upserted {
                zone_id,
                record_name,
                record_type,
            } => format!("{} {} upserted in zone {}", record_type.as_str(), record_name, zone_id),
            Self::NoMatchingZone { base_domain } => {
                format!("no hosted zone for {}, record not written", base_domain)
            }
        }
    }

    fn is_recovered(&self) -> bool {
        matches!(self, Self::NoMatchingZone { .. })
    }
}

/// Trailing two labels: `ra-api.example.com` -> `example.com`.
pub fn base_domain(hostname: &str) -> String {
    let labels: Vec<&str> = hostname.trim_end_matches('.').split('.').collect();
    let start = labels.len().saturating_sub(2);
    labels[start..].join(".")
}

pub async fn find_zone<D: DnsZones + ?Sized>(dns: &D, hostname: &str) -> Result<Option<HostedZone>> {
    let base = base_domain(hostname);
    let zones = dns.list_hosted_zones().await?;
    Ok(zones
        .into_iter()
        .find(|zone| zone.name.trim_end_matches('.') == base))
}

/// Upserts `record` into the zone of its base domain, or does nothing when there is none.
pub async fn upsert_in_base_zone<D: DnsZones + ?Sized>(dns: &D, record: RecordSet) -> Result<DnsOutcome> {
    let Some(zone) = find_zone(dns, &record.name).await? else {
        let base = base_domain(&record.name);
        tracing::warn!(
            "No hosted zone found for {}; skipping {} record for {}",
            base,
            record.record_type.as_str(),
            record.name
        );
        return Ok(DnsOutcome::NoMatchingZone { base_domain: base });
    };

    tracing::debug!("Using hosted zone {} ({})", zone.name, zone.id);
    dns.upsert_record(&zone.id, &record).await?;
    tracing::info!(
        "Route 53 {} record upserted for {}",
        record.record_type.as_str(),
        record.name
    );

    Ok(DnsOutcome::Upserted {
        zone_id: zone.id,
        record_name: record.name,
        record_type: record.record_type,
    })
}

/// `A` alias from the site hostname to its CloudFront distribution.
pub async fn bind_frontend_alias<D: DnsZones + ?Sized>(
    dns: &D,
    hostname: &str,
    distribution_domain: &str,
) -> Result<DnsOutcome> {
    let record = RecordSet {
        name: hostname.to_string(),
        record_type: RecordType::A,
        target: RecordTarget::Alias {
            hosted_zone_id: CLOUDFRONT_HOSTED_ZONE_ID.to_string(),
            dns_name: distribution_domain.to_string(),
        },
    };
    upsert_in_base_zone(dns, record).await
}

/// Plain CNAME from the API hostname to the environment address.
pub async fn bind_backend_cname<D: DnsZones + ?Sized>(
    dns: &D,
    hostname: &str,
    target: &str,
    ttl: i64,
) -> Result<DnsOutcome> {
    let record = RecordSet {
        name: hostname.to_string(),
        record_type: RecordType::Cname,
        target: RecordTarget::Values {
            ttl,
            values: vec![target.to_string()],
        },
    };
    upsert_in_base_zone(dns, record).await
}
