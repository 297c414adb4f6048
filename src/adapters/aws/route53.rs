use super::{build_error, service_error, AwsProvider};
use crate::domain::model::{HostedZone, RecordSet, RecordTarget};
use crate::domain::ports::DnsZones;
use crate::utils::error::Result;
use async_trait::async_trait;
use aws_sdk_route53::types::{
    AliasTarget, Change, ChangeAction, ChangeBatch, ResourceRecord, ResourceRecordSet, RrType,
};

/// A single UPSERT of `record`.
fn upsert_batch(record: &RecordSet) -> Result<ChangeBatch> {
    let invalid = |e| build_error("route53", e);

    let mut record_set = ResourceRecordSet::builder()
        .name(&record.name)
        .r#type(RrType::from(record.record_type.as_str()));

    match &record.target {
        RecordTarget::Alias {
            hosted_zone_id,
            dns_name,
        } => {
            record_set = record_set.alias_target(
                AliasTarget::builder()
                    .hosted_zone_id(hosted_zone_id)
                    .dns_name(dns_name)
                    .evaluate_target_health(false)
                    .build()
                    .map_err(invalid)?,
            );
        }
        RecordTarget::Values { ttl, values } => {
            record_set = record_set.ttl(*ttl);
            for value in values {
                record_set = record_set
                    .resource_records(ResourceRecord::builder().value(value).build().map_err(invalid)?);
            }
        }
    }

    let change = Change::builder()
        .action(ChangeAction::Upsert)
        .resource_record_set(record_set.build().map_err(invalid)?)
        .build()
        .map_err(invalid)?;

    ChangeBatch::builder()
        .comment(format!("UPSERT {} {}", record.record_type.as_str(), record.name))
        .changes(change)
        .build()
        .map_err(invalid)
}

#[async_trait]
impl DnsZones for AwsProvider {
    async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>> {
        let mut zones = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let output = self
                .route53
                .list_hosted_zones()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| service_error("route53", e))?;

            zones.extend(output.hosted_zones().iter().map(|zone| HostedZone {
                id: zone.id().trim_start_matches("/hostedzone/").to_string(),
                name: zone.name().to_string(),
            }));

            if !output.is_truncated() {
                break;
            }
            match output.next_marker() {
                Some(next) => marker = Some(next.to_string()),
                None => break,
            }
        }

        tracing::debug!("Found {} hosted zones", zones.len());
        Ok(zones)
    }

    async fn upsert_record(&self, zone_id: &str, record: &RecordSet) -> Result<()> {
        let output = self
            .route53
            .change_resource_record_sets()
            .hosted_zone_id(zone_id)
            .change_batch(upsert_batch(record)?)
            .send()
            .await
            .map_err(|e| service_error("route53", e))?;

        if let Some(info) = output.change_info() {
            tracing::debug!("Route 53 change {} is {}", info.id(), info.status().as_str());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dns::CLOUDFRONT_HOSTED_ZONE_ID;
    use crate::domain::model::RecordType;

    #[test]
    fn test_alias_upsert() {
        let batch = upsert_batch(&RecordSet {
            name: "ra.example.com".to_string(),
            record_type: RecordType::A,
            target: RecordTarget::Alias {
                hosted_zone_id: CLOUDFRONT_HOSTED_ZONE_ID.to_string(),
                dns_name: "d111111abcdef8.cloudfront.net".to_string(),
            },
        })
        .unwrap();

        assert_eq!(batch.changes().len(), 1);
        let change = &batch.changes()[0];
        assert_eq!(change.action(), &ChangeAction::Upsert);
        let record_set = change.resource_record_set().unwrap();
        assert_eq!(record_set.name(), "ra.example.com");
        assert_eq!(record_set.r#type(), &RrType::A);
        assert_eq!(record_set.ttl(), None);
        let alias = record_set.alias_target().unwrap();
        assert_eq!(alias.hosted_zone_id(), "Z2FDTNDATAQYW2");
        assert_eq!(alias.dns_name(), "d111111abcdef8.cloudfront.net");
        assert!(!alias.evaluate_target_health());
    }

    #[test]
    fn test_cname_upsert() {
        let batch = upsert_batch(&RecordSet {
            name: "ra-api.example.com".to_string(),
            record_type: RecordType::Cname,
            target: RecordTarget::Values {
                ttl: 300,
                values: vec!["ra-env.us-east-1.elasticbeanstalk.com".to_string()],
            },
        })
        .unwrap();

        let record_set = batch.changes()[0].resource_record_set().unwrap();
        assert_eq!(record_set.r#type(), &RrType::Cname);
        assert_eq!(record_set.ttl(), Some(300));
        assert!(record_set.alias_target().is_none());
        let values: Vec<&str> = record_set.resource_records().iter().map(|r| r.value()).collect();
        assert_eq!(values, vec!["ra-env.us-east-1.elasticbeanstalk.com"]);
    }
}
