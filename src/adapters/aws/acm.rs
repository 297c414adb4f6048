use super::{service_error, AwsProvider};
use crate::domain::model::{
    CertificateDetails, CertificateRequest, CertificateState, ValidationRecord,
};
use crate::domain::ports::CertificateAuthority;
use crate::utils::error::{ProvisionError, Result};
use async_trait::async_trait;
use aws_sdk_acm::types::{CertificateDetail, ValidationMethod};

fn certificate_details(arn: &str, detail: &CertificateDetail) -> CertificateDetails {
    let state = detail
        .status()
        .map(|status| CertificateState::from_status(status.as_str()))
        .unwrap_or_else(|| CertificateState::Other("UNKNOWN".to_string()));

    let validation_records = detail
        .domain_validation_options()
        .iter()
        .filter_map(|option| {
            option.resource_record().map(|record| ValidationRecord {
                domain_name: option.domain_name().to_string(),
                name: record.name().to_string(),
                value: record.value().to_string(),
            })
        })
        .collect();

    // ACM can list the validation options one name at a time; count the requested names.
    let mut names: Vec<&str> = detail.domain_name().into_iter().collect();
    for name in detail.subject_alternative_names() {
        if !names.contains(&name.as_str()) {
            names.push(name);
        }
    }

    CertificateDetails {
        arn: arn.to_string(),
        state,
        validation_records,
        domain_count: names
            .len()
            .max(detail.domain_validation_options().len())
            .max(1),
    }
}

#[async_trait]
impl CertificateAuthority for AwsProvider {
    async fn request_certificate(&self, request: &CertificateRequest) -> Result<String> {
        let alternative_names = if request.alternative_names.is_empty() {
            None
        } else {
            Some(request.alternative_names.clone())
        };

        let output = self
            .acm
            .request_certificate()
            .domain_name(&request.domain_name)
            .set_subject_alternative_names(alternative_names)
            .validation_method(ValidationMethod::Dns)
            .send()
            .await
            .map_err(|e| service_error("acm", e))?;

        output
            .certificate_arn()
            .map(str::to_string)
            .ok_or_else(|| ProvisionError::provider("acm", "RequestCertificate returned no ARN"))
    }

    async fn describe_certificate(&self, arn: &str) -> Result<CertificateDetails> {
        let output = self
            .acm
            .describe_certificate()
            .certificate_arn(arn)
            .send()
            .await
            .map_err(|e| service_error("acm", e))?;

        let detail = output.certificate().ok_or_else(|| {
            ProvisionError::provider("acm", format!("DescribeCertificate returned nothing for {}", arn))
        })?;

        Ok(certificate_details(arn, detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_acm::types::{CertificateStatus, DomainValidation, RecordType, ResourceRecord};

    const ARN: &str = "arn:aws:acm:us-east-1:000000000000:certificate/pending";

    fn validation(domain: &str, with_record: bool) -> DomainValidation {
        let mut option = DomainValidation::builder().domain_name(domain);
        if with_record {
            option = option.resource_record(
                ResourceRecord::builder()
                    .name(format!("_abc.{}.", domain))
                    .r#type(RecordType::Cname)
                    .value("_xyz.acm-validations.aws.")
                    .build()
                    .unwrap(),
            );
        }
        option.build().unwrap()
    }

    #[test]
    fn test_domain_count_covers_every_requested_name() {
        // only the primary name is listed so far
        let detail = CertificateDetail::builder()
            .domain_name("ra.example.com")
            .subject_alternative_names("ra.example.com")
            .subject_alternative_names("ra-api.example.com")
            .status(CertificateStatus::PendingValidation)
            .domain_validation_options(validation("ra.example.com", true))
            .build();

        let details = certificate_details(ARN, &detail);

        assert_eq!(details.state, CertificateState::PendingValidation);
        assert_eq!(details.domain_count, 2);
        assert_eq!(details.validation_records.len(), 1);
        assert_eq!(details.validation_records[0].name, "_abc.ra.example.com.");
    }

    #[test]
    fn test_records_without_resource_record_are_not_listed() {
        let detail = CertificateDetail::builder()
            .domain_name("ra.example.com")
            .subject_alternative_names("ra.example.com")
            .subject_alternative_names("ra-api.example.com")
            .status(CertificateStatus::Issued)
            .domain_validation_options(validation("ra.example.com", true))
            .domain_validation_options(validation("ra-api.example.com", false))
            .build();

        let details = certificate_details(ARN, &detail);

        assert_eq!(details.state, CertificateState::Issued);
        assert_eq!(details.domain_count, 2);
        assert_eq!(details.validation_records.len(), 1);
    }
}
