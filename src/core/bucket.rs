use crate::core::report::StageOutcome;
use crate::domain::model::{WebsiteDocuments, WebsiteEndpoint};
use crate::domain::ports::ObjectStorage;
use crate::utils::error::{ProvisionError, Result};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketOutcome {
    Created(WebsiteEndpoint),
    /// The caller already owns the bucket; its configuration was re-applied.
    AlreadyOwned(WebsiteEndpoint),
}

impl BucketOutcome {
    pub fn endpoint(&self) -> &WebsiteEndpoint {
        match self {
            Self::Created(endpoint) | Self::AlreadyOwned(endpoint) => endpoint,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::AlreadyOwned(_))
    }
}

impl StageOutcome for BucketOutcome {
    fn summary(&self) -> String {
        match self {
            Self::Created(endpoint) => format!("website at {}", endpoint.url()),
            Self::AlreadyOwned(endpoint) => {
                format!("bucket already owned, website at {}", endpoint.url())
            }
        }
    }

    fn is_recovered(&self) -> bool {
        self.is_duplicate()
    }
}

/// Anonymous `s3:GetObject` on every key of the bucket.
pub fn public_read_policy(bucket: &str) -> Result<String> {
    let policy = json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Sid": "PublicReadGetObject",
                "Effect": "Allow",
                "Principal": "*",
                "Action": ["s3:GetObject"],
                "Resource": [format!("arn:aws:s3:::{}/*", bucket)]
            }
        ]
    });
    Ok(serde_json::to_string(&policy)?)
}

/// Creates `bucket` and configures it for public static website hosting.
pub async fn provision_bucket<S: ObjectStorage + ?Sized>(
    storage: &S,
    bucket: &str,
    region: &str,
    documents: &WebsiteDocuments,
) -> Result<BucketOutcome> {
    tracing::info!("Creating bucket '{}' in region {}", bucket, region);

    let endpoint = WebsiteEndpoint::for_bucket(bucket, region);
    let outcome = match storage.create_bucket(bucket, region).await {
        Ok(()) => {
            tracing::info!("Successfully created bucket: {}", bucket);
            BucketOutcome::Created(endpoint)
        }
        Err(ProvisionError::BucketAlreadyOwned { .. }) => {
            tracing::warn!("Bucket {} already exists and is owned by you", bucket);
            BucketOutcome::AlreadyOwned(endpoint)
        }
        Err(e) => {
            tracing::error!("Error creating bucket: {}", e);
            return Err(e);
        }
    };

    storage.disable_public_access_block(bucket).await?;
    tracing::info!("Public access block settings updated");

    storage
        .put_bucket_policy(bucket, &public_read_policy(bucket)?)
        .await?;
    tracing::info!("Bucket policy applied");

    storage.put_bucket_website(bucket, documents).await?;
    tracing::info!(
        "Static website hosting configured (index: {}, error: {})",
        documents.index_document,
        documents.error_document
    );

    tracing::info!("Website URL: {}", outcome.endpoint().url());
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCloud;

    #[tokio::test]
    async fn test_fresh_bucket_is_created_and_configured() {
        let cloud = InMemoryCloud::new("us-east-1");
        let documents = WebsiteDocuments::default();

        let outcome = provision_bucket(&cloud, "ra.example.com", "us-east-1", &documents)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            BucketOutcome::Created(WebsiteEndpoint {
                host: "ra.example.com.s3-website-us-east-1.amazonaws.com".to_string()
            })
        );
        assert_eq!(
            outcome.endpoint().url(),
            "http://ra.example.com.s3-website-us-east-1.amazonaws.com"
        );

        let bucket = cloud.bucket("ra.example.com").unwrap();
        assert!(!bucket.public_access_blocked);
        assert_eq!(bucket.website, Some(documents));
        assert!(bucket.policy.unwrap().contains("arn:aws:s3:::ra.example.com/*"));
    }

    #[tokio::test]
    async fn test_rerun_on_owned_bucket_is_recoverable_duplicate() {
        let cloud = InMemoryCloud::new("us-east-1");
        let documents = WebsiteDocuments::default();

        provision_bucket(&cloud, "ra.example.com", "us-east-1", &documents)
            .await
            .unwrap();
        let second = provision_bucket(&cloud, "ra.example.com", "us-east-1", &documents)
            .await
            .unwrap();

        assert!(second.is_duplicate());
        assert!(second.is_recovered());
        assert_eq!(
            second.endpoint().host,
            "ra.example.com.s3-website-us-east-1.amazonaws.com"
        );
    }

    #[tokio::test]
    async fn test_bucket_owned_elsewhere_is_fatal() {
        let cloud = InMemoryCloud::new("us-east-1").with_foreign_bucket("ra.example.com");

        let err = provision_bucket(&cloud, "ra.example.com", "us-east-1", &WebsiteDocuments::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::BucketNameTaken { .. }));
        assert!(!err.is_recoverable());
        assert!(cloud.bucket("ra.example.com").is_none());
    }

    #[tokio::test]
    async fn test_unclassified_error_surfaces_and_stops_configuration() {
        let cloud = InMemoryCloud::new("us-east-1").failing("s3:CreateBucket");

        let err = provision_bucket(&cloud, "ra.example.com", "us-east-1", &WebsiteDocuments::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::Provider { .. }));
        assert_eq!(cloud.calls(), vec!["s3:CreateBucket ra.example.com".to_string()]);
    }

    #[test]
    fn test_public_read_policy_document() {
        let policy: serde_json::Value =
            serde_json::from_str(&public_read_policy("ra.example.com").unwrap()).unwrap();

        assert_eq!(policy["Statement"][0]["Sid"], "PublicReadGetObject");
        assert_eq!(policy["Statement"][0]["Principal"], "*");
        assert_eq!(policy["Statement"][0]["Action"][0], "s3:GetObject");
        assert_eq!(
            policy["Statement"][0]["Resource"][0],
            "arn:aws:s3:::ra.example.com/*"
        );
    }
}
