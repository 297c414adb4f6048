use super::{build_error, service_error, AwsProvider};
use crate::domain::model::WebsiteDocuments;
use crate::domain::ports::ObjectStorage;
use crate::utils::error::{ProvisionError, Result};
use async_trait::async_trait;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::operation::create_bucket::CreateBucketError;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, ErrorDocument, IndexDocument,
    ObjectOwnership, PublicAccessBlockConfiguration, WebsiteConfiguration,
};

#[async_trait]
impl ObjectStorage for AwsProvider {
    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()> {
        // ObjectWriter keeps ACLs usable for public objects.
        let mut request = self
            .s3
            .create_bucket()
            .bucket(bucket)
            .object_ownership(ObjectOwnership::ObjectWriter);

        // us-east-1 rejects an explicit location constraint.
        if region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => Ok(()),
            Err(err) => match err.into_service_error() {
                CreateBucketError::BucketAlreadyOwnedByYou(_) => {
                    Err(ProvisionError::BucketAlreadyOwned {
                        bucket: bucket.to_string(),
                    })
                }
                CreateBucketError::BucketAlreadyExists(_) => Err(ProvisionError::BucketNameTaken {
                    bucket: bucket.to_string(),
                }),
                err => Err(service_error("s3", err)),
            },
        }
    }

    async fn disable_public_access_block(&self, bucket: &str) -> Result<()> {
        let configuration = PublicAccessBlockConfiguration::builder()
            .block_public_acls(false)
            .ignore_public_acls(false)
            .block_public_policy(false)
            .restrict_public_buckets(false)
            .build();

        self.s3
            .put_public_access_block()
            .bucket(bucket)
            .public_access_block_configuration(configuration)
            .send()
            .await
            .map_err(|e| service_error("s3", e))?;
        Ok(())
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<()> {
        self.s3
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy)
            .send()
            .await
            .map_err(|e| service_error("s3", e))?;
        Ok(())
    }

    async fn put_bucket_website(&self, bucket: &str, documents: &WebsiteDocuments) -> Result<()> {
        let configuration = WebsiteConfiguration::builder()
            .index_document(
                IndexDocument::builder()
                    .suffix(&documents.index_document)
                    .build()
                    .map_err(|e| build_error("s3", e))?,
            )
            .error_document(
                ErrorDocument::builder()
                    .key(&documents.error_document)
                    .build()
                    .map_err(|e| build_error("s3", e))?,
            )
            .build();

        self.s3
            .put_bucket_website()
            .bucket(bucket)
            .website_configuration(configuration)
            .send()
            .await
            .map_err(|e| service_error("s3", e))?;
        Ok(())
    }

    async fn get_bucket_website(&self, bucket: &str) -> Result<Option<WebsiteDocuments>> {
        match self.s3.get_bucket_website().bucket(bucket).send().await {
            Ok(output) => Ok(Some(WebsiteDocuments {
                index_document: output
                    .index_document()
                    .map(|d| d.suffix().to_string())
                    .unwrap_or_default(),
                error_document: output
                    .error_document()
                    .map(|d| d.key().to_string())
                    .unwrap_or_default(),
            })),
            Err(err) => {
                let err = err.into_service_error();
                if err.code() == Some("NoSuchWebsiteConfiguration") {
                    Ok(None)
                } else {
                    Err(service_error("s3", err))
                }
            }
        }
    }
}
