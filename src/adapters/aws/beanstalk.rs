use super::{service_error, AwsProvider};
use crate::domain::model::{EnvironmentDescription, OptionSetting};
use crate::domain::ports::AppPlatform;
use crate::utils::error::Result;
use async_trait::async_trait;
use aws_sdk_elasticbeanstalk::types::ConfigurationOptionSetting;

#[async_trait]
impl AppPlatform for AwsProvider {
    async fn describe_environment(&self, name: &str) -> Result<Option<EnvironmentDescription>> {
        let output = self
            .beanstalk
            .describe_environments()
            .set_application_name(self.application.clone())
            .environment_names(name)
            .include_deleted(false)
            .send()
            .await
            .map_err(|e| service_error("elasticbeanstalk", e))?;

        Ok(output
            .environments()
            .iter()
            .find(|env| env.environment_name() == Some(name))
            .map(|env| EnvironmentDescription {
                name: name.to_string(),
                status: env
                    .status()
                    .map(|s| s.as_str().to_string())
                    .unwrap_or_default(),
                health: env.health().map(|h| h.as_str().to_string()),
                cname: env.cname().map(str::to_string),
            }))
    }

    async fn update_environment_options(
        &self,
        name: &str,
        settings: &[OptionSetting],
    ) -> Result<()> {
        let option_settings = settings
            .iter()
            .map(|setting| {
                ConfigurationOptionSetting::builder()
                    .namespace(&setting.namespace)
                    .option_name(&setting.option_name)
                    .value(&setting.value)
                    .build()
            })
            .collect::<Vec<_>>();

        self.beanstalk
            .update_environment()
            .environment_name(name)
            .set_option_settings(Some(option_settings))
            .send()
            .await
            .map_err(|e| service_error("elasticbeanstalk", e))?;
        Ok(())
    }
}
