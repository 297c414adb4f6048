use crate::core::readiness::wait_for_environment;
use crate::core::report::StageOutcome;
use crate::domain::model::{OptionSetting, WaitPolicy};
use crate::domain::ports::AppPlatform;
use crate::utils::error::Result;

pub const DEFAULT_PROCESS: &str = "default";
pub const REDIRECT_PROCESS: &str = "redirect";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpsOutcome {
    pub environment: String,
    /// Whether the environment came back to Ready after the update.
    pub settled: bool,
}

impl StageOutcome for HttpsOutcome {
    fn summary(&self) -> String {
        if self.settled {
            format!("HTTPS listener configured on {}", self.environment)
        } else {
            format!(
                "HTTPS update submitted on {} but the environment has not settled",
                self.environment
            )
        }
    }

    fn is_recovered(&self) -> bool {
        !self.settled
    }
}

/// HTTPS on 443 with the certificate, and port 80 redirected to it.
pub fn listener_settings(certificate_arn: &str) -> Vec<OptionSetting> {
    let redirect_process = format!("aws:elasticbeanstalk:environment:process:{}", REDIRECT_PROCESS);
    let redirect_rule = format!("aws:elbv2:listenerrule:{}", REDIRECT_PROCESS);

    vec![
        OptionSetting::new("aws:elbv2:listener:443", "ListenerEnabled", "true"),
        OptionSetting::new("aws:elbv2:listener:443", "Protocol", "HTTPS"),
        OptionSetting::new("aws:elbv2:listener:443", "SSLCertificateArns", certificate_arn),
        OptionSetting::new("aws:elbv2:listener:443", "DefaultProcess", DEFAULT_PROCESS),
        OptionSetting::new("aws:elbv2:listener:default", "ListenerEnabled", "true"),
        OptionSetting::new("aws:elbv2:listener:default", "DefaultProcess", DEFAULT_PROCESS),
        OptionSetting::new("aws:elbv2:listener:default", "Rules", REDIRECT_PROCESS),
        OptionSetting::new(&redirect_process, "Port", "443"),
        OptionSetting::new(&redirect_process, "Protocol", "HTTPS"),
        OptionSetting::new(&redirect_rule, "PathPatterns", "/*"),
        OptionSetting::new(&redirect_rule, "Process", REDIRECT_PROCESS),
        OptionSetting::new(&redirect_rule, "Priority", "1"),
    ]
}

/// Submits the listener update once `environment` is Ready.
///
/// Not ready within `policy`: nothing is changed and the error is returned. Not settled after
/// the update: logged, and reported with `settled = false`.
pub async fn configure_https<A: AppPlatform + ?Sized>(
    platform: &A,
    environment: &str,
    certificate_arn: &str,
    policy: WaitPolicy,
) -> Result<HttpsOutcome> {
    wait_for_environment(platform, environment, policy)
        .await
        .into_result(environment, policy)?;

    tracing::info!("Configuring HTTPS listeners on {}", environment);
    platform
        .update_environment_options(environment, &listener_settings(certificate_arn))
        .await?;
    tracing::info!("Listener update submitted for {}", environment);

    let settled = wait_for_environment(platform, environment, policy)
        .await
        .is_ready();
    if !settled {
        tracing::warn!(
            "Environment {} did not return to Ready after the HTTPS update",
            environment
        );
    }

    Ok(HttpsOutcome {
        environment: environment.to_string(),
        settled,
    })
}
