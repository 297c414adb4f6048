use crate::utils::error::ProvisionError;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// What a stage hands back to the report.
pub trait StageOutcome {
    fn summary(&self) -> String;

    /// Done, but in a degraded way that needs a look (duplicate, soft no-op, unsettled).
    fn is_recovered(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Bucket,
    Certificate,
    Distribution,
    FrontendDns,
    EnvironmentReady,
    BackendHttps,
    BackendDns,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Bucket,
        Stage::Certificate,
        Stage::Distribution,
        Stage::FrontendDns,
        Stage::EnvironmentReady,
        Stage::BackendHttps,
        Stage::BackendDns,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Bucket => "bucket",
            Stage::Certificate => "certificate",
            Stage::Distribution => "distribution",
            Stage::FrontendDns => "frontend-dns",
            Stage::EnvironmentReady => "environment-ready",
            Stage::BackendHttps => "backend-https",
            Stage::BackendDns => "backend-dns",
        }
    }

    /// Stages whose results this one consumes.
    pub fn requires(&self) -> &'static [Stage] {
        match self {
            Stage::Bucket | Stage::Certificate | Stage::EnvironmentReady => &[],
            Stage::Distribution => &[Stage::Bucket, Stage::Certificate],
            Stage::FrontendDns => &[Stage::Distribution],
            Stage::BackendHttps => &[Stage::EnvironmentReady, Stage::Certificate],
            Stage::BackendDns => &[Stage::EnvironmentReady],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug)]
pub enum StageStatus {
    Completed(String),
    Recovered(String),
    Failed(ProvisionError),
    Skipped { missing: Stage },
}

impl StageStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Recovered(_) => "recovered",
            Self::Failed(_) => "failed",
            Self::Skipped { .. } => "skipped",
        }
    }

    pub fn detail(&self) -> String {
        match self {
            Self::Completed(detail) | Self::Recovered(detail) => detail.clone(),
            Self::Failed(e) => e.to_string(),
            Self::Skipped { missing } => format!("requires {}", missing),
        }
    }

    /// The stage produced a result later stages may build on.
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Recovered(_))
    }
}

#[derive(Debug)]
pub struct StageReport {
    pub stage: Stage,
    pub status: StageStatus,
    pub duration: Duration,
}

/// Identifiers produced along the way, kept for the operator when a later stage fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Artifacts {
    pub website_url: Option<String>,
    pub certificate_arn: Option<String>,
    pub distribution_id: Option<String>,
    pub distribution_domain: Option<String>,
    pub environment_cname: Option<String>,
}

#[derive(Debug, Default)]
pub struct DeploymentReport {
    pub stages: Vec<StageReport>,
    pub artifacts: Artifacts,
}

impl DeploymentReport {
    pub fn record(&mut self, stage: Stage, status: StageStatus, duration: Duration) {
        self.stages.push(StageReport {
            stage,
            status,
            duration,
        });
    }

    /// Whether every stage `stage` requires is usable. Otherwise `stage` is recorded as
    /// skipped because of its first unusable dependency.
    pub fn admit(&mut self, stage: Stage) -> bool {
        let missing = stage
            .requires()
            .iter()
            .copied()
            .find(|dependency| !self.is_usable(*dependency));
        match missing {
            None => true,
            Some(missing) => {
                tracing::warn!("Skipping stage {}: {} did not succeed", stage, missing);
                self.record(stage, StageStatus::Skipped { missing }, Duration::ZERO);
                false
            }
        }
    }

    pub fn status(&self, stage: Stage) -> Option<&StageStatus> {
        self.stages
            .iter()
            .find(|report| report.stage == stage)
            .map(|report| &report.status)
    }

    pub fn is_usable(&self, stage: Stage) -> bool {
        self.status(stage).map(StageStatus::is_usable).unwrap_or(false)
    }

    /// Every stage ran and none failed.
    pub fn succeeded(&self) -> bool {
        Stage::ALL.iter().all(|stage| self.is_usable(*stage))
    }

    pub fn log(&self) {
        for report in &self.stages {
            match &report.status {
                StageStatus::Completed(_) => tracing::info!(
                    "✅ {:<18} {} ({:?})",
                    report.stage.name(),
                    report.status.detail(),
                    report.duration
                ),
                StageStatus::Recovered(_) => tracing::warn!(
                    "⚠️ {:<18} {} ({:?})",
                    report.stage.name(),
                    report.status.detail(),
                    report.duration
                ),
                StageStatus::Failed(e) => tracing::error!(
                    "❌ {:<18} {} | {}",
                    report.stage.name(),
                    e,
                    e.recovery_suggestion()
                ),
                StageStatus::Skipped { .. } => tracing::warn!(
                    "⏭️ {:<18} {}",
                    report.stage.name(),
                    report.status.detail()
                ),
            }
        }
    }

    pub fn execution_summary(&self) -> HashMap<String, serde_json::Value> {
        let mut summary = HashMap::new();

        let count = |label: &str| {
            self.stages
                .iter()
                .filter(|r| r.status.label() == label)
                .count()
        };
        let total_duration: Duration = self.stages.iter().map(|r| r.duration).sum();

        summary.insert("succeeded".to_string(), serde_json::Value::Bool(self.succeeded()));
        summary.insert("total_stages".to_string(), self.stages.len().into());
        summary.insert("completed".to_string(), count("completed").into());
        summary.insert("recovered".to_string(), count("recovered").into());
        summary.insert("failed".to_string(), count("failed").into());
        summary.insert("skipped".to_string(), count("skipped").into());
        summary.insert(
            "total_duration_ms".to_string(),
            (total_duration.as_millis() as u64).into(),
        );

        let stages: Vec<serde_json::Value> = self
            .stages
            .iter()
            .map(|r| {
                serde_json::json!({
                    "stage": r.stage.name(),
                    "status": r.status.label(),
                    "detail": r.status.detail(),
                })
            })
            .collect();
        summary.insert("stages".to_string(), serde_json::Value::Array(stages));
        summary.insert(
            "artifacts".to_string(),
            serde_json::to_value(&self.artifacts).unwrap_or(serde_json::Value::Null),
        );

        summary
    }
}
