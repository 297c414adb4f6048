pub mod bucket;
pub mod cdn;
pub mod certificate;
pub mod dns;
pub mod https;
pub mod pipeline;
pub mod readiness;
pub mod report;

pub use crate::domain::model::WaitPolicy;
pub use crate::domain::ports::CloudProvider;
pub use crate::utils::error::Result;
