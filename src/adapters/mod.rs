// Adapters layer: concrete implementations of the cloud ports.

pub mod aws;
pub mod memory;

pub use aws::AwsProvider;
pub use memory::InMemoryCloud;
