// Domain layer: provider-neutral models and the ports every cloud backend implements.

pub mod model;
pub mod ports;
