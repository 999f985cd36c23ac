// Domain layer: training data, run bookkeeping types and the ports the adapters implement.

pub mod model;
pub mod ports;
