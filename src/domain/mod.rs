// Domain layer: records, run bookkeeping and the ports the runner drives.

pub mod model;
pub mod ports;
