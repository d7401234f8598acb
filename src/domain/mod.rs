// Domain layer: models and ports (interfaces) of the cascading selector.

pub mod model;
pub mod ports;
