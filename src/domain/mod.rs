// Domain layer: core models and ports (interfaces) shared by the ops tools and the service.

pub mod model;
pub mod ports;
