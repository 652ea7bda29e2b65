// Domain layer: serial models and the ports the engine talks through.
// Storage and notification backends live in adapters.

pub mod model;
pub mod ports;
