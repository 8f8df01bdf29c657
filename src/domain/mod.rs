// Domain layer - Telemetry types with no I/O
pub mod buffer;
pub mod synthetic;
pub mod telemetry;
