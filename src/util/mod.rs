pub mod env;
pub mod telemetry;
pub mod vk;
pub mod youtube;
