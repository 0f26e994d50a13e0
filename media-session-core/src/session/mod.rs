pub mod acquirer;
pub mod call;
pub mod capture_handle;
pub mod level_meter;
pub mod preview;
pub mod registry;
pub mod settings;
mod slot;
