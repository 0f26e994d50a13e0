pub mod capture_platform;
pub mod session_delegate;
pub mod surface;
