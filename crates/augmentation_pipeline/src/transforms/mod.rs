pub mod core;
pub mod frame;
pub mod vision;

pub use core::Transform;
pub use frame::Frame;
