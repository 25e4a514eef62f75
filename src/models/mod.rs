//! Data models

pub mod identity;
pub mod location;
pub mod transition;
pub mod control;

pub use identity::*;
pub use location::*;
pub use transition::*;
pub use control::*;
