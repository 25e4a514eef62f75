//! External inputs: detected candidates and GPS

pub mod candidates;
pub mod location;

pub use candidates::{CandidateSource, DetectorFile};
pub use location::{GpsdProvider, LocationProvider, NoLocation};
