//! contains utils used in parsing parameters and tracking genome files

pub mod files;
pub mod parameters;

pub use files::*;
pub use parameters::*;
