//! Shared vocabulary of the SHAMS allocation service: the closed kinds
//! that describe rooms, messes and requests, the value types that carry
//! range invariants, and the workflow configuration.

mod config;
mod kinds;
mod values;

pub use config::*;
pub use kinds::*;
pub use values::*;
