//! Value objects describing the epidemic: who lives in the served region,
//! how the infection is seeded, which containment applies and in which stage
//! everyone currently is.
mod compartments;
mod containment;
mod demographics;
mod healthcare;
mod seed;

pub use compartments::*;
pub use containment::*;
pub use demographics::*;
pub use healthcare::*;
pub use seed::*;
