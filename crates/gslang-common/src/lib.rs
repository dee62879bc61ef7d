// gslang-common -- shared types used across the gslang compiler crates.

pub mod diagnostics;
pub mod position;
pub mod token;
