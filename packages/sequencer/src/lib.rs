// Sequencer - gapless sequence number allocation
//
// Hands out fixed-width numbers for electronic document authorization.
// Numbers that were never consumed downstream can be reclaimed and reissued;
// consumed numbers are never issued again.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
