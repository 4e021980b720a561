// fah-common - Value types for the Folding@home remote-control protocol
//
// This crate holds the typed records decoded from daemon replies. It does no I/O.

pub mod duration;
pub mod error;
pub mod info;
pub mod options;
pub mod records;
pub mod time;

// Re-export for convenience
pub use duration::*;
pub use error::*;
pub use info::*;
pub use options::*;
pub use records::*;
pub use time::*;
