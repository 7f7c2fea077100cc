pub mod common;
pub mod notes;
pub mod remote;
pub mod sync;
