//! CLI command implementations.

pub mod init;
pub mod list;
pub mod status;
pub mod sync;
