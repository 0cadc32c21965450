//! Command implementations.

mod convert;
mod download;
mod record;

pub use convert::run_convert;
pub use download::run_download;
pub use record::{run_record, run_replay};
