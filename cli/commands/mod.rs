mod cache_path;
mod download;

pub use cache_path::*;
pub use download::*;

pub(crate) use crate::flags::Flags;
