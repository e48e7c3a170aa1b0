//! Shared data model and JSON wire codec for `tasklist`.

pub mod codec;
pub mod task;
