#![forbid(unsafe_code)]

mod cache;
mod job;
mod queue;
mod worker;

pub mod decode;
pub mod gpu;
pub mod handle;
pub mod logging;
pub mod streamer;
