pub mod error;
pub mod handler;
pub mod lines;
pub mod server;
pub mod sink;
mod utils;
