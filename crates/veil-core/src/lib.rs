pub mod category;
pub mod config;
pub mod dispatch;
pub mod extract;
pub mod feed;
pub mod hash;
pub mod locate;
pub mod pipeline;
pub mod resolve;
pub mod session;
pub mod types;

pub use types::*;
