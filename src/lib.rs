pub mod core;
pub mod ws;

pub use crate::core::config::OkxConfig;
pub use crate::core::errors::OkxWsError;
pub use crate::core::types::{ChannelArgs, Operation};
pub use crate::ws::{OkxWsClient, SessionClass, StreamEvent};
