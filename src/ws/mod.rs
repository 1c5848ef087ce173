pub mod client;
pub mod data;
pub mod events;
pub mod private;
pub mod public;
pub mod requests;
pub mod session;
pub mod signer;
pub mod trade;

// Re-export main components
pub use client::{AuthState, OkxWsClient};
pub use events::{
    ChannelArg, Envelope, ErrorEvent, LoginAck, StreamEvent, SubscribeAck, SuccessAck,
    TopicEvent, UnsubscribeAck,
};
pub use session::SessionClass;
pub use signer::WsSigner;
