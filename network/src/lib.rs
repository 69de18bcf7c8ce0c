//! Network crate - TCP transport, wire codec and peer plumbing for sync.

pub mod connection;
pub mod errors;
pub mod handler;
pub mod hub;
pub mod p2p;
pub mod protowire;

pub use errors::{NetworkError, NetworkResult};
pub use handler::MessageHandler;
pub use hub::Hub;
pub use p2p::Peer;
pub use protowire::Message;
