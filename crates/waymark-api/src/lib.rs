// waymark-api: Async client for the realtime location feed and device lookup

pub mod error;
pub mod lookup;
pub mod socket;
pub mod wire;

pub use error::Error;
pub use lookup::LookupClient;
pub use socket::{ChannelState, ReconnectConfig, SocketHandle};
pub use wire::{FeedEvent, FeedPayload, FeedRequest, GeoSample};
