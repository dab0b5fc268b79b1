pub mod models;
pub mod provider;
pub mod services;

pub use models::{RoomProviderError, RoomRole};
pub use provider::RoomProvider;
pub use services::hms::HmsRoomClient;
