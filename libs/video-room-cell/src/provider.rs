use async_trait::async_trait;

use crate::models::{RoomProviderError, RoomRole};

/// Narrow contract the appointment lifecycle consumes from the video-room
/// provider. Implementations must keep `disable_room` idempotent: disabling
/// an already-disabled room is not an error.
#[async_trait]
pub trait RoomProvider: Send + Sync {
    /// Create a room and return the provider-issued room id.
    async fn create_room(&self, name: &str, description: &str)
        -> Result<String, RoomProviderError>;

    /// Mint a join URL scoped to the given role.
    async fn issue_join_link(
        &self,
        room_id: &str,
        role: RoomRole,
    ) -> Result<String, RoomProviderError>;

    /// Disable the room. Returns the room's `enabled` flag after the call
    /// (false once disabled). Fails only on transport/API errors.
    async fn disable_room(&self, room_id: &str) -> Result<bool, RoomProviderError>;
}
