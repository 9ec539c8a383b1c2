use system::{RoomId, RoomSummary};
use tokio::sync::oneshot::Sender;

/// Read-only queries answered from inside the relay loop.
#[derive(Debug)]
pub enum AdminCommand {
    ListRooms {
        tx: Sender<Vec<RoomSummary>>,
    },
    DescribeRoom {
        room: RoomId,
        tx: Sender<RoomSummary>,
    },
}
