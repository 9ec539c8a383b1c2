use std::collections::{BTreeSet, HashMap};
use system::{RoomId, SessionId};

/// Room membership in both directions. Every method updates the two maps
/// together, so `rooms_of` and `members` always agree.
pub struct RoomRegistry {
    rooms: HashMap<RoomId, BTreeSet<SessionId>>,
    memberships: HashMap<SessionId, BTreeSet<RoomId>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
            memberships: HashMap::new(),
        }
    }

    pub fn join(&mut self, session_id: SessionId, room_id: &RoomId) -> usize {
        let members = self.rooms.entry(room_id.clone()).or_default();
        members.insert(session_id);
        let count = members.len();
        self.memberships
            .entry(session_id)
            .or_default()
            .insert(room_id.clone());
        log::info!("Session {} joined room {} ({})", session_id, room_id, count);
        count
    }

    pub fn leave(&mut self, session_id: &SessionId, room_id: &RoomId) -> usize {
        if let Some(rooms) = self.memberships.get_mut(session_id) {
            rooms.remove(room_id);
            if rooms.is_empty() {
                self.memberships.remove(session_id);
            }
        }

        let count = match self.rooms.get_mut(room_id) {
            Some(members) => {
                members.remove(session_id);
                members.len()
            }
            None => return 0,
        };
        if count == 0 {
            self.rooms.remove(room_id);
        }
        count
    }

    /// Removes the session from all of its rooms, returning each room with
    /// the member count left behind.
    pub fn leave_all(&mut self, session_id: &SessionId) -> Vec<(RoomId, usize)> {
        self.rooms_of(session_id)
            .into_iter()
            .map(|room_id| {
                let count = self.leave(session_id, &room_id);
                (room_id, count)
            })
            .collect()
    }

    pub fn rooms_of(&self, session_id: &SessionId) -> BTreeSet<RoomId> {
        self.memberships
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn member_count(&self, room_id: &RoomId) -> usize {
        self.rooms.get(room_id).map_or(0, |members| members.len())
    }

    pub fn members(&self, room_id: &RoomId) -> impl Iterator<Item = &SessionId> + '_ {
        self.rooms.get(room_id).into_iter().flatten()
    }

    pub fn rooms(&self) -> impl Iterator<Item = &RoomId> + '_ {
        self.rooms.keys()
    }
}
