//! Room Ownership
//!
//! A browser tab holds one live room at a time, owned by the chat view that
//! is currently mounted. Each mount gets a [`MountId`]; only the newest
//! mount may claim the room, and a view only releases the room it owns.
//! Async work that resumes after its view is gone is refused instead of
//! evicting the view that replaced it.

/// Identifies one mounted chat view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountId(u64);

/// What the caller must send after a successful claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    /// Room to leave first, if another one was joined
    pub leave: Option<String>,
    pub join: String,
}

#[derive(Debug, Default)]
pub struct RoomSlot {
    latest: u64,
    owner: Option<(MountId, String)>,
}

impl RoomSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly mounted view; older mounts become stale
    pub fn mount(&mut self) -> MountId {
        self.latest += 1;
        MountId(self.latest)
    }

    /// Whether `mount` is still the newest view
    pub fn is_current(&self, mount: MountId) -> bool {
        mount.0 == self.latest
    }

    /// Take the room for `mount`; `None` when the mount is stale
    pub fn claim(&mut self, mount: MountId, room: &str) -> Option<Claim> {
        if !self.is_current(mount) {
            return None;
        }
        let leave = self
            .owner
            .take()
            .map(|(_, previous)| previous)
            .filter(|previous| previous != room);
        self.owner = Some((mount, room.to_string()));
        Some(Claim {
            leave,
            join: room.to_string(),
        })
    }

    /// Drop the room if `mount` owns it, returning the room to leave
    ///
    /// The mount also becomes stale so late async work cannot claim.
    pub fn release(&mut self, mount: MountId) -> Option<String> {
        if self.is_current(mount) {
            self.latest += 1;
        }
        match &self.owner {
            Some((owner, _)) if *owner == mount => self.owner.take().map(|(_, room)| room),
            _ => None,
        }
    }

    /// Room currently joined, if any
    pub fn room(&self) -> Option<&str> {
        self.owner.as_ref().map(|(_, room)| room.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_late_claim_from_unmounted_view_is_refused() {
        let mut slot = RoomSlot::new();

        let a = slot.mount();
        assert_eq!(slot.release(a), None);

        let b = slot.mount();
        assert_eq!(
            slot.claim(b, "room-b"),
            Some(Claim {
                leave: None,
                join: "room-b".to_string()
            })
        );

        // A's open call resolves after B is on screen
        assert_eq!(slot.claim(a, "room-a"), None);
        assert_eq!(slot.room(), Some("room-b"));
        assert!(slot.is_current(b));
        assert!(!slot.is_current(a));
    }

    #[test]
    fn test_release_only_drops_own_room() {
        let mut slot = RoomSlot::new();
        let a = slot.mount();
        slot.claim(a, "room-a");

        // The next view mounts before the old one is cleaned up
        let b = slot.mount();
        let claim = slot.claim(b, "room-b").unwrap();
        assert_eq!(claim.leave.as_deref(), Some("room-a"));

        assert_eq!(slot.release(a), None);
        assert_eq!(slot.room(), Some("room-b"));

        assert_eq!(slot.release(b).as_deref(), Some("room-b"));
        assert_eq!(slot.room(), None);
        assert!(slot.claim(b, "room-b").is_none());
    }

    #[test]
    fn test_reclaiming_same_room_does_not_leave_it() {
        let mut slot = RoomSlot::new();
        let a = slot.mount();
        slot.claim(a, "room-a");
        let again = slot.claim(a, "room-a").unwrap();
        assert_eq!(again.leave, None);
    }
}
