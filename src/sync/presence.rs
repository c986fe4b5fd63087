/// Client-side view of who is in the room right now.
///
/// The server broadcasts the full roster on every change, so this never
/// accumulates state; each presence event replaces the previous roster
/// wholesale.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    users: Vec<String>,
}

/// How many avatars the room header shows before collapsing to "+N".
const DISPLAY_LIMIT: usize = 5;

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, users: Vec<String>) {
        self.users = users;
    }

    pub fn clear(&mut self) {
        self.users.clear();
    }

    pub fn roster(&self) -> &[String] {
        &self.users
    }

    pub fn count(&self) -> usize {
        self.users.len()
    }

    pub fn contains(&self, username: &str) -> bool {
        self.users.iter().any(|u| u == username)
    }

    /// The names to show plus how many were folded into the overflow
    /// badge.
    pub fn display(&self) -> (&[String], usize) {
        if self.users.len() <= DISPLAY_LIMIT {
            (&self.users, 0)
        } else {
            (&self.users[..DISPLAY_LIMIT], self.users.len() - DISPLAY_LIMIT)
        }
    }
}
