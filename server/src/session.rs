use system::SessionId;

pub struct Session {
    pub id: SessionId,
    /// Set by the latest valid `join`; `None` until then.
    pub username: Option<String>,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self { id, username: None }
    }
}
