use std::fmt;

/// The principal a batch is submitted on behalf of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    /// Unauthenticated submission, stored with the sentinel id 0
    Guest,
    /// Registered user
    User(i64),
}

impl Owner {
    const GUEST_ID: i64 = 0;

    /// Database representation of this owner
    pub fn user_id(&self) -> i64 {
        match self {
            Self::Guest => Self::GUEST_ID,
            Self::User(id) => *id,
        }
    }

    /// Maps a stored `user_id` back to an owner
    pub fn from_user_id(id: i64) -> Self {
        if id == Self::GUEST_ID {
            Self::Guest
        } else {
            Self::User(id)
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest)
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guest => write!(f, "guest"),
            Self::User(id) => write!(f, "user:{}", id),
        }
    }
}
