//! The "session expired" notice shown to the member.

/// Default text when a failure arrives without a message.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NoticeState {
    #[default]
    Hidden,
    Visible {
        message: String,
    },
}

impl NoticeState {
    pub fn is_visible(&self) -> bool {
        matches!(self, NoticeState::Visible { .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            NoticeState::Visible { message } => Some(message),
            NoticeState::Hidden => None,
        }
    }
}
