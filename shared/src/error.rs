use thiserror::Error;

/// Errors raised at the edges of the client core. Component boundaries turn
/// these into safe defaults or a notice for the user; none of them are fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("could not decode message: {0}")]
    Decode(String),
    #[error("{0}")]
    Denied(String),
    #[error("the cat is already resting with {holder}")]
    RestLocked { holder: String },
    #[error("please wait {remaining_secs} seconds before spinning again")]
    CooldownActive { remaining_secs: f64 },
    #[error("you must be logged in to do that")]
    NotLoggedIn,
    #[error("the wheel is already spinning")]
    AlreadySpinning,
    #[error("storage error: {0}")]
    Storage(String),
}

impl ClientError {
    /// Rejections the wheel swallows without telling the user.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::AlreadySpinning | Self::CooldownActive { .. })
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}
