use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error {status}: {reason}")]
    Http { status: u16, reason: String },

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Inventory parse error: {0}")]
    Parse(String),

    #[error("Event stream closed by server")]
    ListenerStreamClosed,

    #[error("Event stream idle for {0:?}")]
    ListenerIdle(std::time::Duration),

    #[error("Invalid recording mode: {0}")]
    InvalidModeArgument(String),

    #[error("Unknown camera: {0}")]
    UnknownCamera(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Status and reason of a non-success HTTP response, if this is one.
    pub fn http_status(&self) -> Option<(u16, &str)> {
        match self {
            Error::Http { status, reason } => Some((*status, reason.as_str())),
            _ => None,
        }
    }
}

impl From<roxmltree::Error> for Error {
    fn from(e: roxmltree::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
