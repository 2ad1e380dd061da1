pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod inventory;
pub mod models;
pub mod server;
pub mod store;
pub mod transport;

pub use backend::NvrBackend;
pub use config::ServerConfig;
pub use error::{Error, Result};
pub use models::{CameraRecord, RecordingMode, TriggerType};
pub use server::SecuritySpyServer;
