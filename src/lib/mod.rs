//! Driver library (see `SPEC_FULL.md` for the module map).

pub mod command;
pub mod control;
pub mod emulator;
pub mod error;
pub mod host;
pub mod network;
pub mod session;
pub mod settings;
pub mod spoke;
pub mod wire;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PACKAGE: &str = env!("CARGO_PKG_NAME");

pub use command::CommandSender;
pub use control::{ControlItem, ControlRegistry, ControlType, MiscInfo};
pub use error::{ControlError, RadarError};
pub use host::{RadarHost, RadarType};
pub use session::{RadarSession, RadarSessionHandle, SessionState};
pub use settings::Settings;
pub use spoke::{Spoke, SpokePipeline};
