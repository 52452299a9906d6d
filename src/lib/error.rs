use thiserror::Error;

use crate::control::ControlType;

/// Errors raised by the control registry and the command surface built on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    #[error("control '{0}' has no value set")]
    NotSet(ControlType),
    #[error("no such control '{0}'")]
    InvalidControl(String),
    #[error("value {1} is out of range for control '{0}'")]
    OutOfRange(ControlType, i32),
}

/// Top-level driver error. Nothing above the worker task in §5 treats this as fatal;
/// it is logged and the session resets, per §7.
#[derive(Error, Debug)]
pub enum RadarError {
    #[error("I/O error")]
    Io(#[from] std::io::Error),
    #[error("interface '{0}' is not available")]
    InterfaceNotFound(String),
    #[error("cannot enumerate network interfaces")]
    InterfaceEnumerationFailed,
    #[error("timed out waiting for radar")]
    Timeout,
    #[error("shutdown requested")]
    Shutdown,
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error("malformed packet: {0}")]
    Decode(String),
}
