use thiserror::Error;

/// Outcome taxonomy for every public link operation.
///
/// `Empty` is a normal end-of-iteration / vacant-slot outcome, not a fault:
/// callers iterating calendar slots should stop on it rather than report it.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The device family or record kind does not support this operation.
    #[error("operation not supported by this device or record kind")]
    NotSupported,

    /// The requested storage location is outside the device's slot range.
    #[error("invalid storage location")]
    InvalidLocation,

    /// No reply arrived before the configured deadline (or the engine was
    /// shut down mid-wait, which resolves the same way).
    #[error("timed out waiting for device reply")]
    Timeout,

    /// Valid "nothing there" outcome: vacant slot or end of a location scan.
    #[error("no entry at this location")]
    Empty,

    /// Remote-reported protocol failure, code propagated from the device.
    #[error("device reported +CMS ERROR: {0}")]
    Cms(u16),

    /// The reply could not be classified at all.
    #[error("unrecognized device response")]
    UnrecognizedResponse,

    /// Wrapper around transport IO errors.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed hex payload in a reply data line.
    #[error("hex payload error: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Anything else: format mismatches, codec failures, refused sends.
    #[error("{0}")]
    Failure(String),
}

impl LinkError {
    /// Shorthand for the generic-failure variant.
    pub fn failure(msg: impl Into<String>) -> Self {
        LinkError::Failure(msg.into())
    }
}
