//! Error types for the NM2 bridge
//!
//! Every failure is scoped to the operation that raised it. The dispatcher
//! logs and moves on; nothing here is fatal to the process.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Nm2Error>;

/// Coarse classification used for logging and for the per-message report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Payload could not be parsed or a value could not be interpreted
    MalformedInput,
    /// A handler was called with arguments that break its contract
    ContractViolation,
    /// A group or snapshot larger than the configured limit
    ResourceExhaustion,
    /// Device, sensor or outlet could not be resolved; tolerated
    NotFound,
    /// Store or configuration failure
    Internal,
}

#[derive(Error, Debug)]
pub enum Nm2Error {
    // ========== Malformed input ==========
    #[error("Malformed payload on {topic}: {message}")]
    MalformedPayload { topic: String, message: String },

    #[error("Invalid value {value:?}: {reason}")]
    InvalidValue { value: String, reason: String },

    // ========== Contract violations ==========
    #[error("Invalid parameter count: expected {expected}, got {got}")]
    InvalidParams { expected: usize, got: usize },

    #[error("Index {index} out of bounds (len {len})")]
    OutOfBounds { index: usize, len: usize },

    #[error("Empty key")]
    EmptyKey,

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Sensor slot {index} already keyed as {existing}")]
    SlotAlreadyKeyed { index: usize, existing: String },

    #[error("Unknown sensor type: {0}")]
    UnknownSensorKind(String),

    #[error("Output template {template} cannot render {target}")]
    TemplateMismatch {
        template: String,
        target: &'static str,
    },

    #[error("Rule for {0} has no output template")]
    MissingTemplate(String),

    // ========== Resource exhaustion ==========
    #[error("Capacity exceeded: requested {requested}, limit {limit}")]
    CapacityExceeded { requested: usize, limit: usize },

    // ========== Not found ==========
    #[error("Device registry is empty")]
    EmptyRegistry,

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Sensor not found: {0}")]
    SensorNotFound(String),

    #[error("Outlet not found: {0}")]
    OutletNotFound(String),

    // ========== Internal ==========
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Store error: {0}")]
    Store(#[from] nm2_store::StoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Nm2Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Nm2Error::MalformedPayload { .. } | Nm2Error::InvalidValue { .. } => {
                ErrorCategory::MalformedInput
            },
            Nm2Error::InvalidParams { .. }
            | Nm2Error::OutOfBounds { .. }
            | Nm2Error::EmptyKey
            | Nm2Error::DuplicateKey(_)
            | Nm2Error::SlotAlreadyKeyed { .. }
            | Nm2Error::UnknownSensorKind(_)
            | Nm2Error::TemplateMismatch { .. }
            | Nm2Error::MissingTemplate(_) => ErrorCategory::ContractViolation,
            Nm2Error::CapacityExceeded { .. } => ErrorCategory::ResourceExhaustion,
            Nm2Error::EmptyRegistry
            | Nm2Error::DeviceNotFound(_)
            | Nm2Error::SensorNotFound(_)
            | Nm2Error::OutletNotFound(_) => ErrorCategory::NotFound,
            Nm2Error::Pattern(_) | Nm2Error::Store(_) | Nm2Error::Config(_) => {
                ErrorCategory::Internal
            },
        }
    }

    /// Not-found errors are expected while announcements are still arriving
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    pub fn invalid_value(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Nm2Error::InvalidValue {
            value: value.into(),
            reason: reason.into(),
        }
    }
}
