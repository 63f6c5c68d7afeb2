//! NM2 telemetry bridge
//!
//! Projects `mbdetnrs/1.0` JSON telemetry into a flat key-value store and
//! tracks active alarms.
//!
//! ```text
//!   (topic, payload)
//!        |
//!   TopicFilter --> PathWalker --> TopicDispatchTable --> handlers
//!                                                          |   |
//!                              DeviceRegistry / OutletRegistry  AlarmSnapshotBuilder
//!                                                               |
//!                                                        AlarmReconciler
//!                                                               |
//!                                                          StateStore
//! ```

pub mod alarm;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod keyspace;
pub mod registry;
pub mod replay;
pub mod scalar;

pub use config::{EngineConfig, Nm2Config};
pub use engine::{Engine, MessageReport};
pub use error::{ErrorCategory, Nm2Error, Result};
pub use keyspace::KeySpace;
