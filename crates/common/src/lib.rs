pub mod errors;
pub mod structured_logging;

pub use errors::{SuccessionError, SuccessionResult};
pub use structured_logging::{
    init_structured_logging, JsonLogLayer, LogRecord, LoggingConfig, OperationTimer,
    ProcessContext,
};
