//! Common types and utilities for hlrcore
//!
//! This crate provides the numbering-plan constants, shared subscriber and
//! credential types, input validation, logging bootstrap and configuration
//! structures used by the store and GSUP client crates.

pub mod config;
pub mod constants;
pub mod logging;
pub mod types;
pub mod validation;

pub use config::{
    load_config, load_config_from_str, validate_config, ConfigError, ConfigValidationError,
    DbConfig, GsupClientConfig, HlrConfig,
};
pub use logging::{
    init_logging, init_logging_with_filter, log_gsup_message,
    log_ipa_message, Direction, HexDump, LogLevel,
};
pub use types::*;
pub use validation::{
    algorithm_is_compatible, is_valid_hex, is_valid_imsi, is_valid_msisdn, validate_address,
    validate_vector, ValidationError,
};
