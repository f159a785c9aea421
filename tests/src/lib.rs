//! Integration test framework for hlrcore
#![allow(missing_docs)]
//!
//! This crate provides test utilities and mock components for integration
//! testing of the subscriber store and the GSUP client.
//!
//! # Components
//!
//! - [`mock_peer`] - Scriptable GSUP peer behind an in-memory transport
//! - [`test_fixtures`] - Sample subscribers, temporary databases and client configs
//! - [`test_utils`] - Utility functions for test setup and waiting
//!
//! # Test Categories
//!
//! 1. **Subscriber store tests** - Provisioning, lookups and cascade delete on a file database
//! 2. **GSUP session tests** - Reconnect, keepalive and message delivery against the mock peer

pub mod mock_peer;
pub mod test_fixtures;
pub mod test_utils;

pub use mock_peer::{MockPeer, MockPeerEvent, ScriptedHandshake};
pub use test_fixtures::{test_client_config, TestDb, TestSubscriber};
pub use test_utils::{
    init_test_logging, wait_for_condition, wait_for_state, TestResult, DEFAULT_POLL_INTERVAL,
    DEFAULT_TEST_TIMEOUT,
};
