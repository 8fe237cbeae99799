//! Common test utilities
//!
//! This module is shared across all integration tests

pub mod fixtures;
pub mod mock_gateway;

#[allow(unused_imports)]
pub use fixtures::{test_settings, RecordingProgress, ScriptedCodes, TestApp, ADMIN};
#[allow(unused_imports)]
pub use mock_gateway::{MockGateway, SentMessage};
