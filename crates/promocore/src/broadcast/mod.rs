//! Fan-out of one admin-authored message to every known user

pub mod dispatcher;

pub use dispatcher::{BroadcastDispatcher, BroadcastHandle, DeliveryProgress, DeliveryReport, LogProgress, ProgressSink};
