//! Client side of shelfsync.
//!
//! This crate provides the network fetcher, request routing and freshness
//! strategies, the offline mutation queue, and the worker lifecycle that ties
//! them to a host runtime.

pub mod fetch;
pub mod strategy;
pub mod sync;
pub mod worker;

#[cfg(test)]
mod testing;

pub use fetch::{FetchClient, FetchConfig, Fetcher};
pub use strategy::{FetchOutcome, ResponseSource, Route, Router, StrategyEngine};
pub use sync::{DrainReport, MutationQueue};
pub use worker::{
    ActivateReport, Event, EventOutcome, Host, InstallReport, LifecycleState, Notification, NotificationAction, Worker,
};
