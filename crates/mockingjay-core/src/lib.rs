//! mockingjay-core: contract model, behavior tables and report types
//!
//! This crate holds everything that is pure data or pure logic: the endpoint
//! expectation set and its loader, the weighted behavior table and its
//! selector, and the results a compatibility run produces. No network I/O.

pub mod behavior;
pub mod config;
pub mod endpoint;
pub mod report;
pub mod schema;

pub use behavior::{Behavior, BehaviorError, BehaviorRecord, BehaviorTable, Effect, select};
pub use config::{Config, ConfigError};
pub use endpoint::{Endpoint, RequestSpec, ResponseSpec, load_endpoints, parse_endpoints};
pub use report::{
    CheckOutcome, CheckResult, CompatibilityReport, Observation, Verdict, VerdictStatus,
};
