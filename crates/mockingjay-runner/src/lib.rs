//! mockingjay-runner: everything that talks HTTP
//!
//! - [`compat`]: replays an endpoint set against a real service
//! - [`fake`]: serves an endpoint set as a fake service
//! - [`monkey`]: fault-injection layer for any tower service

pub mod compat;
pub mod draw;
pub mod fake;
pub mod monkey;

pub use compat::{CheckerError, CompatibilityChecker};
pub use draw::{DrawSource, FixedDraws, SeededDraws, ThreadRngDraws};
pub use monkey::{MonkeyLayer, MonkeyService, monkey_around};
