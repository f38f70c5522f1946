//! # Testing & Assertions
//!
//! Declarative expectations on HTTP responses. A [`Test`] queues assertions,
//! performs exactly one round trip when ended, then runs the queue in order
//! and reports the first failure as a single [`Error`].

mod assertion;
pub mod error;
mod evaluate;
pub mod expect;
pub mod factory;
mod inspect;

pub use assertion::AssertionOutcome;
pub use error::{AssertionError, BoxError, Error};
pub use expect::{BodyMatch, Expect, HeaderMatch};
pub use factory::Client;
pub use test::{State, Test};
