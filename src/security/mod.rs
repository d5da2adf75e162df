//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client sliding window, strict tier for login)
//!     → [handler]
//!     → headers.rs (hardening headers + correlation id on every response)
//! ```
//!
//! # Design Decisions
//! - Limiter state is owned by the server, not a global
//! - Headers are applied after every other rewrite
//! - clock.rs isolates time so window expiry is testable

pub mod clock;
pub mod headers;
pub mod rate_limit;

pub use clock::{Clock, MockClock, SystemClock};
pub use headers::apply_security_headers;
pub use rate_limit::{Decision, RateLimiter, SlidingWindowLimiter, Tier};
