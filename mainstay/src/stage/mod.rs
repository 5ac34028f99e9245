//! Pipeline stages.
//!
//! Each stage wraps an inner [`Upstream`](mainstay_core::Upstream) and is
//! itself one, so stages compose as layers: auth outermost, then cache,
//! then retry around the transport. Terminal error normalization lives in
//! [`crate::normalize`] rather than as a layer - it is a pure projection
//! applied to whatever the outermost stage returns.

mod auth;
mod cache;
mod retry;

pub use auth::AuthStage;
pub use cache::CacheStage;
pub use retry::RetryStage;
