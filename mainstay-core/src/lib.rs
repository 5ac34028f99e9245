#![warn(missing_docs)]
//! Core types and collaborator traits for the mainstay middleware chain.
//!
//! This crate defines the vocabulary shared by every stage of the pipeline:
//!
//! - [`Request`] / [`Response`] - the exchange types flowing through stages,
//!   including the per-attempt metadata bag and the response [`Origin`] flag
//! - [`CacheKey`] / [`CacheEntry`] - keyed cache storage types with
//!   freshness/staleness windows
//! - [`ErrorKind`] / [`ErrorRecord`] - the closed error taxonomy every
//!   terminal failure is normalized into
//! - Collaborator traits: [`Upstream`] (the transport seam), [`TokenStore`],
//!   [`ConnectivityProbe`], [`CacheStore`], and [`Offload`]
//!
//! The pipeline engine itself lives in the `mainstay` crate; an in-memory
//! [`CacheStore`] implementation lives in `mainstay-memory`.

mod connectivity;
mod entry;
mod error;
mod key;
mod offload;
mod request;
mod response;
mod store;
mod token;
mod upstream;

pub use connectivity::{AlwaysConnected, ConnectivityProbe};
pub use entry::{CacheEntry, Freshness};
pub use error::{ErrorKind, ErrorRecord, TransportError};
pub use key::{CacheKey, KeyPart, KeyParts};
pub use offload::{DisabledOffload, Offload};
pub use request::{AttemptMeta, Request};
pub use response::{Origin, Response};
pub use store::{CacheStore, DeleteStatus, StoreError};
pub use token::{TokenError, TokenPair, TokenStore};
pub use upstream::Upstream;
