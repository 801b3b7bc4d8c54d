//! Resilient client for the remote media-processing API.
//!
//! Remote media analysis is slow, asynchronous, and unreliable: a large
//! binary upload, an opaque multi-minute server-side processing phase, a
//! generation call that may be rate-limited, and a loosely-specified text
//! response. This crate makes that pipeline behave like a dependable local
//! operation:
//!
//! - [`backoff`] / [`retry`] — bounded, jittered retries for calls that hit
//!   rate limits or transient unavailability
//! - [`remote`] — the upload / status / generate / delete surface and its
//!   HTTP implementation
//! - [`job`] — the asset lifecycle tracker: upload, poll to a terminal
//!   state with adaptive ETA, guaranteed remote cleanup
//! - [`extract`] — best-effort structured-data recovery from model text

pub mod backoff;
pub mod error;
pub mod extract;
pub mod job;
pub mod remote;
pub mod retry;

pub use backoff::{next_delay, parse_retry_hint, BackoffConfig, JitterSource, SystemJitter};
pub use error::{ClientError, ClientResult};
pub use extract::{extract_json, extract_records};
pub use job::{run_job, AssetSource, JobConfig, TrackedAsset, VideoJob};
pub use remote::{FileState, GenerateOptions, MediaApiClient, MediaApiConfig, RemoteFile, RemoteMedia};
pub use retry::{invoke, with_retry, RetryClass};
