//! Core building blocks for the medgrid platform SDK.
//!
//! Every remote operation in the SDK goes through the same three pieces
//! defined here:
//!
//! - [`error`] - the error model for remote calls and the total
//!   status-to-classification function shared by every service.
//! - [`retry`] - the bounded exponential-backoff executor that drives a
//!   single remote call, including the refresh-on-expired-credential hook.
//! - [`reconcile`] - the conflict reconciler that turns a creation conflict
//!   into an idempotent "adopt the existing resource if it matches, else
//!   fail" decision.
//!
//! The [`spec`] module carries the caller-facing data model: the field map a
//! caller supplies to describe a desired resource, and the resolved identity
//! plus attributes handed back after create or read.

pub mod error;
pub mod reconcile;
pub mod retry;
pub mod spec;

pub use error::{ErrorClass, RemoteError, classify};
pub use reconcile::{FieldMismatch, ReconcileOutcome, reconcile};
pub use retry::{RetryPolicy, TokenRefresh, execute};
pub use spec::{FieldValue, ResolvedResource, ResourceSpec, SpecError};
