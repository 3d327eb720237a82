//! HTTP bindings for the medgrid platform services.
//!
//! [`transport::ApiClient`] is the thin JSON transport every service client
//! shares: it attaches the bearer token and API version header and maps
//! failures into the classified [`RemoteError`](medgrid_core::RemoteError)
//! model. [`token::TokenSource`] runs the OAuth2 password grant against the
//! IAM token endpoint and swaps the shared token on refresh - this is the
//! side effect the retry executor triggers when a call comes back 403.
//!
//! One module per platform service carries the wire models and a trait for
//! the operations, so the provisioning layer can be exercised against mocks:
//!
//! - [`iam`] - identity applications under a proposition
//! - [`tdr`] - telemetry data repository contracts
//! - [`dicom`] - DICOM store notification configuration
//! - [`ai`] - inference job listing

pub mod ai;
pub mod dicom;
pub mod iam;
pub mod tdr;
pub mod token;
pub mod transport;

pub use ai::{AiInferenceClient, InferenceJob, InferenceJobs};
pub use dicom::{DicomClient, Notification, NotificationConfig};
pub use iam::{Application, Applications, ApplicationsQuery, IamClient};
pub use tdr::{Contract, Contracts, ContractsQuery, DataType, DeletePolicy, TdrClient};
pub use token::{Credentials, TokenResponse, TokenSource};
pub use transport::{ApiClient, TokenCell, token_cell};
