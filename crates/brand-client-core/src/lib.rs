//! Client core for the brand configuration service.
//!
//! [`SessionManager`] owns sign-in state and its persisted copy,
//! [`BrandSynchronizer`] keeps the active brand in step with the backend, and
//! [`AccessGate`] decides what a screen may show for the current session.

pub mod account;
pub mod api;
pub mod brand;
pub mod config;
pub mod config_path;
pub mod error;
pub mod gate;
pub mod session;
pub mod storage;

pub use api::{ApiClient, ApiClientConfig, Envelope, Page, PaginatedEnvelope, Pagination};
pub use brand::{Brand, BrandPatch, BrandSynchronizer, ConfigEdit};
pub use config::{ClientConfig, ConfigError, ResolvedBaseUrl};
pub use error::{ClientError, StoreError, ValidationError};
pub use gate::{AccessGate, GateDecision, GateState, Navigator, Visibility};
pub use session::{Session, SessionManager, SessionSource, StartupVerification, UserRef};
pub use storage::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
