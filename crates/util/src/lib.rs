//! Helpers shared by the OpenCtx client and its hosts.

pub mod keystore;
pub mod path_processing;
pub mod redaction;

pub use keystore::interpolation::{InterpolationError, SecretsBackend, interpolate_string, resolve_secret, secrets_backend};
pub use path_processing::{config_path, expand_tilde};
pub use redaction::{is_sensitive_header, redact_json, redact_sensitive, redact_sensitive_with};
