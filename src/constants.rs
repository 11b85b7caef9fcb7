//! Application constants

/// Maximum upload size for video payloads (200 MB)
pub const MAX_UPLOAD_SIZE: usize = 200 * 1024 * 1024;

/// How long a single storage transfer may take before it is treated as failed
pub const STORAGE_TRANSFER_TIMEOUT_SECS: u64 = 60;

/// Title used when the uploader leaves the field blank
pub const DEFAULT_TITLE: &str = "Untitled";

/// Description used when the uploader leaves the field blank
pub const DEFAULT_DESCRIPTION: &str = "No description";

/// Label shown for a video whose owner record is gone or incomplete
pub const UNKNOWN_CHANNEL: &str = "unknown";

/// Bearer token lifetime in days
pub const TOKEN_EXPIRY_DAYS: i64 = 30;
