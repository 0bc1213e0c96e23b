/// Identity used for quota accounting when the client address header is missing
pub const UNKNOWN_CLIENT_IDENTITY: &str = "unknown";

/// Header carrying the original client address when running behind a proxy
pub const DEFAULT_CLIENT_IP_HEADER: &str = "x-forwarded-for";

// =============================================================================
// UPLOAD CONSTANTS
// =============================================================================

/// Multipart field name carrying the document
pub const UPLOAD_FIELD_NAME: &str = "file";

/// Extra body allowance on top of the upload limit for multipart framing
pub const MULTIPART_OVERHEAD: usize = 1024 * 1024;
