use std::time::Duration;

/// Chunk position header, `"<current>:<total>"`.
pub const HEADER_CHUNK_RANGE: &str = "mex-chunk-range";

/// Sender mailbox id.
pub const HEADER_FROM: &str = "mex-from";

/// Recipient mailbox id.
pub const HEADER_TO: &str = "mex-to";

/// Workflow tag.
pub const HEADER_WORKFLOW_ID: &str = "mex-workflowid";

/// Logical filename tag.
pub const HEADER_FILENAME: &str = "mex-filename";

/// Client identification headers sent alongside authentication.
pub const HEADER_CLIENT_VERSION: &str = "mex-clientversion";
pub const HEADER_OS_NAME: &str = "mex-osname";
pub const HEADER_OS_ARCHITECTURE: &str = "mex-osarchitecture";

/// Marker value for gzip-compressed chunk bodies.
pub const CONTENT_ENCODING_GZIP: &str = "gzip";

/// Content type of an uploaded chunk body.
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

/// Authentication scheme used in the `authorization` header.
pub const AUTH_SCHEMA_NAME: &str = "NHSMESH";

/// Complete response.
pub const STATUS_OK: u16 = 200;

/// A chunk upload was accepted.
pub const STATUS_ACCEPTED: u16 = 202;

/// One part of a chunked message.
pub const STATUS_PARTIAL_CONTENT: u16 = 206;

/// Budget for every individual HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
