pub const OK_RESPONSE: &str = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n";
pub const NO_CONTENT: &str = "HTTP/1.1 204 No Content\r\n\r\n";
pub const BAD_REQUEST: &str = "HTTP/1.1 400 Bad Request\r\n\r\n";
pub const UNAUTHORIZED: &str = "HTTP/1.1 401 Unauthorized\r\n\r\n";
pub const NOT_FOUND: &str = "HTTP/1.1 404 NOT FOUND\r\n\r\n";
pub const CONFLICT: &str = "HTTP/1.1 409 Conflict\r\nContent-Type: application/json\r\n\r\n";
pub const INTERNAL_ERROR: &str = "HTTP/1.1 500 INTERNAL ERROR\r\n\r\n";

/// Session storage key holding the active account id.
pub const ACTIVE_ACCOUNT_KEY: &str = "activeAccountId";

pub const SESSION_HEADER: &str = "x-session-id";
/// Client-held session record, honored only when enabled in config.
pub const SESSION_RECORD_HEADER: &str = "x-session-record";

pub const LOAD_ACCOUNTS_FAILED: &str = "Unable to load accounts, try again.";
pub const NO_ACCOUNTS: &str = "You have no trading accounts yet.";
pub const LOADING: &str = "Loading accounts...";
