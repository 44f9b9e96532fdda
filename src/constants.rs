//! Application constants
//!
//! Centralized location for magic strings and configuration defaults.

use std::time::Duration;

/// Application name, also reported to agent-protocol clients
pub const APP_NAME: &str = "http-tanker";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Directory created under the home directory when `--db` is not given
pub const DEFAULT_DB_DIR_NAME: &str = "tanker";

/// Request table file inside the database directory
pub const DATABASE_FILE: &str = "tanker-data.json";

/// Log file inside the database directory
pub const LOG_FILE: &str = "tanker.log";

/// Timeout applied to every HTTP call unless configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Header used by API key auth when none is given
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// Spinner animation shown while a request is in flight
pub const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
pub const SPINNER_TICK: Duration = Duration::from_millis(80);

/// Width of the boxes drawn around titles and details
pub const BOX_WIDTH: usize = 50;

/// Prefix of temporary files holding binary response bodies
pub const BINARY_TEMP_PREFIX: &str = "http-tanker-body-";

// Menu labels
pub const LABEL_BROWSE: &str = "Browse requests";
pub const LABEL_CREATE: &str = "Create request";
pub const LABEL_IMPORT_CURL: &str = "Import cURL";
pub const LABEL_ABOUT: &str = "About";
pub const LABEL_EXIT: &str = "Exit";
pub const LABEL_BACK_HOME: &str = "Back to Home Menu";
pub const LABEL_BACK_REQUESTS: &str = "Back to requests";
pub const LABEL_RUN: &str = "Run";
pub const LABEL_CURL: &str = "cURL";
pub const LABEL_EDIT: &str = "Edit";
pub const LABEL_DELETE: &str = "Delete";

/// Agent protocol revision offered when the client does not name one
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
