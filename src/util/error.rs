use std::path::PathBuf;

/// problems with the config file of a watcher
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file '{}' not found", .0.display())]
    NotFound(PathBuf),

    #[error("config file '{}' could not be read", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file '{}' could not be parsed: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config file '{}' must contain a json object", .0.display())]
    NotAnObject(PathBuf),

    #[error("config node {0} is required")]
    MissingKey(String),

    #[error("config node {key} must be {expected}")]
    InvalidValue { key: String, expected: String },
}

/// everything that ends a watcher run.
/// none of these are retried, the run is over once one is returned.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// a configured value is outside of its allowed range
    #[error("{0}")]
    Validation(String),

    /// the sunset api could not be reached or answered with something unusable
    #[error("sunset service: {0}")]
    ExternalService(String),

    /// the bridge could not be reached
    #[error("could not connect to bridge: {0}")]
    Connection(String),

    /// the bridge answered with an error
    #[error("bridge error: {0}")]
    Remote(String),

    #[error("light group {0} not found on bridge")]
    GroupNotFound(String),
}

pub type Result<T, E = WatchError> = std::result::Result<T, E>;

/// failure of a single http request, see `api_request::send`
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("http client could not be created: {0}")]
    Client(#[source] reqwest::Error),

    #[error("sending request failed: {0}")]
    Send(#[source] reqwest::Error),

    #[error("request failed with status {0}")]
    Status(reqwest::StatusCode),

    #[error("parsing request response json failed: {0}")]
    Json(#[source] reqwest::Error),
}

impl RequestError {
    /// errors of the bridge client: unreachable is a connection error, the rest is remote
    pub fn into_bridge_error(self) -> WatchError {
        match self {
            Self::Client(_) | Self::Send(_) => WatchError::Connection(self.to_string()),
            other => WatchError::Remote(other.to_string()),
        }
    }
}

impl From<RequestError> for WatchError {
    /// the sunset api is the only other http peer
    fn from(err: RequestError) -> Self {
        Self::ExternalService(err.to_string())
    }
}
