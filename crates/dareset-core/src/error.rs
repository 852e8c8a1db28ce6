use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResetError {
    #[error("no config found at {0}: run 'da-reset config init'")]
    ConfigNotFound(String),

    #[error("invalid {kind} '{value}': {rule}")]
    InvalidIdentifier {
        kind: &'static str,
        value: String,
        rule: &'static str,
    },

    #[error("table list is empty: nothing to drop")]
    EmptyTableList,

    #[error("table listed more than once: {0}")]
    DuplicateTable(String),

    #[error("database.container and application.container are both '{0}'")]
    SameContainer(String),

    #[error("{0} is empty")]
    EmptyField(&'static str),

    #[error("no container runtime found: install docker or podman, or set 'runtime' in config")]
    NoContainerRuntime,

    #[error("failed to start '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("container '{container}' is unreachable: {detail}")]
    ContainerUnreachable { container: String, detail: String },

    #[error("database rejected credentials for user '{user}': {detail}")]
    AuthenticationFailed { user: String, detail: String },

    #[error("database service in '{container}' is unreachable: {detail}")]
    DatabaseUnreachable { container: String, detail: String },

    #[error("drop statement failed (exit {code}): {detail}")]
    SqlFailed { code: i32, detail: String },

    #[error("maintenance script failed (exit {code}): {detail}")]
    MaintenanceFailed { code: i32, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl ResetError {
    /// Whether this failure stops the run before the rebuild step under the
    /// abort-on-failure gate. Maintenance failures are the last step and are
    /// only ever reported.
    pub fn aborts(&self) -> bool {
        !matches!(self, ResetError::MaintenanceFailed { .. })
    }

    /// Stable snake_case tag for JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            ResetError::ConfigNotFound(_) => "config_not_found",
            ResetError::InvalidIdentifier { .. } => "invalid_identifier",
            ResetError::EmptyTableList => "empty_table_list",
            ResetError::DuplicateTable(_) => "duplicate_table",
            ResetError::SameContainer(_) => "same_container",
            ResetError::EmptyField(_) => "empty_field",
            ResetError::NoContainerRuntime => "no_container_runtime",
            ResetError::SpawnFailed { .. } => "spawn_failed",
            ResetError::ContainerUnreachable { .. } => "container_unreachable",
            ResetError::AuthenticationFailed { .. } => "authentication_failed",
            ResetError::DatabaseUnreachable { .. } => "database_unreachable",
            ResetError::SqlFailed { .. } => "sql_failed",
            ResetError::MaintenanceFailed { .. } => "maintenance_failed",
            ResetError::Io(_) => "io",
            ResetError::Yaml(_) => "yaml",
        }
    }
}

pub type Result<T> = std::result::Result<T, ResetError>;
