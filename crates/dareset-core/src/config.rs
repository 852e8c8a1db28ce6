use crate::error::{ResetError, Result};
use crate::ident;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// GatePolicy
// ---------------------------------------------------------------------------

/// What happens to the rebuild step when the drop step fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatePolicy {
    /// Stop after a failed drop; the rebuild never starts.
    #[default]
    AbortOnFailure,
    /// Run the rebuild whatever the drop returned.
    Unconditional,
}

impl GatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatePolicy::AbortOnFailure => "abort_on_failure",
            GatePolicy::Unconditional => "unconditional",
        }
    }
}

// ---------------------------------------------------------------------------
// DatabaseConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_container")]
    pub container: String,
    #[serde(default = "default_db_client")]
    pub client: String,
    #[serde(default = "default_db_user")]
    pub user: String,
    #[serde(default = "default_db_name")]
    pub name: String,
    /// Environment variable holding the password. When set and present, the
    /// value is forwarded as `MYSQL_PWD` instead of prompting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
    /// Allocate stdin and a terminal for the client so it can prompt.
    #[serde(default = "default_interactive")]
    pub interactive: bool,
}

fn default_db_container() -> String {
    "pkc_database_1".to_string()
}

fn default_db_client() -> String {
    "mysql".to_string()
}

fn default_db_user() -> String {
    "wikiuser".to_string()
}

fn default_db_name() -> String {
    "my_wiki".to_string()
}

fn default_interactive() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            container: default_db_container(),
            client: default_db_client(),
            user: default_db_user(),
            name: default_db_name(),
            password_env: None,
            interactive: default_interactive(),
        }
    }
}

// ---------------------------------------------------------------------------
// ApplicationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(default = "default_app_container")]
    pub container: String,
    #[serde(default = "default_php")]
    pub php: String,
    #[serde(default = "default_update_script")]
    pub update_script: String,
    /// Extra arguments for the update script, e.g. `--quick`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub update_args: Vec<String>,
}

fn default_app_container() -> String {
    "pkc_mediawiki_1".to_string()
}

fn default_php() -> String {
    "php".to_string()
}

fn default_update_script() -> String {
    "/var/www/html/maintenance/update.php".to_string()
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            container: default_app_container(),
            php: default_php(),
            update_script: default_update_script(),
            update_args: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

pub const DEFAULT_TABLES: [&str; 4] = [
    "page_verification",
    "witness_events",
    "witness_page",
    "witness_merkle_tree",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Container runtime binary. Auto-detected when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub application: ApplicationConfig,
    #[serde(default = "default_tables")]
    pub tables: Vec<String>,
    /// `$wgDBprefix` of the wiki, prepended to every table name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub table_prefix: String,
    #[serde(default)]
    pub gate: GatePolicy,
    #[serde(default = "default_preflight")]
    pub preflight: bool,
}

fn default_version() -> u32 {
    1
}

fn default_tables() -> Vec<String> {
    DEFAULT_TABLES.iter().map(|t| t.to_string()).collect()
}

fn default_preflight() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            runtime: None,
            database: DatabaseConfig::default(),
            application: ApplicationConfig::default(),
            tables: default_tables(),
            table_prefix: String::new(),
            gate: GatePolicy::default(),
            preflight: default_preflight(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ResetError::ConfigNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Load the file if it exists. A missing file means the stock deployment.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(ResetError::ConfigNotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    /// Fully prefixed table names, in configured order.
    pub fn qualified_tables(&self) -> Vec<String> {
        self.tables
            .iter()
            .map(|t| format!("{}{}", self.table_prefix, t))
            .collect()
    }

    /// Hard checks: any failure here means no command may be built.
    pub fn check(&self) -> Result<()> {
        match self.problems().into_iter().next() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Every hard error, in the order `check` would report them.
    fn problems(&self) -> Vec<ResetError> {
        let mut problems = Vec::new();
        let mut push = |r: Result<()>| {
            if let Err(e) = r {
                problems.push(e);
            }
        };

        push(ident::validate_container(&self.database.container));
        push(ident::validate_container(&self.application.container));
        if self.database.container == self.application.container {
            push(Err(ResetError::SameContainer(self.database.container.clone())));
        }
        push(ident::validate_sql_ident("database user", &self.database.user));
        push(ident::validate_sql_ident("database name", &self.database.name));
        push(ident::validate_prefix(&self.table_prefix));

        for (field, value) in [
            ("database.client", &self.database.client),
            ("application.php", &self.application.php),
            ("application.update_script", &self.application.update_script),
        ] {
            if value.trim().is_empty() {
                push(Err(ResetError::EmptyField(field)));
            }
        }
        if self
            .database
            .password_env
            .as_deref()
            .is_some_and(|var| var.trim().is_empty())
        {
            push(Err(ResetError::EmptyField("database.password_env")));
        }

        if self.tables.is_empty() {
            push(Err(ResetError::EmptyTableList));
        }
        let mut seen = HashSet::new();
        for table in self.qualified_tables() {
            if let Err(e) = ident::validate_sql_ident("table name", &table) {
                push(Err(e));
            } else if !seen.insert(table.clone()) {
                push(Err(ResetError::DuplicateTable(table)));
            }
        }
        problems
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        // 1. Hard errors: `run` and `plan` refuse the config
        for e in self.problems() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: e.to_string(),
            });
        }

        // 2. Without a terminal and without a password source the client blocks
        if !self.database.interactive && self.database.password_env.is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "database.interactive is false and no password_env is set; \
                          the client cannot prompt for a password"
                    .to_string(),
            });
        }

        // 3. Literal-script gating runs the rebuild even after a failed drop
        if self.gate == GatePolicy::Unconditional {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "gate is 'unconditional': the rebuild runs even if the drop fails"
                    .to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_stock_deployment() {
        let cfg = Config::default();
        assert_eq!(cfg.database.container, "pkc_database_1");
        assert_eq!(cfg.database.user, "wikiuser");
        assert_eq!(cfg.database.name, "my_wiki");
        assert_eq!(cfg.application.container, "pkc_mediawiki_1");
        assert_eq!(cfg.application.update_script, "/var/www/html/maintenance/update.php");
        assert_eq!(cfg.tables, DEFAULT_TABLES);
        assert_eq!(cfg.gate, GatePolicy::AbortOnFailure);
        assert!(cfg.preflight);
        assert!(cfg.database.interactive);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "database:\n  user: admin\ngate: unconditional\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.database.user, "admin");
        assert_eq!(cfg.database.container, "pkc_database_1");
        assert_eq!(cfg.gate, GatePolicy::Unconditional);
        assert_eq!(cfg.tables.len(), 4);
    }

    #[test]
    fn empty_yaml_is_default() {
        let cfg: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = paths::config_path(dir.path());
        let mut cfg = Config::default();
        cfg.table_prefix = "mw_".to_string();
        cfg.application.update_args = vec!["--quick".to_string()];
        cfg.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn load_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ResetError::ConfigNotFound(_)));
    }

    #[test]
    fn load_or_default_on_missing_file() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load_or_default(&paths::config_path(dir.path())).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn load_or_default_propagates_parse_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "tables: [unterminated").unwrap();
        assert!(matches!(
            Config::load_or_default(&path),
            Err(ResetError::Yaml(_))
        ));
    }

    #[test]
    fn qualified_tables_apply_prefix() {
        let mut cfg = Config::default();
        cfg.table_prefix = "mw_".to_string();
        assert_eq!(cfg.qualified_tables()[0], "mw_page_verification");
        assert_eq!(cfg.qualified_tables()[3], "mw_witness_merkle_tree");
    }

    #[test]
    fn check_rejects_empty_table_list() {
        let mut cfg = Config::default();
        cfg.tables.clear();
        assert!(matches!(cfg.check(), Err(ResetError::EmptyTableList)));
    }

    #[test]
    fn check_rejects_duplicates() {
        let mut cfg = Config::default();
        cfg.tables.push("witness_page".to_string());
        match cfg.check() {
            Err(ResetError::DuplicateTable(t)) => assert_eq!(t, "witness_page"),
            other => panic!("expected DuplicateTable, got {other:?}"),
        }
    }

    #[test]
    fn check_rejects_injection_in_table_name() {
        let mut cfg = Config::default();
        cfg.tables = vec!["page; DROP DATABASE my_wiki".to_string()];
        assert!(matches!(
            cfg.check(),
            Err(ResetError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn check_rejects_same_container_for_both_steps() {
        let mut cfg = Config::default();
        cfg.application.container = cfg.database.container.clone();
        match cfg.check() {
            Err(ResetError::SameContainer(c)) => assert_eq!(c, "pkc_database_1"),
            other => panic!("expected SameContainer, got {other:?}"),
        }
    }

    #[test]
    fn check_rejects_empty_executables() {
        for field in ["database.client", "application.php", "application.update_script"] {
            let mut cfg = Config::default();
            match field {
                "database.client" => cfg.database.client = String::new(),
                "application.php" => cfg.application.php = "  ".to_string(),
                _ => cfg.application.update_script = String::new(),
            }
            match cfg.check() {
                Err(ResetError::EmptyField(f)) => assert_eq!(f, field),
                other => panic!("expected EmptyField({field}), got {other:?}"),
            }
        }
    }

    #[test]
    fn check_rejects_blank_password_env() {
        let mut cfg = Config::default();
        cfg.database.password_env = Some(String::new());
        assert!(matches!(
            cfg.check(),
            Err(ResetError::EmptyField("database.password_env"))
        ));
    }

    #[test]
    fn validate_lists_every_hard_error() {
        let mut cfg = Config::default();
        cfg.application.container = cfg.database.container.clone();
        cfg.application.update_script = String::new();
        let errors: Vec<_> = cfg
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .collect();
        assert_eq!(errors.len(), 2);
        assert!(cfg.check().is_err());
    }

    #[test]
    fn validate_default_config_no_warnings() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn validate_flags_same_container() {
        let mut cfg = Config::default();
        cfg.application.container = cfg.database.container.clone();
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("both 'pkc_database_1'")));
    }

    #[test]
    fn validate_warns_on_unconditional_gate() {
        let mut cfg = Config::default();
        cfg.gate = GatePolicy::Unconditional;
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
        assert!(warnings[0].message.contains("unconditional"));
    }

    #[test]
    fn validate_warns_when_client_cannot_prompt() {
        let mut cfg = Config::default();
        cfg.database.interactive = false;
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.message.contains("cannot prompt")));

        cfg.database.password_env = Some("WIKI_DB_PASSWORD".to_string());
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn validate_reports_hard_errors() {
        let mut cfg = Config::default();
        cfg.database.name = "my-wiki".to_string();
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("database name")));
    }

    #[test]
    fn gate_policy_serializes_snake_case() {
        let yaml = serde_yaml::to_string(&GatePolicy::AbortOnFailure).unwrap();
        assert_eq!(yaml.trim(), "abort_on_failure");
        assert_eq!(GatePolicy::Unconditional.as_str(), "unconditional");
    }
}
