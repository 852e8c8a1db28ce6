use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const RESET_DIR: &str = ".da-reset";
pub const CONFIG_FILE: &str = ".da-reset/config.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_helpers() {
        let root = Path::new("/srv/pkc");
        assert_eq!(config_path(root), PathBuf::from("/srv/pkc/.da-reset/config.yaml"));
    }
}
