use camino::{Utf8Path, Utf8PathBuf};

pub const DEFAULT_HWEMU_HOME: &str = ".hwemu";

pub fn default_home() -> Utf8PathBuf {
    dirs::home_dir()
        .and_then(|home| Utf8Path::from_path(&home).map(|home| home.join(DEFAULT_HWEMU_HOME)))
        .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_HWEMU_HOME))
}
