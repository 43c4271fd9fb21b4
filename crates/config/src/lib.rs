//! Settings of the `hwectl` control tool, kept in `hwectl.toml`.
//!
//! Every field has a default, so a missing file or a partial one is fine.

use std::fs::{create_dir_all, read_to_string, write};

use camino::{Utf8Path, Utf8PathBuf};
use eyre::{Result as EyreResult, WrapErr};
use hwemu_primitives::{Limits, Revision};
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "tests/config.rs"]
mod tests;

pub const CONFIG_FILE: &str = "hwectl.toml";

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
#[non_exhaustive]
pub struct ConfigFile {
    pub module: ModuleConfig,
    pub generator: GeneratorConfig,
    pub roundtrip: RoundtripConfig,
    pub watch: WatchConfig,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
#[non_exhaustive]
pub struct ModuleConfig {
    pub revision: Revision,
    /// Where to look for `<module>.ko`. Relative entries are resolved
    /// against the directory of the `hwectl` executable.
    pub search_dirs: Vec<Utf8PathBuf>,
    /// Overrides `/sys/kernel/<module>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sysfs_base: Option<Utf8PathBuf>,
    /// Groups a sudo user needs to access the emulated devices.
    pub groups: Vec<String>,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            revision: Revision::default(),
            search_dirs: vec![".".into(), "../kernel".into()],
            sysfs_base: None,
            groups: vec!["dialout".to_owned(), "i2c".to_owned()],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
#[non_exhaustive]
pub struct GeneratorConfig {
    /// Generation limits; the profile's capped defaults when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<Limits>,
    /// Record external names (`[ttyHWE0]` sections) on generated devices.
    pub extern_names: bool,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
#[non_exhaustive]
pub struct RoundtripConfig {
    pub repeats: usize,
    /// Seed of the first configuration; each repeat uses the next one.
    /// Drawn from entropy when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for RoundtripConfig {
    fn default() -> Self {
        Self {
            repeats: 50,
            seed: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
#[non_exhaustive]
pub struct WatchConfig {
    pub seconds: u64,
    pub dev_dir: Utf8PathBuf,
    /// Delay between two reads of one device.
    pub poll_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            seconds: 10,
            dev_dir: "/dev".into(),
            poll_ms: 100,
        }
    }
}

impl ConfigFile {
    #[must_use]
    pub fn exists(path: &Utf8Path) -> bool {
        path.is_file()
    }

    pub fn load(path: &Utf8Path) -> EyreResult<Self> {
        let content = read_to_string(path)
            .wrap_err_with(|| format!("failed to read configuration from {path:?}"))?;

        toml::from_str(&content)
            .wrap_err_with(|| format!("failed to parse configuration from {path:?}"))
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default(path: &Utf8Path) -> EyreResult<Self> {
        if !Self::exists(path) {
            return Ok(Self::default());
        }

        Self::load(path)
    }

    pub fn save(&self, path: &Utf8Path) -> EyreResult<()> {
        let content = self.to_toml()?;

        if let Some(dir) = path.parent() {
            create_dir_all(dir)
                .wrap_err_with(|| format!("failed to create directory {dir:?}"))?;
        }

        write(path, content)
            .wrap_err_with(|| format!("failed to write configuration to {path:?}"))?;

        Ok(())
    }

    pub fn to_toml(&self) -> EyreResult<String> {
        toml::to_string_pretty(self).map_err(Into::into)
    }

    /// Value of a single dotted key, as it would appear in the file.
    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<String> {
        match key {
            "module.revision" => Some(self.module.revision.to_string()),
            "module.search_dirs" => Some(
                self.module
                    .search_dirs
                    .iter()
                    .map(|dir| dir.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            "module.sysfs_base" => self.module.sysfs_base.as_ref().map(ToString::to_string),
            "module.groups" => Some(self.module.groups.join(", ")),
            "generator.extern_names" => Some(self.generator.extern_names.to_string()),
            "roundtrip.repeats" => Some(self.roundtrip.repeats.to_string()),
            "roundtrip.seed" => self.roundtrip.seed.map(|seed| seed.to_string()),
            "watch.seconds" => Some(self.watch.seconds.to_string()),
            "watch.dev_dir" => Some(self.watch.dev_dir.to_string()),
            "watch.poll_ms" => Some(self.watch.poll_ms.to_string()),
            _ => None,
        }
    }
}
