//! Host-side collaborators: privileges, module loading, group membership
//! and the device nodes the module exposes.

use std::env;
use std::process::Stdio;

use camino::{Utf8Path, Utf8PathBuf};
use eyre::{bail, Result as EyreResult, WrapErr};
use hwemu_primitives::device::parse_index;
use hwemu_primitives::{DeviceName, Interface, Profile};
use tokio::fs::{read_dir, read_to_string};
use tokio::process::Command;
use tracing::{debug, info};

#[cfg(test)]
#[path = "tests/system.rs"]
mod tests;

const PROC_MODULES: &str = "/proc/modules";
const ETC_GROUP: &str = "/etc/group";

pub fn ensure_root() -> EyreResult<()> {
    // SAFETY: geteuid has no preconditions and cannot fail.
    let euid = unsafe { libc::geteuid() };

    if euid != 0 {
        bail!("this command must be run as root (try sudo)");
    }

    Ok(())
}

#[derive(Clone, Debug)]
pub struct KernelModule {
    name: &'static str,
    search_dirs: Vec<Utf8PathBuf>,
}

impl KernelModule {
    pub fn new(profile: &Profile, search_dirs: &[Utf8PathBuf]) -> Self {
        Self {
            name: profile.module,
            search_dirs: search_dirs.to_vec(),
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub async fn is_loaded(&self) -> EyreResult<bool> {
        let modules = read_to_string(PROC_MODULES)
            .await
            .wrap_err_with(|| format!("failed to read {PROC_MODULES}"))?;

        Ok(is_listed(&modules, self.name))
    }

    /// First `<name>.ko` found in the search directories. Relative
    /// directories are taken from the executable's location.
    pub fn locate(&self) -> EyreResult<Utf8PathBuf> {
        let exe = env::current_exe().wrap_err("failed to locate the hwectl executable")?;
        let exe_dir = exe
            .parent()
            .and_then(Utf8Path::from_path)
            .map(Utf8Path::to_owned)
            .unwrap_or_default();

        let file = format!("{}.ko", self.name);

        find_module_file(&exe_dir, &self.search_dirs, &file).ok_or_else(|| {
            eyre::eyre!(
                "{file} not found in {}",
                self.search_dirs
                    .iter()
                    .map(|dir| exe_dir.join(dir).to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })
    }

    pub async fn load(&self) -> EyreResult<()> {
        let path = self.locate()?;

        run("insmod", &[path.as_str()]).await?;

        info!(module = self.name, %path, "module loaded");

        Ok(())
    }

    pub async fn unload(&self) -> EyreResult<()> {
        run("rmmod", &[self.name]).await?;

        info!(module = self.name, "module unloaded");

        Ok(())
    }
}

async fn run(program: &str, args: &[&str]) -> EyreResult<()> {
    debug!(program, ?args, "running");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .wrap_err_with(|| format!("failed to run {program}"))?;

    if !output.status.success() {
        bail!(
            "{program} {} failed ({}): {}",
            args.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(())
}

/// Whether `/proc/modules` content lists `name`, matching its first column
/// exactly.
pub fn is_listed(proc_modules: &str, name: &str) -> bool {
    proc_modules
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .any(|module| module == name)
}

pub fn find_module_file(
    exe_dir: &Utf8Path,
    search_dirs: &[Utf8PathBuf],
    file: &str,
) -> Option<Utf8PathBuf> {
    search_dirs
        .iter()
        .map(|dir| exe_dir.join(dir).join(file))
        .find(|candidate| candidate.is_file())
}

/// Groups out of `wanted` that the invoking sudo user is not a member of.
/// Empty when not run through sudo.
pub async fn missing_groups(wanted: &[String]) -> EyreResult<Vec<String>> {
    let Ok(user) = env::var("SUDO_USER") else {
        return Ok(Vec::new());
    };

    let groups = read_to_string(ETC_GROUP)
        .await
        .wrap_err_with(|| format!("failed to read {ETC_GROUP}"))?;

    Ok(groups_lacking(&groups, &user, wanted))
}

/// Parses `/etc/group` content (`name:password:gid:member,member`).
pub fn groups_lacking(etc_group: &str, user: &str, wanted: &[String]) -> Vec<String> {
    wanted
        .iter()
        .filter(|group| {
            !etc_group.lines().any(|line| {
                let mut fields = line.split(':');
                fields.next() == Some(group.as_str())
                    && fields
                        .nth(2)
                        .is_some_and(|members| members.split(',').any(|m| m.trim() == user))
            })
        })
        .cloned()
        .collect()
}

/// Device node exposed by the module, e.g. `/dev/ttyHWE0`.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd, serde::Serialize)]
pub struct ExposedDevice {
    pub device: DeviceName,
    pub path: Utf8PathBuf,
}

/// Entries of `dev_dir` named after an interface's external prefix and a
/// device index, in interface then index order.
pub async fn exposed_devices(dev_dir: &Utf8Path, profile: &Profile) -> EyreResult<Vec<ExposedDevice>> {
    let mut entries = read_dir(dev_dir)
        .await
        .wrap_err_with(|| format!("failed to list {dev_dir}"))?;

    let mut devices = Vec::new();

    while let Some(entry) = entries
        .next_entry()
        .await
        .wrap_err_with(|| format!("failed to list {dev_dir}"))?
    {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };

        if let Some(device) = match_extern_name(profile.interfaces, &name) {
            devices.push(ExposedDevice {
                device,
                path: dev_dir.join(name),
            });
        }
    }

    devices.sort();

    Ok(devices)
}

fn match_extern_name(interfaces: &[Interface], name: &str) -> Option<DeviceName> {
    interfaces.iter().find_map(|iface| {
        name.strip_prefix(iface.extern_prefix())
            .and_then(parse_index)
            .map(|index| DeviceName::new(*iface, index))
    })
}
