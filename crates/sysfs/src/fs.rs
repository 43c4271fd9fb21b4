use std::fs::{self, OpenOptions};
use std::io::{self, Write};

use camino::Utf8Path;

/// Access to the module's control files.
///
/// The protocol never touches the filesystem directly; it goes through
/// this trait so the same code drives the real module under `/sys` and the
/// in-process emulation used by tests.
pub trait ControlFs {
    /// Writes `content` to an existing control file in a single call.
    fn write(&self, path: &Utf8Path, content: &str) -> io::Result<()>;

    fn read(&self, path: &Utf8Path) -> io::Result<String>;

    /// Names of the entries of a directory, in no particular order.
    fn list_dir(&self, path: &Utf8Path) -> io::Result<Vec<String>>;

    fn is_dir(&self, path: &Utf8Path) -> bool;
}

impl<T: ControlFs + ?Sized> ControlFs for &T {
    fn write(&self, path: &Utf8Path, content: &str) -> io::Result<()> {
        (**self).write(path, content)
    }

    fn read(&self, path: &Utf8Path) -> io::Result<String> {
        (**self).read(path)
    }

    fn list_dir(&self, path: &Utf8Path) -> io::Result<Vec<String>> {
        (**self).list_dir(path)
    }

    fn is_dir(&self, path: &Utf8Path) -> bool {
        (**self).is_dir(path)
    }
}

/// The host filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostFs;

impl ControlFs for HostFs {
    fn write(&self, path: &Utf8Path, content: &str) -> io::Result<()> {
        // never create: a missing control file means the module is not there
        let mut file = OpenOptions::new().write(true).open(path)?;
        file.write_all(content.as_bytes())
    }

    fn read(&self, path: &Utf8Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn list_dir(&self, path: &Utf8Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();

        for entry in path.read_dir_utf8()? {
            names.push(entry?.file_name().to_owned());
        }

        Ok(names)
    }

    fn is_dir(&self, path: &Utf8Path) -> bool {
        path.is_dir()
    }
}
