//! Integration tests for the hwectl commands that work without a loaded
//! kernel module: file validation and generation, settings, and read-back
//! or erase against a sysfs-shaped scratch directory.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

const EXAMPLE: &str = "[tty0]\n0102=aabbcc\n\"hi\"=ff\n";

fn hwectl(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("hwectl").expect("Failed to find hwectl binary");
    let _ = cmd.arg("--home").arg(home.path()).env_remove("SUDO_USER");
    cmd
}

fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

mod check_ini {
    use super::*;

    #[test]
    fn test_valid_file() {
        let home = tempdir().unwrap();
        let file = home.path().join("devices.ini");
        fs::write(&file, EXAMPLE).unwrap();

        hwectl(&home)
            .arg("check-ini")
            .arg(&file)
            .assert()
            .success()
            .stdout(predicate::str::contains("1 device(s), 2 pair(s)"))
            .stdout(predicate::str::contains("tty0:"));
    }

    #[test]
    fn test_json_output() {
        let home = tempdir().unwrap();
        let file = home.path().join("devices.ini");
        fs::write(&file, EXAMPLE).unwrap();

        hwectl(&home)
            .args(["--output-format", "json", "check-ini"])
            .arg(&file)
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""devices":1"#))
            .stdout(predicate::str::contains(r#""revision":"hwemu""#));
    }

    #[test]
    fn test_gap_is_rejected() {
        let home = tempdir().unwrap();
        let file = home.path().join("gap.ini");
        fs::write(&file, "[tty0]\n01=02\n[tty2]\n03=04\n").unwrap();

        hwectl(&home)
            .arg("check-ini")
            .arg(&file)
            .assert()
            .failure()
            .stderr(predicate::str::contains("tty1 is missing"));
    }

    #[test]
    fn test_interface_outside_profile() {
        let home = tempdir().unwrap();
        let file = home.path().join("net.ini");
        fs::write(&file, "[net0]\n01=02\n").unwrap();

        hwectl(&home).arg("check-ini").arg(&file).assert().success();

        hwectl(&home)
            .args(["--profile", "vcpsim", "check-ini"])
            .arg(&file)
            .assert()
            .failure();
    }

    #[test]
    fn test_missing_file() {
        let home = tempdir().unwrap();

        hwectl(&home)
            .arg("check-ini")
            .arg(home.path().join("nope.ini"))
            .assert()
            .failure();
    }
}

mod random_ini {
    use super::*;

    #[test]
    fn test_generated_file_validates() {
        let home = tempdir().unwrap();
        let file = home.path().join("random.ini");

        hwectl(&home)
            .args(["random-ini", "--seed", "42"])
            .arg(&file)
            .assert()
            .success()
            .stdout(predicate::str::contains("seed 42"));

        hwectl(&home).arg("check-ini").arg(&file).assert().success();
    }

    #[test]
    fn test_same_seed_same_file() {
        let home = tempdir().unwrap();
        let first = home.path().join("first.ini");
        let second = home.path().join("second.ini");

        for file in [&first, &second] {
            hwectl(&home)
                .args(["--profile", "vcpsim", "random-ini", "--seed", "7"])
                .arg(file)
                .assert()
                .success();
        }

        assert_eq!(
            fs::read_to_string(&first).unwrap(),
            fs::read_to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_extern_names() {
        let home = tempdir().unwrap();
        let file = home.path().join("extern.ini");

        hwectl(&home)
            .args(["random-ini", "--seed", "3", "--extern-names"])
            .arg(&file)
            .assert()
            .success();

        let text = fs::read_to_string(&file).unwrap();
        assert!(text.starts_with("[ttyHWE0]\n"), "{text}");

        hwectl(&home).arg("check-ini").arg(&file).assert().success();
    }

    #[test]
    fn test_refuses_to_overwrite() {
        let home = tempdir().unwrap();
        let file = home.path().join("existing.ini");
        fs::write(&file, "keep me").unwrap();

        hwectl(&home)
            .arg("random-ini")
            .arg(&file)
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));

        assert_eq!(fs::read_to_string(&file).unwrap(), "keep me");
    }
}

mod sysfs {
    use super::*;

    #[test]
    fn test_dump_canonical() {
        let home = tempdir().unwrap();
        let base = home.path().join("hwemu");
        write_tree(
            &base,
            &[
                ("tty/add", ""),
                ("tty/tty0/pairs/0", "0102=aabbcc"),
                ("tty/tty0/pairs/1", "6869=ff"),
                ("i2c/add", ""),
                ("net/add", ""),
                ("spi/add", ""),
            ],
        );

        hwectl(&home)
            .arg("--base")
            .arg(&base)
            .arg("dump")
            .assert()
            .success()
            .stdout("tty\ntty/tty0\n0\t0102=aabbcc\n1\t6869=ff\ni2c\nnet\nspi\n");
    }

    #[test]
    fn test_dump_line_per_pair() {
        let home = tempdir().unwrap();
        let base = home.path().join("vcpsim");
        write_tree(
            &base,
            &[
                ("tty/add", ""),
                ("tty/tty0/pairs", "0\t0102=aabbcc\n1\t6869=ff\n"),
                ("i2c/add", ""),
            ],
        );

        hwectl(&home)
            .args(["--profile", "vcpsim", "--base"])
            .arg(&base)
            .args(["dump", "--pretty"])
            .assert()
            .success()
            .stdout(predicate::str::contains("2 pair(s)"));
    }

    #[test]
    fn test_dump_without_module() {
        let home = tempdir().unwrap();

        hwectl(&home)
            .arg("--base")
            .arg(home.path().join("missing"))
            .arg("dump")
            .assert()
            .code(2)
            .stderr(predicate::str::contains("is the hwemu module loaded?"));
    }

    #[test]
    fn test_erase_writes_uninstall() {
        let home = tempdir().unwrap();
        let base = home.path().join("hwemu");
        write_tree(
            &base,
            &[
                ("tty/uninstall", ""),
                ("tty/tty0/pairs/0", "01=02"),
                ("i2c/uninstall", ""),
                ("net/uninstall", ""),
                ("spi/uninstall", ""),
            ],
        );

        hwectl(&home)
            .arg("--base")
            .arg(&base)
            .arg("erase")
            .assert()
            .success()
            .stdout(predicate::str::contains("erased 1 device(s)"));

        assert_eq!(
            fs::read_to_string(base.join("tty/uninstall")).unwrap(),
            "tty0"
        );
    }
}

mod roundtrip {
    use super::*;

    #[test]
    fn test_occupied_tree_left_alone() {
        let home = tempdir().unwrap();
        let base = home.path().join("hwemu");
        write_tree(
            &base,
            &[
                ("tty/add", ""),
                ("tty/uninstall", ""),
                ("tty/tty0/pairs/0", "01=02"),
                ("i2c/add", ""),
                ("i2c/uninstall", ""),
                ("net/add", ""),
                ("net/uninstall", ""),
                ("spi/add", ""),
                ("spi/uninstall", ""),
            ],
        );

        hwectl(&home)
            .arg("--base")
            .arg(&base)
            .args(["roundtrip", "--repeats", "1", "--seed", "1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("tty already has 1 device(s)"));

        assert_eq!(fs::read_to_string(base.join("tty/uninstall")).unwrap(), "");
        assert_eq!(fs::read_to_string(base.join("tty/add")).unwrap(), "");
        assert!(base.join("tty/tty0/pairs/0").is_file());
    }
}

mod config {
    use super::*;

    #[test]
    fn test_get_with_override() {
        let home = tempdir().unwrap();

        hwectl(&home)
            .args(["config", "--get", "module.revision"])
            .assert()
            .success()
            .stdout("hwemu\n");

        hwectl(&home)
            .args(["--profile", "vcpsim", "config", "--get", "module.revision"])
            .assert()
            .success()
            .stdout("vcpsim\n");
    }

    #[test]
    fn test_unknown_key() {
        let home = tempdir().unwrap();

        hwectl(&home)
            .args(["config", "--get", "module.colour"])
            .assert()
            .failure();
    }

    #[test]
    fn test_save_then_reuse() {
        let home = tempdir().unwrap();

        hwectl(&home)
            .args(["--profile", "vcpsim", "config", "--save"])
            .assert()
            .success();

        let saved = fs::read_to_string(home.path().join("hwectl.toml")).unwrap();
        assert!(saved.contains(r#"revision = "vcpsim""#), "{saved}");

        hwectl(&home)
            .args(["config", "--get", "module.revision"])
            .assert()
            .success()
            .stdout("vcpsim\n");
    }

    #[test]
    fn test_explicit_config_file() {
        let home = tempdir().unwrap();
        let file = home.path().join("other.toml");
        fs::write(&file, "[watch]\nseconds = 3\n").unwrap();

        hwectl(&home)
            .arg("--config")
            .arg(&file)
            .args(["config", "--get", "watch.seconds"])
            .assert()
            .success()
            .stdout("3\n");
    }
}
