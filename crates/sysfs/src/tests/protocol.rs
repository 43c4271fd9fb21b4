use std::fs;

use hwemu_model::{compare, load_str, random_config};
use hwemu_primitives::{Limits, Revision};

use super::*;
use crate::testing::EmulatedModule;

const EXAMPLE: &str = "[tty0]\n0102=aabbcc\n\"hi\"=ff\n[tty1]\n01=02\n[i2c0]\n10=20\n";

fn total(counts: &BTreeMap<Interface, usize>) -> usize {
    counts.values().sum()
}

#[test]
fn test_write_read_erase_random() {
    for revision in Revision::ALL {
        let profile = revision.profile();
        let module = EmulatedModule::new(profile);
        let tree = module.tree();

        for seed in 0..50 {
            let config = random_config(profile, seed);

            tree.write(&config).unwrap();

            let back = tree.read().unwrap();
            if let Err(mismatch) = compare(&config, &back) {
                panic!("{revision} seed {seed}:\n{}", mismatch.diff());
            }

            tree.erase().unwrap();
            assert_eq!(total(&tree.device_count().unwrap()), 0);
            assert_eq!(module.device_total().unwrap(), 0);
        }
    }
}

#[test]
fn test_read_empty_module() {
    let module = EmulatedModule::new(Profile::HWEMU);

    let config = module.tree().read().unwrap();
    assert_eq!(config.device_count(), 0);
    assert_eq!(config.interfaces().count(), 4);
}

#[test]
fn test_line_per_pair_layout() {
    let module = EmulatedModule::new(Profile::VCPSIM);
    let tree = module.tree();
    let config = load_str(Profile::VCPSIM, "example", EXAMPLE).unwrap();

    tree.write(&config).unwrap();

    let pairs = module
        .read(&tree.base().join("tty/tty0/pairs"))
        .unwrap();
    assert_eq!(pairs, "0\t0102=aabbcc\n1\t6869=ff\n");

    assert!(compare(&config, &tree.read().unwrap()).is_ok());
}

#[test]
fn test_file_per_pair_layout() {
    let module = EmulatedModule::new(Profile::HWEMU);
    let tree = module.tree();
    let config = load_str(Profile::HWEMU, "example", EXAMPLE).unwrap();

    tree.write(&config).unwrap();

    let pair = module.read(&tree.base().join("tty/tty0/pairs/1")).unwrap();
    assert_eq!(pair, "6869=ff");
}

#[test]
fn test_write_requires_empty_interfaces() {
    let module = EmulatedModule::new(Profile::HWEMU);
    let tree = module.tree();
    let config = load_str(Profile::HWEMU, "example", EXAMPLE).unwrap();

    tree.write(&config).unwrap();

    let err = tree.write(&config).unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::Occupied {
            iface: Interface::Tty,
            count: 2
        }
    ));
    assert!(err.is_precondition());
    assert_eq!(module.device_total().unwrap(), 3);
}

#[test]
fn test_write_fails_fast() {
    const STRICT: Profile = Profile {
        limits: Limits {
            max_pairs: 1,
            ..Profile::HWEMU.limits
        },
        ..Profile::HWEMU
    };

    let module = EmulatedModule::new(STRICT);
    let tree = module.tree();
    let config = load_str(Profile::HWEMU, "example", EXAMPLE).unwrap();

    let err = tree.write(&config).unwrap_err();
    assert!(err.is_rejected(), "{err:?}");
    assert!(!err.is_precondition());

    // tty0 was allocated, its second pair refused, nothing after it written
    let counts = tree.device_count().unwrap();
    assert_eq!(counts[&Interface::Tty], 1);
    assert_eq!(counts[&Interface::I2c], 0);

    tree.erase().unwrap();
    assert_eq!(module.device_total().unwrap(), 0);
}

#[test]
fn test_missing_module_is_environment_error() {
    let module = EmulatedModule::new(Profile::HWEMU);
    let tree = module.tree();
    let config = load_str(Profile::HWEMU, "example", EXAMPLE).unwrap();

    module.unload().unwrap();

    assert!(tree.write(&config).unwrap_err().is_environment());
    assert!(tree.read().unwrap_err().is_environment());
    assert!(tree.erase().unwrap_err().is_environment());

    module.load().unwrap();
    tree.write(&config).unwrap();
}

#[test]
fn test_revision_mismatch() {
    let module = EmulatedModule::new(Profile::VCPSIM);
    let config = load_str(Profile::HWEMU, "example", EXAMPLE).unwrap();

    let err = module.tree().write(&config).unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::RevisionMismatch {
            expected: Revision::Vcpsim,
            found: Revision::Hwemu,
        }
    ));
    assert!(err.is_precondition());
}

#[test]
fn test_device_indexes_reused_after_erase() {
    let module = EmulatedModule::new(Profile::HWEMU);
    let tree = module.tree();
    let config = load_str(Profile::HWEMU, "example", EXAMPLE).unwrap();

    for _ in 0..3 {
        tree.write(&config).unwrap();
        assert!(compare(&config, &tree.read().unwrap()).is_ok());
        tree.erase().unwrap();
    }
}

fn scratch_tree(root: &Utf8Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let path = root.join(path);
        if let Some(content) = content.strip_prefix("dir:") {
            assert!(content.is_empty());
            fs::create_dir_all(&path).unwrap();
        } else {
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
        }
    }
}

fn tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
    (dir, root)
}

#[test]
fn test_host_read() {
    let (_guard, root) = tempdir();
    scratch_tree(
        &root,
        &[
            ("tty/add", ""),
            ("tty/uninstall", ""),
            ("tty/tty0/pairs/0", "0102=aabbcc\n"),
            ("tty/tty0/pairs/1", "6869=FF"),
            ("tty/tty1/pairs/0", "01=02"),
            ("tty/tty10/pairs", "dir:"),
            ("i2c/add", ""),
            ("net/add", ""),
            ("spi/add", ""),
        ],
    );

    let tree = SysfsTree::new(root, Profile::HWEMU, HostFs);
    let config = tree.read().unwrap();

    assert_eq!(
        hwemu_model::serialize(&config),
        "tty\ntty/tty0\n0\t0102=aabbcc\n1\t6869=ff\ntty/tty1\n0\t01=02\ntty/tty10\ni2c\nnet\nspi\n"
    );
}

#[test]
fn test_host_read_malformed() {
    let (_guard, root) = tempdir();
    scratch_tree(
        &root,
        &[
            ("tty/tty0/pairs/0", "ERROR: pair with index 0 not found!"),
            ("i2c/add", ""),
            ("net/add", ""),
            ("spi/add", ""),
        ],
    );

    let tree = SysfsTree::new(root, Profile::HWEMU, HostFs);
    assert!(matches!(tree.read(), Err(ProtocolError::Malformed { .. })));
}

#[test]
fn test_host_read_gap_in_pair_files() {
    let (_guard, root) = tempdir();
    scratch_tree(
        &root,
        &[
            ("tty/tty0/pairs/0", "01=02"),
            ("tty/tty0/pairs/2", "03=04"),
        ],
    );

    let tree = SysfsTree::new(root, Profile::HWEMU, HostFs);
    assert!(matches!(tree.read(), Err(ProtocolError::Malformed { .. })));
}

#[test]
fn test_host_missing_base() {
    let (_guard, root) = tempdir();

    let tree = SysfsTree::new(root.join("hwemu"), Profile::HWEMU, HostFs);
    assert!(tree.read().unwrap_err().is_environment());
    assert!(tree.device_count().unwrap_err().is_environment());
}

#[test]
fn test_host_write_detects_desync() {
    let (_guard, root) = tempdir();
    scratch_tree(&root, &[("tty/add", ""), ("i2c/add", "")]);

    let tree = SysfsTree::new(root.clone(), Profile::HWEMU, HostFs);
    let config = load_str(Profile::HWEMU, "example", "[tty0]\n01=02\n").unwrap();

    let err = tree.write(&config).unwrap_err();
    assert!(matches!(err, ProtocolError::Desync { .. }), "{err:?}");
    assert_eq!(fs::read_to_string(root.join("tty/add")).unwrap(), "1");
}

#[test]
fn test_host_write_precondition() {
    let (_guard, root) = tempdir();
    scratch_tree(
        &root,
        &[("tty/add", ""), ("tty/tty0/add", ""), ("tty/tty0/pairs", "dir:")],
    );

    let tree = SysfsTree::new(root.clone(), Profile::HWEMU, HostFs);
    let config = load_str(Profile::HWEMU, "example", "[tty0]\n\"hi\"=ff\n").unwrap();

    // tty0 already exists, so the precondition trips first
    assert!(matches!(
        tree.write(&config),
        Err(ProtocolError::Occupied { count: 1, .. })
    ));

    fs::remove_dir_all(root.join("tty/tty0")).unwrap();
    let err = tree.write(&config).unwrap_err();
    assert!(matches!(err, ProtocolError::Desync { .. }));
}

#[test]
fn test_host_erase_keeps_going() {
    let (_guard, root) = tempdir();
    scratch_tree(
        &root,
        &[
            ("tty/tty0/pairs", "dir:"),
            ("i2c/uninstall", ""),
            ("i2c/i2c0/pairs", "dir:"),
            ("net/uninstall", ""),
            ("spi/uninstall", ""),
        ],
    );

    let tree = SysfsTree::new(root.clone(), Profile::HWEMU, HostFs);

    let err = tree.erase().unwrap_err();
    assert!(err.is_environment(), "{err:?}");
    assert_eq!(
        fs::read_to_string(root.join("i2c/uninstall")).unwrap(),
        "i2c0"
    );
}
