use hwemu_primitives::Profile;

use super::*;
use crate::validate::load_str;

const EXAMPLE: &str = "[tty0]\n0102=aabbcc\n\"hi\"=ff\n";

#[test]
fn test_serialize_example() {
    let config = load_str(Profile::VCPSIM, "example.ini", EXAMPLE).unwrap();

    assert_eq!(
        serialize(&config),
        "tty\ntty/tty0\n0\t0102=aabbcc\n1\t6869=ff\ni2c\n"
    );
    assert_eq!(config.to_string(), serialize(&config));
}

#[test]
fn test_empty_interfaces_are_listed() {
    let config = Configuration::empty(Profile::HWEMU);
    assert_eq!(serialize(&config), "tty\ni2c\nnet\nspi\n");
}

#[test]
fn test_equal_ignores_declaration_order_of_sections() {
    let a = load_str(Profile::HWEMU, "a", "[tty1]\n01=02\n[tty0]\n03=04\n").unwrap();
    let b = load_str(Profile::HWEMU, "b", "[tty0]\n03=04\n[tty1]\n01=02\n").unwrap();

    assert!(equal(&a, &b));
    assert_eq!(compare(&a, &b), Ok(()));
}

#[test]
fn test_pair_order_is_significant() {
    let a = load_str(Profile::HWEMU, "a", "[tty0]\n01=aa\n02=bb\n").unwrap();
    let b = load_str(Profile::HWEMU, "b", "[tty0]\n02=bb\n01=aa\n").unwrap();

    assert!(!equal(&a, &b));

    let mismatch = compare(&a, &b).unwrap_err();
    assert_eq!(mismatch.expected, serialize(&a));
    assert_eq!(mismatch.actual, serialize(&b));

    let diff = mismatch.diff();
    assert!(diff.contains("--- written"));
    assert!(diff.contains("+++ read back"));
    assert!(diff.contains("-0\t01=aa"));
    assert!(diff.contains("+0\t02=bb"));
}

#[test]
fn test_extern_name_is_not_canonical() {
    let a = load_str(Profile::HWEMU, "a", "[ttyHWE0]\n01=aa\n").unwrap();
    let b = load_str(Profile::HWEMU, "b", "[tty0]\n01=aa\n").unwrap();

    assert!(equal(&a, &b));
}

#[test]
fn test_pretty() {
    let config = load_str(Profile::VCPSIM, "example.ini", EXAMPLE).unwrap();

    assert_eq!(
        pretty(&config),
        "  tty:\n    tty0:\n      2 pair(s)\n  i2c:\n"
    );
}
