use super::*;

#[test]
fn test_parse_and_display() {
    let name: DeviceName = "i2c12".parse().unwrap();
    assert_eq!(name.iface(), Interface::I2c);
    assert_eq!(name.index(), 12);
    assert_eq!(name.to_string(), "i2c12");
}

#[test]
fn test_numeric_ordering() {
    let mut names: Vec<DeviceName> = ["tty10", "tty9", "tty0", "i2c1", "tty1"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();
    names.sort();

    let names: Vec<String> = names.iter().map(ToString::to_string).collect();
    assert_eq!(names, ["tty0", "tty1", "tty9", "tty10", "i2c1"]);
}

#[test]
fn test_parse_errors() {
    assert_eq!(
        "uart0".parse::<DeviceName>(),
        Err(DeviceNameError::UnknownInterface("uart0".to_owned()))
    );
    assert_eq!(
        "tty".parse::<DeviceName>(),
        Err(DeviceNameError::MissingIndex("tty".to_owned()))
    );
    for bad in ["tty01", "tty-1", "tty+1", "ttyx", "tty99999999999"] {
        assert_eq!(
            bad.parse::<DeviceName>(),
            Err(DeviceNameError::InvalidIndex(bad.to_owned())),
            "{bad} should be rejected"
        );
    }
}

#[test]
fn test_parse_in_other_interface() {
    assert!(DeviceName::parse_in(Interface::Tty, "i2c0").is_err());
    assert_eq!(
        DeviceName::parse_in(Interface::Net, "net3"),
        Ok(DeviceName::new(Interface::Net, 3))
    );
}

#[test]
fn test_extern_name() {
    assert_eq!(DeviceName::new(Interface::Tty, 2).extern_name(), "ttyHWE2");
    assert_eq!(DeviceName::new(Interface::Net, 0).extern_name(), "hwenet0");
}

#[test]
fn test_parse_index() {
    assert_eq!(parse_index("0"), Some(0));
    assert_eq!(parse_index("42"), Some(42));
    assert_eq!(parse_index(""), None);
    assert_eq!(parse_index("007"), None);
}
