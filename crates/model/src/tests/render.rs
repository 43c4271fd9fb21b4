use hwemu_primitives::Profile;

use super::*;
use crate::canonical::equal;
use crate::random::ConfigGenerator;
use crate::validate::load_str;

#[test]
fn test_render_device_names() {
    let config = load_str(
        Profile::HWEMU,
        "in",
        "[tty1]\n\"hi\"=ff\n[tty0]\n01=02\n03=04\n[spi0]\n",
    )
    .unwrap();

    assert_eq!(
        render_ini(&config, SectionStyle::DeviceName),
        "[tty0]\n01=02\n03=04\n\n[tty1]\n6869=ff\n\n[spi0]\n"
    );
}

#[test]
fn test_render_extern_names() {
    let config = load_str(Profile::HWEMU, "in", "[hwei2c0]\n01=02\n[tty0]\n05=06\n").unwrap();

    assert_eq!(
        render_ini(&config, SectionStyle::ExternName),
        "[ttyHWE0]\n05=06\n\n[hwei2c0]\n01=02\n"
    );
}

#[test]
fn test_render_validates_back() {
    for seed in 0..20 {
        for style in [SectionStyle::DeviceName, SectionStyle::ExternName] {
            let config = ConfigGenerator::from_seed(Profile::VCPSIM, seed)
                .with_extern_names(true)
                .generate();

            let text = render_ini(&config, style);
            let back = load_str(Profile::VCPSIM, "rendered", &text).unwrap();

            assert!(equal(&config, &back), "seed {seed}:\n{text}");
        }
    }
}
