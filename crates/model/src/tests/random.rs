use hwemu_primitives::Revision;

use super::*;
use crate::canonical::{equal, serialize};
use crate::render::{render_ini, SectionStyle};
use crate::validate::load_str;

#[test]
fn test_generated_configs_validate() {
    for revision in Revision::ALL {
        let profile = revision.profile();

        for seed in 0..60 {
            let config = random_config(profile, seed);
            let text = render_ini(&config, SectionStyle::DeviceName);

            let back = load_str(profile, "generated", &text)
                .unwrap_or_else(|err| panic!("{revision} seed {seed}: {err}"));
            assert!(equal(&config, &back));
        }
    }
}

#[test]
fn test_full_profile_limits_validate() {
    let profile = Profile::VCPSIM;

    for seed in 0..10 {
        let config = ConfigGenerator::from_seed(profile, seed)
            .with_limits(profile.limits)
            .unwrap()
            .generate();
        let text = render_ini(&config, SectionStyle::DeviceName);

        assert!(load_str(profile, "generated", &text).is_ok(), "seed {seed}");
    }
}

#[test]
fn test_shape_within_limits() {
    let profile = Profile::HWEMU;
    let mut generator = ConfigGenerator::from_seed(profile, 7);
    let limits = *generator.limits();

    for _ in 0..20 {
        let config = generator.generate();

        for (_, devices) in config.interfaces() {
            assert!((1..=limits.max_devices).contains(&devices.len()));
            assert!(devices.is_contiguous());

            for device in devices.iter() {
                assert!(device.len() <= limits.max_pairs);
                for pair in device.pairs() {
                    assert!((1..=limits.max_request).contains(&pair.request().len()));
                    assert!((1..=limits.max_response).contains(&pair.response().len()));
                }
            }
        }
    }
}

#[test]
fn test_requests_unique_across_config() {
    let config = random_config(Profile::HWEMU, 42);

    let mut seen = HashSet::new();
    for device in config.devices() {
        for pair in device.pairs() {
            assert!(seen.insert(pair.request().to_vec()));
        }
    }
}

#[test]
fn test_seed_is_deterministic() {
    let a = random_config(Profile::HWEMU, 1234);
    let b = random_config(Profile::HWEMU, 1234);
    let c = random_config(Profile::HWEMU, 1235);

    assert_eq!(serialize(&a), serialize(&b));
    assert_ne!(serialize(&a), serialize(&c));
}

#[test]
fn test_extern_names() {
    let config = ConfigGenerator::from_seed(Profile::HWEMU, 3)
        .with_extern_names(true)
        .generate();

    for device in config.devices() {
        assert_eq!(
            device.extern_name(),
            Some(device.name().extern_name().as_str())
        );
    }
}

#[test]
fn test_with_limits_rejects_bad_limits() {
    let profile = Profile::VCPSIM;
    let limits = |f: fn(&mut Limits)| {
        let mut limits = default_limits(&profile);
        f(&mut limits);
        ConfigGenerator::from_seed(profile, 0).with_limits(limits).map(|_| ())
    };

    assert_eq!(
        limits(|l| l.max_request = 65),
        Err(GeneratorError::ExceedsProfile {
            field: "max_request",
            value: 65,
            max: 64,
            module: "vcpsim",
        })
    );
    assert_eq!(
        limits(|l| l.max_devices = 0),
        Err(GeneratorError::Zero {
            field: "max_devices"
        })
    );
    assert_eq!(
        limits(|l| l.min_pairs = 16),
        Err(GeneratorError::InvertedPairRange { min: 16, max: 15 })
    );
    assert!(matches!(
        limits(|l| {
            l.max_request = 1;
            l.max_devices = 8;
        }),
        Err(GeneratorError::RequestSpace { available: 256, .. })
    ));
    assert_eq!(limits(|_| {}), Ok(()));
}

#[test]
fn test_default_limits() {
    assert_eq!(default_limits(&Profile::HWEMU), DEFAULT_CAP);

    let vcpsim = default_limits(&Profile::VCPSIM);
    assert_eq!(vcpsim.max_pairs, 15);
    assert_eq!(vcpsim.max_devices, 4);
}
