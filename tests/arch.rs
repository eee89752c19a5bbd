use velocitas_components::arch::{conan_arch, profile_name, valid_arch};
use velocitas_components::Error;

#[test]
fn aliases_map_onto_toolchain_names() {
    for (input, expected) in [
        ("x86_64", "x86_64"),
        ("amd64", "x86_64"),
        ("x86_64-linux-gnu", "x86_64"),
        ("aarch64", "aarch64"),
        ("arm64", "aarch64"),
    ] {
        assert_eq!(valid_arch(input).unwrap(), expected, "input {input}");
    }
}

#[test]
fn unknown_architectures_are_rejected() {
    for input in ["riscv64", "armv7l", ""] {
        assert!(
            matches!(valid_arch(input), Err(Error::UnsupportedArchitecture(_))),
            "input {input:?}"
        );
    }
}

#[test]
fn conan_names() {
    assert_eq!(conan_arch("x86_64").unwrap(), "x86_64");
    assert_eq!(conan_arch("aarch64").unwrap(), "armv8");
    assert_eq!(conan_arch("arm64").unwrap(), "armv8");
    assert_eq!(conan_arch("armv7").unwrap(), "armv7");
    assert!(conan_arch("amd64").is_err());
}

#[test]
fn profile_names_use_normalised_arch() {
    assert_eq!(profile_name("amd64", "release").unwrap(), "linux_x86_64_release");
    assert_eq!(profile_name("arm64", "debug").unwrap(), "linux_aarch64_debug");
}
