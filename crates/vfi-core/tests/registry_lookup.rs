use vfi_core::errors::VfiError;
use vfi_core::{lookup, op_names, GlitchParam};

#[test]
fn every_registered_target_resolves() {
    for name in op_names() {
        let profile = lookup(name).unwrap();
        assert_eq!(profile.op_name, name);
        assert!(profile.return_count() >= 1);
        assert_eq!(profile.return_values[0], "fault_count");
    }
}

#[test]
fn return_value_arities_match_firmware_variants() {
    assert_eq!(lookup("mul").unwrap().return_count(), 3);
    assert_eq!(lookup("load").unwrap().return_count(), 2);
    assert_eq!(lookup("cmp").unwrap().return_count(), 1);
    assert_eq!(lookup("rdrand-sub").unwrap().return_count(), 1);
}

#[test]
fn only_the_microcode_target_is_slow() {
    for name in op_names() {
        let profile = lookup(name).unwrap();
        assert_eq!(profile.is_slow, name == "ucode", "profile {name}");
    }
}

#[test]
fn success_requires_a_positive_fault_count() {
    let profile = lookup("mul").unwrap();
    assert!(profile.is_success(&[1, 7, 9]));
    assert!(!profile.is_success(&[0, 7, 9]));
    assert!(!profile.is_success(&[]));
}

#[test]
fn unknown_target_is_rejected() {
    let err = lookup("rop-chain").unwrap_err();
    match err {
        VfiError::UnknownTarget(info) => {
            assert_eq!(info.context.get("op_name").map(String::as_str), Some("rop-chain"));
        }
        other => panic!("expected UnknownTarget, got {other:?}"),
    }
}

#[test]
fn parameter_names_round_trip() {
    for param in GlitchParam::ALL {
        assert_eq!(GlitchParam::from_name(param.as_str()).unwrap(), param);
    }
    assert!(matches!(
        GlitchParam::from_name("slew"),
        Err(VfiError::UnknownParameter(_))
    ));
}
