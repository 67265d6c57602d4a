use std::time::Duration;

use vfi_core::errors::VfiError;
use vfi_core::{lookup, GlitchResultKind, GlitchSettings, ResultPayload, TargetProfile};
use vfi_link::{wire, DeviceLink, MockTransport};

fn settings() -> GlitchSettings {
    GlitchSettings {
        ext_offset: 5,
        width: 6,
        voltage: 7,
        prep_voltage: 8,
    }
}

/// Script covering the connect ping and the four parameter acks that precede
/// the first arming of a fresh link.
fn armed_mock() -> MockTransport {
    MockTransport::new()
        .reply(&[wire::PONG])
        .reply(&[wire::RETURN_OK])
        .reply(&[wire::RETURN_OK])
        .reply(&[wire::RETURN_OK])
        .reply(&[wire::RETURN_OK])
}

fn mul_link(mock: MockTransport) -> DeviceLink<MockTransport> {
    DeviceLink::new(mock, lookup("mul").unwrap())
}

fn cmp_link(mock: MockTransport) -> DeviceLink<MockTransport> {
    DeviceLink::new(mock, lookup("cmp").unwrap())
}

#[test]
fn unreachable_and_pmic_failures_classify_as_broken() {
    for status in [wire::RESULT_UNREACHABLE, wire::RESULT_PMIC_FAIL] {
        let mut link = cmp_link(armed_mock().reply(&[status]));
        let (kind, payload) = link.arm_and_read(&settings()).unwrap();
        assert_eq!(kind, GlitchResultKind::Broken);
        assert_eq!(payload, Some(ResultPayload::Raw(vec![status])));
    }
}

#[test]
fn reset_classifies_without_payload() {
    let mut link = cmp_link(armed_mock().reply(&[wire::RESULT_RESET]));
    let (kind, payload) = link.arm_and_read(&settings()).unwrap();
    assert_eq!(kind, GlitchResultKind::Reset);
    assert_eq!(payload, None);
}

#[test]
fn alive_with_zero_fault_count_is_normal() {
    let mut words = vec![wire::RESULT_ALIVE];
    for value in [0u32, 17, 17] {
        words.extend_from_slice(&value.to_le_bytes());
    }
    let mut link = mul_link(armed_mock().reply(&words));
    let (kind, payload) = link.arm_and_read(&settings()).unwrap();
    assert_eq!(kind, GlitchResultKind::Normal);
    assert_eq!(payload, Some(ResultPayload::Words(vec![0, 17, 17])));
}

#[test]
fn alive_with_faults_is_success() {
    let mut words = vec![wire::RESULT_ALIVE];
    for value in [3u32, 17, 21] {
        words.extend_from_slice(&value.to_le_bytes());
    }
    let mut link = mul_link(armed_mock().reply(&words));
    let (kind, payload) = link.arm_and_read(&settings()).unwrap();
    assert_eq!(kind, GlitchResultKind::Success);
    assert_eq!(payload, Some(ResultPayload::Words(vec![3, 17, 21])));
}

#[test]
fn alive_underrun_is_a_protocol_error() {
    // Three words promised, one and a half delivered.
    let mut words = vec![wire::RESULT_ALIVE];
    words.extend_from_slice(&7u32.to_le_bytes());
    words.extend_from_slice(&[0xaa, 0xbb]);
    let mut link = mul_link(armed_mock().reply(&words));
    assert!(matches!(
        link.arm_and_read(&settings()),
        Err(VfiError::Protocol(_))
    ));
}

#[test]
fn data_timeout_is_weird_without_payload() {
    let mut link = cmp_link(armed_mock().reply(&[wire::RESULT_DATA_TIMEOUT]));
    let (kind, payload) = link.arm_and_read(&settings()).unwrap();
    assert_eq!(kind, GlitchResultKind::Weird);
    assert_eq!(payload, None);
}

#[test]
fn zombie_carries_its_marker_byte() {
    let mut link = cmp_link(armed_mock().reply(&[wire::RESULT_ZOMBIE, 0x42]));
    let (kind, payload) = link.arm_and_read(&settings()).unwrap();
    assert_eq!(kind, GlitchResultKind::Weird);
    assert_eq!(payload, Some(ResultPayload::Raw(vec![0x42])));
}

#[test]
fn zombie_without_marker_is_a_protocol_error() {
    let mut link = cmp_link(armed_mock().reply(&[wire::RESULT_ZOMBIE]));
    assert!(matches!(
        link.arm_and_read(&settings()),
        Err(VfiError::Protocol(_))
    ));
}

#[test]
fn control_code_payload_is_drained() {
    let mut link = cmp_link(
        armed_mock()
            .reply(&[wire::RESULT_ANSI_CTRL_CODE])
            .reply(&[0x1b, b'[', b'2', b'J']),
    );
    let (kind, payload) = link.arm_and_read(&settings()).unwrap();
    assert_eq!(kind, GlitchResultKind::Weird);
    assert_eq!(payload, Some(ResultPayload::Raw(vec![0x1b, b'[', b'2', b'J'])));
}

#[test]
fn unknown_status_bytes_are_weird_with_the_raw_byte() {
    let mut link = cmp_link(armed_mock().reply(&[0x99]));
    let (kind, payload) = link.arm_and_read(&settings()).unwrap();
    assert_eq!(kind, GlitchResultKind::Weird);
    assert_eq!(payload, Some(ResultPayload::Raw(vec![0x99])));
}

#[test]
fn missing_status_byte_is_a_protocol_error() {
    let mut link = cmp_link(armed_mock());
    assert!(matches!(
        link.arm_and_read(&settings()),
        Err(VfiError::Protocol(_))
    ));
}

#[test]
fn unanswered_connect_ping_fails_the_attempt() {
    let mut link = cmp_link(MockTransport::new());
    let err = link.arm_and_read(&settings()).unwrap_err();
    match err {
        VfiError::Protocol(info) => assert_eq!(info.code, "link.unreachable"),
        other => panic!("expected Protocol, got {other:?}"),
    }
}

#[test]
fn arm_frame_carries_the_return_value_count() {
    let mut link = mul_link(armed_mock().reply(&[wire::RESULT_RESET]));
    link.arm_and_read(&settings()).unwrap();
    let written = link_written(&mut link);
    let arm_at = written
        .windows(2)
        .position(|pair| pair == [wire::CMD_ARM, 3])
        .expect("arm frame with count 3");
    assert!(arm_at > 0);
}

fn link_written(link: &mut DeviceLink<MockTransport>) -> Vec<u8> {
    // The mock transport is only reachable through the written log helper.
    link.transport_mut().take_written()
}

static WIDE_NAMES: [&str; 300] = ["v"; 300];

fn never(_: &[u32]) -> bool {
    false
}

static WIDE_PROFILE: TargetProfile = TargetProfile {
    op_name: "wide",
    return_values: &WIDE_NAMES,
    is_slow: false,
    success: never,
};

#[test]
fn oversized_return_counts_are_a_config_error() {
    let mock = armed_mock();
    let mut link = DeviceLink::new(mock, &WIDE_PROFILE);
    assert!(matches!(
        link.arm_and_read(&settings()),
        Err(VfiError::Config(_))
    ));
}

#[test]
fn second_attempt_skips_the_connect_ping() {
    let mut mock = armed_mock().reply(&[wire::RESULT_RESET]);
    // Second attempt with identical settings: no setter traffic either.
    mock.push_reply(&[wire::RESULT_RESET]);
    let mut link = cmp_link(mock);

    link.arm_and_read(&settings()).unwrap();
    link_written(&mut link);

    link.arm_and_read(&settings()).unwrap();
    let written = link_written(&mut link);
    assert_eq!(written, vec![wire::CMD_ARM, 1]);
}

#[test]
fn attempt_timing_does_not_disturb_the_default_timeout() {
    use vfi_link::Transport;

    let mut link = cmp_link(armed_mock().reply(&[wire::RESULT_RESET]));
    link.arm_and_read(&settings()).unwrap();
    assert_eq!(link.transport().timeout(), Duration::from_secs(1));
}
