use std::time::Duration;

use vfi_campaign::{
    run, CampaignConfig, CancelToken, PowerSupply, RecoveryPolicy, ResultStore, SamplerKind,
    StopCause,
};
use vfi_core::errors::VfiError;
use vfi_core::{lookup, CampaignRecord, GlitchResultKind};
use vfi_link::{wire, DeviceLink, MockTransport};
use vfi_space::{ParameterRange, ParameterSpace};

#[derive(Default)]
struct MemStore {
    records: Vec<CampaignRecord>,
    runtime: f64,
    runtime_flushes: usize,
}

impl ResultStore for MemStore {
    fn append(&mut self, record: &CampaignRecord) -> Result<(), VfiError> {
        self.records.push(record.clone());
        Ok(())
    }

    fn add_runtime(&mut self, seconds: f64) -> Result<(), VfiError> {
        self.runtime += seconds;
        self.runtime_flushes += 1;
        Ok(())
    }
}

/// Store that raises the cancellation token once enough rows landed,
/// emulating an operator interrupt between iterations.
struct CancellingStore {
    inner: MemStore,
    token: CancelToken,
    after: usize,
}

impl ResultStore for CancellingStore {
    fn append(&mut self, record: &CampaignRecord) -> Result<(), VfiError> {
        self.inner.append(record)?;
        if self.inner.records.len() >= self.after {
            self.token.cancel();
        }
        Ok(())
    }

    fn add_runtime(&mut self, seconds: f64) -> Result<(), VfiError> {
        self.inner.add_runtime(seconds)
    }
}

#[derive(Default)]
struct MemPsu {
    switches: Vec<bool>,
}

impl PowerSupply for MemPsu {
    fn set_on(&mut self, on: bool) -> Result<(), VfiError> {
        self.switches.push(on);
        Ok(())
    }

    fn cycle_wait(&self) -> Duration {
        Duration::ZERO
    }
}

/// Four-point space: only ext_offset varies, every other parameter is
/// pinned, so attempts after the first re-send exactly one parameter.
fn four_point_space() -> ParameterSpace {
    ParameterSpace::new(
        ParameterRange::new(0, 30, 10).unwrap(),
        ParameterRange::fixed(50),
        ParameterRange::fixed(60),
        ParameterRange::fixed(70),
    )
}

fn fast_config(space: ParameterSpace) -> CampaignConfig {
    let mut config = CampaignConfig::new("cmp", space);
    config.sampler = SamplerKind::Exhaustive;
    config.skip_preflight = true;
    config.recovery = RecoveryPolicy {
        attempts: 15,
        delay_ms: 0,
        per_attempt_timeout_ms: 10,
    };
    config
}

fn cmp_link(mock: MockTransport) -> DeviceLink<MockTransport> {
    DeviceLink::new(mock, lookup("cmp").unwrap())
}

fn push_alive(mock: &mut MockTransport, fault_count: u32) {
    mock.push_reply(&[wire::RESULT_ALIVE]);
    mock.push_reply(&fault_count.to_le_bytes());
}

/// Connect ping plus the first attempt's four parameter acks.
fn first_attempt_preamble() -> MockTransport {
    let mut mock = MockTransport::new().reply(&[wire::PONG]);
    for _ in 0..4 {
        mock.push_reply(&[wire::RETURN_OK]);
    }
    mock
}

fn arm_count(written: &[u8]) -> usize {
    // Settings values in these tests never collide with the opcode.
    written.iter().filter(|byte| **byte == wire::CMD_ARM).count()
}

#[test]
fn steady_target_classifies_normal_and_never_recovers() {
    let mut mock = first_attempt_preamble();
    push_alive(&mut mock, 0);
    for _ in 0..3 {
        mock.push_reply(&[wire::RETURN_OK]);
        push_alive(&mut mock, 0);
    }

    let mut link = cmp_link(mock);
    let mut store = MemStore::default();
    let mut psu = MemPsu::default();
    let summary = run(
        &fast_config(four_point_space()),
        &mut link,
        &mut store,
        &mut psu,
        &CancelToken::new(),
    )
    .unwrap();

    assert_eq!(summary.iterations, 4);
    assert_eq!(summary.stop, StopCause::SpaceExhausted);
    assert_eq!(summary.counts.get("NORMAL"), Some(&4));
    assert_eq!(summary.counts.get("SUCCESS"), None);
    assert_eq!(store.records.len(), 4);
    assert!(store
        .records
        .iter()
        .all(|record| record.result == GlitchResultKind::Normal));
    assert!(psu.switches.is_empty(), "recovery must never trigger");
    assert_eq!(store.runtime_flushes, 1);
}

#[test]
fn reset_triggers_recovery_and_the_campaign_continues() {
    let mut mock = first_attempt_preamble();
    push_alive(&mut mock, 0);
    // Attempt 2.
    mock.push_reply(&[wire::RETURN_OK]);
    push_alive(&mut mock, 0);
    // Attempt 3 resets the target.
    mock.push_reply(&[wire::RETURN_OK]);
    mock.push_reply(&[wire::RESULT_RESET]);
    // Recovery: first target ping times out, the second answers.
    mock = mock.reply_timeout().reply(&[0x01]);
    // Attempt 4.
    mock.push_reply(&[wire::RETURN_OK]);
    push_alive(&mut mock, 0);

    let mut link = cmp_link(mock);
    let mut store = MemStore::default();
    let mut psu = MemPsu::default();
    let summary = run(
        &fast_config(four_point_space()),
        &mut link,
        &mut store,
        &mut psu,
        &CancelToken::new(),
    )
    .unwrap();

    assert_eq!(summary.iterations, 4);
    assert_eq!(store.records.len(), 4);
    assert_eq!(store.records[2].result, GlitchResultKind::Reset);
    assert_eq!(store.records[3].result, GlitchResultKind::Normal);
    // Exactly one power cycle: off then on.
    assert_eq!(psu.switches, vec![false, true]);
}

#[test]
fn cancellation_exits_cleanly_after_the_current_attempt() {
    let mut mock = first_attempt_preamble();
    push_alive(&mut mock, 0);
    for _ in 0..2 {
        mock.push_reply(&[wire::RETURN_OK]);
        push_alive(&mut mock, 0);
    }

    let token = CancelToken::new();
    let mut link = cmp_link(mock);
    let mut store = CancellingStore {
        inner: MemStore::default(),
        token: token.clone(),
        after: 3,
    };
    let mut psu = MemPsu::default();
    let summary = run(
        &fast_config(four_point_space()),
        &mut link,
        &mut store,
        &mut psu,
        &token,
    )
    .unwrap();

    assert_eq!(summary.stop, StopCause::Cancelled);
    assert_eq!(summary.iterations, 3);
    assert_eq!(store.inner.records.len(), 3);
    assert_eq!(store.inner.runtime_flushes, 1);
    assert!(store.inner.runtime >= 0.0);
    // Power supply switched off exactly once, nothing armed afterwards.
    assert_eq!(psu.switches, vec![false]);
    let written = link.transport_mut().take_written();
    assert_eq!(arm_count(&written), 3);
    assert!(link.transport().script_exhausted());
}

#[test]
fn exhausted_recovery_aborts_with_the_target_unresponsive() {
    let mut mock = first_attempt_preamble();
    mock.push_reply(&[wire::RESULT_RESET]);
    // No scripted ping answers: the target stays dead.

    let mut config = fast_config(four_point_space());
    config.recovery.attempts = 3;

    let mut link = cmp_link(mock);
    let mut store = MemStore::default();
    let mut psu = MemPsu::default();
    let err = run(&config, &mut link, &mut store, &mut psu, &CancelToken::new()).unwrap_err();

    assert!(matches!(err, VfiError::TargetUnresponsive(_)));
    // The reset attempt was persisted before recovery ran.
    assert_eq!(store.records.len(), 1);
    assert_eq!(store.records[0].result, GlitchResultKind::Reset);
    // Power cycle, then the fatal shutdown switches the supply off.
    assert_eq!(psu.switches, vec![false, true, false]);
    let written = link.transport_mut().take_written();
    assert_eq!(arm_count(&written), 1, "no further sampling after the abort");
}

#[test]
fn protocol_failures_abort_without_persisting_the_attempt() {
    // Four acks, then the probe goes silent instead of a status byte.
    let mock = first_attempt_preamble();

    let mut link = cmp_link(mock);
    let mut store = MemStore::default();
    let mut psu = MemPsu::default();
    let err = run(
        &fast_config(four_point_space()),
        &mut link,
        &mut store,
        &mut psu,
        &CancelToken::new(),
    )
    .unwrap_err();

    assert!(matches!(err, VfiError::Protocol(_)));
    assert!(store.records.is_empty());
    assert_eq!(store.runtime_flushes, 0);
    assert_eq!(psu.switches, vec![false]);
}

#[test]
fn success_with_the_stop_flag_ends_the_campaign_early() {
    let mut mock = first_attempt_preamble();
    push_alive(&mut mock, 3);

    let mut config = fast_config(four_point_space());
    config.stop.on_success = true;
    // Success is not in the default trigger set, so no recovery either.

    let mut link = cmp_link(mock);
    let mut store = MemStore::default();
    let mut psu = MemPsu::default();
    let summary = run(&config, &mut link, &mut store, &mut psu, &CancelToken::new()).unwrap();

    assert_eq!(summary.stop, StopCause::EarlyStop(GlitchResultKind::Success));
    assert_eq!(summary.iterations, 1);
    assert_eq!(store.records.len(), 1);
    assert_eq!(store.records[0].result, GlitchResultKind::Success);
    assert!(psu.switches.is_empty(), "target left as-is on early stop");
}

#[test]
fn mismatched_link_profile_is_rejected() {
    let mut config = fast_config(four_point_space());
    config.op_name = "mul".to_string();

    let mut link = cmp_link(MockTransport::new());
    let mut store = MemStore::default();
    let mut psu = MemPsu::default();
    let err = run(&config, &mut link, &mut store, &mut psu, &CancelToken::new()).unwrap_err();

    match err {
        VfiError::Config(info) => assert_eq!(info.code, "campaign.profile_mismatch"),
        other => panic!("expected Config, got {other:?}"),
    }
}

#[test]
fn infeasible_space_stops_an_infinite_campaign_before_sampling() {
    // 740mV prep drop against a 10us ext_offset budget.
    let space = ParameterSpace::new(
        ParameterRange::new(0, 10, 1).unwrap(),
        ParameterRange::new(200, 500, 100).unwrap(),
        ParameterRange::fixed(60),
        ParameterRange::fixed(1),
    );
    let mut config = fast_config(space);
    config.sampler = SamplerKind::Infinite;

    let mut link = cmp_link(MockTransport::new());
    let mut store = MemStore::default();
    let mut psu = MemPsu::default();
    let err = run(&config, &mut link, &mut store, &mut psu, &CancelToken::new()).unwrap_err();

    assert!(matches!(err, VfiError::Infeasible(_)));
    assert!(store.records.is_empty());
}
