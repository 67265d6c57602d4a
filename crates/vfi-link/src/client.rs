//! Protocol client for the glitch probe device.

use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use vfi_core::errors::{ErrorInfo, VfiError};
use vfi_core::{GlitchParam, GlitchResultKind, GlitchSettings, ResultPayload, TargetProfile};

use crate::transport::Transport;
use crate::wire;

// The probe waits for several trigger periods before answering a loop
// duration request, and holds target data for a while after a control code.
const LOOP_MEASURE_TIMEOUT: Duration = Duration::from_secs(2);
const ANSI_DRAIN_SETTLE: Duration = Duration::from_secs(2);
const ANSI_DRAIN_TIMEOUT: Duration = Duration::from_millis(200);

/// Protocol client owning the serial connection to the probe.
///
/// One link instance serves one campaign: it is bound to a single target
/// profile and keeps the last value written for each device parameter so
/// unchanged values are not re-sent. The device offers no read-back
/// commands, so a parameter is unknown until the first write.
pub struct DeviceLink<T: Transport> {
    transport: T,
    profile: &'static TargetProfile,
    ext_offset: Option<u32>,
    width: Option<u32>,
    voltage: Option<u8>,
    prep_voltage: Option<u8>,
    connected: bool,
}

impl<T: Transport> DeviceLink<T> {
    /// Creates a link over `transport` for the given target profile.
    pub fn new(transport: T, profile: &'static TargetProfile) -> Self {
        Self {
            transport,
            profile,
            ext_offset: None,
            width: None,
            voltage: None,
            prep_voltage: None,
            connected: false,
        }
    }

    /// Target profile this link was configured with.
    pub fn profile(&self) -> &'static TargetProfile {
        self.profile
    }

    /// Underlying transport, for diagnostics.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the underlying transport.
    ///
    /// Bypassing the link invalidates its parameter cache; call
    /// [`DeviceLink::clear_cache`] after writing to the device directly.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Last value applied to `param`.
    ///
    /// Fails with [`VfiError::NotSupported`] while the value is unknown:
    /// parameters are write-only on the wire.
    pub fn cached(&self, param: GlitchParam) -> Result<u32, VfiError> {
        let value = match param {
            GlitchParam::ExtOffset => self.ext_offset,
            GlitchParam::Width => self.width,
            GlitchParam::Voltage => self.voltage.map(u32::from),
            GlitchParam::PrepVoltage => self.prep_voltage.map(u32::from),
        };
        value.ok_or_else(|| {
            VfiError::NotSupported(
                ErrorInfo::new(
                    "link.read_back",
                    format!("{} cannot be read from the device", param.as_str()),
                )
                .with_hint("the probe has no read-back command; values are known only after the first write"),
            )
        })
    }

    /// Forgets the cached parameter values, forcing the next apply to
    /// re-send every field.
    pub fn clear_cache(&mut self) {
        self.ext_offset = None;
        self.width = None;
        self.voltage = None;
        self.prep_voltage = None;
    }

    /// Applies `value` to `param`, skipping the write when it matches the
    /// cached last-applied value.
    pub fn set_parameter(&mut self, param: GlitchParam, value: u32) -> Result<(), VfiError> {
        match param {
            GlitchParam::ExtOffset => {
                if self.ext_offset == Some(value) {
                    return Ok(());
                }
                self.send_set_u32(wire::CMD_SET_EXT_OFFSET, param, value)?;
                self.ext_offset = Some(value);
            }
            GlitchParam::Width => {
                if self.width == Some(value) {
                    return Ok(());
                }
                self.send_set_u32(wire::CMD_SET_WIDTH, param, value)?;
                self.width = Some(value);
            }
            GlitchParam::Voltage => {
                let vid = vid_byte(param, value)?;
                if self.voltage == Some(vid) {
                    return Ok(());
                }
                self.send_set_u8(wire::CMD_SET_VOLTAGE, param, vid)?;
                self.voltage = Some(vid);
            }
            GlitchParam::PrepVoltage => {
                let vid = vid_byte(param, value)?;
                if self.prep_voltage == Some(vid) {
                    return Ok(());
                }
                self.send_set_u8(wire::CMD_SET_PREP_VOLTAGE, param, vid)?;
                self.prep_voltage = Some(vid);
            }
        }
        Ok(())
    }

    /// Pings the probe; true iff PONG arrives within the timeout. No retry.
    pub fn ping(&mut self) -> Result<bool, VfiError> {
        self.transport.clear_input()?;
        self.transport.write_all(&[wire::CMD_PING])?;
        Ok(self.read_byte()? == Some(wire::PONG))
    }

    /// Asks the probe to ping the target, with bounded retries.
    ///
    /// The probe gives the core voltage time to ramp back up after a reset,
    /// so each attempt runs under `per_attempt_timeout`; the link's previous
    /// timeout is restored before returning. Slow targets (long-running
    /// loops such as microcode updates) use the slow ping variant.
    pub fn ping_target(
        &mut self,
        attempts: u32,
        delay: Duration,
        per_attempt_timeout: Duration,
    ) -> Result<bool, VfiError> {
        let cmd = if self.profile.is_slow {
            wire::CMD_TARGET_PING_SLOW
        } else {
            wire::CMD_TARGET_PING
        };
        self.with_timeout(per_attempt_timeout, |link| {
            for attempt in 0..attempts {
                link.transport.clear_input()?;
                link.transport.write_all(&[cmd])?;
                if let Some(byte) = link.read_byte()? {
                    if byte != 0 {
                        debug!(attempt, "target answered ping");
                        return Ok(true);
                    }
                }
                if attempt + 1 < attempts {
                    thread::sleep(delay);
                }
            }
            Ok(false)
        })
    }

    /// Measures the target's opcode loop duration in microseconds.
    ///
    /// The caller validates the value against its configured ranges;
    /// negative readings mean the probe saw no stable trigger period.
    pub fn measure_loop_duration(&mut self) -> Result<i32, VfiError> {
        self.with_timeout(LOOP_MEASURE_TIMEOUT, |link| {
            link.transport.clear_input()?;
            link.transport.write_all(&[wire::CMD_MEASURE_LOOP_DURATION])?;
            let mut raw = [0u8; 4];
            if !link.read_exact(&mut raw)? {
                return Err(VfiError::Protocol(ErrorInfo::new(
                    "link.loop_duration",
                    "no data after loop duration request",
                )));
            }
            Ok(i32::from_le_bytes(raw))
        })
    }

    /// Toggles the probe's debug pin on UART activity, for latency
    /// measurements with a scope.
    pub fn uart_toggle_debug_pin(&mut self) -> Result<(), VfiError> {
        self.transport.clear_input()?;
        self.transport
            .write_all(&[wire::CMD_UART_TOGGLE_DEBUG_PIN])?;
        match self.read_byte()? {
            None => Err(VfiError::Protocol(ErrorInfo::new(
                "link.debug_pin",
                "no response toggling debug pin",
            ))),
            Some(0) => Err(VfiError::Protocol(ErrorInfo::new(
                "link.debug_pin",
                "debug pin toggle rejected",
            ))),
            Some(_) => Ok(()),
        }
    }

    /// Arms the probe with `settings` and classifies the outcome.
    ///
    /// Applies the settings (write-coalesced, fixed field order), arms, and
    /// decodes the status byte into a [`GlitchResultKind`] plus optional
    /// payload. Classifications are data; only missing or truncated device
    /// responses are errors, and those abort the call without retry.
    pub fn arm_and_read(
        &mut self,
        settings: &GlitchSettings,
    ) -> Result<(GlitchResultKind, Option<ResultPayload>), VfiError> {
        self.ensure_connected()?;
        self.apply_settings(settings)?;

        let ret_count = self.profile.return_count();
        let ret_count_byte = u8::try_from(ret_count).map_err(|_| {
            VfiError::Config(
                ErrorInfo::new(
                    "link.return_count",
                    format!(
                        "profile {} declares {ret_count} return values, wire limit is 255",
                        self.profile.op_name
                    ),
                )
                .with_context("op_name", self.profile.op_name),
            )
        })?;

        self.transport.clear_input()?;
        self.transport.write_all(&[wire::CMD_ARM, ret_count_byte])?;

        let status = self.read_byte()?.ok_or_else(|| {
            VfiError::Protocol(ErrorInfo::new(
                "link.arm_status",
                "no status byte after arming",
            ))
        })?;

        match status {
            wire::RESULT_UNREACHABLE | wire::RESULT_PMIC_FAIL => {
                warn!(status, "attempt broken");
                Ok((
                    GlitchResultKind::Broken,
                    Some(ResultPayload::Raw(vec![status])),
                ))
            }
            wire::RESULT_RESET => Ok((GlitchResultKind::Reset, None)),
            wire::RESULT_ALIVE => {
                let mut values = Vec::with_capacity(ret_count);
                for name in self.profile.return_values {
                    let mut raw = [0u8; 4];
                    if !self.read_exact(&mut raw)? {
                        return Err(VfiError::Protocol(
                            ErrorInfo::new(
                                "link.return_value",
                                format!("missing return value {name}"),
                            )
                            .with_context("received", values.len().to_string())
                            .with_context("expected", ret_count.to_string()),
                        ));
                    }
                    values.push(u32::from_le_bytes(raw));
                }
                let kind = if self.profile.is_success(&values) {
                    GlitchResultKind::Success
                } else {
                    GlitchResultKind::Normal
                };
                Ok((kind, Some(ResultPayload::Words(values))))
            }
            wire::RESULT_DATA_TIMEOUT => Ok((GlitchResultKind::Weird, None)),
            wire::RESULT_ZOMBIE => {
                let marker = self.read_byte()?.ok_or_else(|| {
                    VfiError::Protocol(ErrorInfo::new(
                        "link.zombie_marker",
                        "missing marker byte after zombie status",
                    ))
                })?;
                Ok((
                    GlitchResultKind::Weird,
                    Some(ResultPayload::Raw(vec![marker])),
                ))
            }
            wire::RESULT_ANSI_CTRL_CODE => {
                let data = self.drain_control_data()?;
                Ok((GlitchResultKind::Weird, Some(ResultPayload::Raw(data))))
            }
            other => Ok((
                GlitchResultKind::Weird,
                Some(ResultPayload::Raw(vec![other])),
            )),
        }
    }

    fn ensure_connected(&mut self) -> Result<(), VfiError> {
        if self.connected {
            return Ok(());
        }
        if !self.ping()? {
            return Err(VfiError::Protocol(
                ErrorInfo::new("link.unreachable", "probe did not answer ping")
                    .with_hint("check the probe's USB connection and firmware"),
            ));
        }
        self.connected = true;
        Ok(())
    }

    fn apply_settings(&mut self, settings: &GlitchSettings) -> Result<(), VfiError> {
        for param in GlitchParam::ALL {
            self.set_parameter(param, settings.value(param))?;
        }
        Ok(())
    }

    fn send_set_u32(&mut self, cmd: u8, param: GlitchParam, value: u32) -> Result<(), VfiError> {
        self.transport.clear_input()?;
        let mut frame = [0u8; 5];
        frame[0] = cmd;
        frame[1..].copy_from_slice(&value.to_le_bytes());
        self.transport.write_all(&frame)?;
        self.read_set_ack(param)
    }

    fn send_set_u8(&mut self, cmd: u8, param: GlitchParam, value: u8) -> Result<(), VfiError> {
        self.transport.clear_input()?;
        self.transport.write_all(&[cmd, value])?;
        self.read_set_ack(param)
    }

    fn read_set_ack(&mut self, param: GlitchParam) -> Result<(), VfiError> {
        let ack = self.read_byte()?.ok_or_else(|| {
            VfiError::Protocol(ErrorInfo::new(
                "link.set_ack",
                format!("no response setting {}", param.as_str()),
            ))
        })?;
        if ack == wire::RETURN_OK {
            return Ok(());
        }
        // A rejection may carry a human readable reason line.
        let reason = self.read_reason_line()?;
        let mut info = ErrorInfo::new(
            "link.set_rejected",
            format!("could not set {}", param.as_str()),
        )
        .with_context("ack", format!("{ack:#04x}"));
        if !reason.is_empty() {
            info = info.with_context("reason", reason);
        }
        Err(VfiError::Protocol(info))
    }

    fn read_reason_line(&mut self) -> Result<String, VfiError> {
        let mut raw = Vec::new();
        while let Some(byte) = self.read_byte()? {
            if byte == b'\n' {
                break;
            }
            raw.push(byte);
        }
        Ok(String::from_utf8_lossy(&raw).trim().to_string())
    }

    fn drain_control_data(&mut self) -> Result<Vec<u8>, VfiError> {
        // Give the probe time to pull the data out of the target first.
        thread::sleep(ANSI_DRAIN_SETTLE);
        self.with_timeout(ANSI_DRAIN_TIMEOUT, |link| {
            let mut data = Vec::new();
            while let Some(byte) = link.read_byte()? {
                data.push(byte);
            }
            Ok(data)
        })
    }

    fn read_byte(&mut self) -> Result<Option<u8>, VfiError> {
        let mut buf = [0u8; 1];
        let count = self.transport.read(&mut buf)?;
        Ok((count == 1).then_some(buf[0]))
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<bool, VfiError> {
        let mut filled = 0;
        while filled < buf.len() {
            let count = self.transport.read(&mut buf[filled..])?;
            if count == 0 {
                return Ok(false);
            }
            filled += count;
        }
        Ok(true)
    }

    /// Runs `op` under a temporary timeout, restoring the previous one on
    /// every exit path.
    fn with_timeout<R>(
        &mut self,
        timeout: Duration,
        op: impl FnOnce(&mut Self) -> Result<R, VfiError>,
    ) -> Result<R, VfiError> {
        let saved = self.transport.timeout();
        self.transport.set_timeout(timeout)?;
        let outcome = op(self);
        self.transport.set_timeout(saved)?;
        outcome
    }
}

fn vid_byte(param: GlitchParam, value: u32) -> Result<u8, VfiError> {
    u8::try_from(value).map_err(|_| {
        VfiError::Config(
            ErrorInfo::new(
                "link.vid_range",
                format!("{} VID {value} does not fit one byte", param.as_str()),
            )
            .with_context("value", value.to_string()),
        )
    })
}
