//! Byte-level protocol constants for the glitch probe.
//!
//! One byte is one opcode; multi-byte payloads are little-endian and their
//! width is fixed per command.

/// Arm the glitch handler; followed by one byte giving the expected
/// return-value count.
pub const CMD_ARM: u8 = 0x20;

/// Set the glitch voltage VID (+1 byte).
pub const CMD_SET_VOLTAGE: u8 = 0x31;
/// Set the trigger-to-glitch delay in us (+4 bytes).
pub const CMD_SET_EXT_OFFSET: u8 = 0x32;
/// Set the glitch width in us (+4 bytes).
pub const CMD_SET_WIDTH: u8 = 0x33;
/// Set the preparation voltage VID (+1 byte).
pub const CMD_SET_PREP_VOLTAGE: u8 = 0x34;

/// Host-to-probe liveness check.
pub const CMD_PING: u8 = 0x70;
/// Probe-to-target liveness check.
pub const CMD_TARGET_PING: u8 = 0x71;
/// Probe-to-target liveness check for slow targets.
pub const CMD_TARGET_PING_SLOW: u8 = 0x72;
/// Measure the duration of the target's opcode loop in us.
pub const CMD_MEASURE_LOOP_DURATION: u8 = 0x76;
/// Toggle the probe's debug pin on UART activity.
pub const CMD_UART_TOGGLE_DEBUG_PIN: u8 = 0x77;

/// Target reset during the glitch.
pub const RESULT_RESET: u8 = 0x50;
/// Target is alive; N little-endian 32-bit words follow.
pub const RESULT_ALIVE: u8 = 0x51;
/// Target neither alive nor reset; one marker byte follows.
pub const RESULT_ZOMBIE: u8 = 0x52;
/// Target alive but did not finish sending data back.
pub const RESULT_DATA_TIMEOUT: u8 = 0x53;
/// Target unreachable when arming; no trigger received.
pub const RESULT_UNREACHABLE: u8 = 0x54;
/// Probe could not send the voltage command to the PMIC.
pub const RESULT_PMIC_FAIL: u8 = 0x55;
/// Target pushed an ANSI control code; raw data follows.
pub const RESULT_ANSI_CTRL_CODE: u8 = 0x56;

/// Parameter command accepted.
pub const RETURN_OK: u8 = 0x61;
/// Parameter command rejected.
pub const RETURN_KO: u8 = 0x62;
/// Response to [`CMD_PING`].
pub const PONG: u8 = 0x63;
