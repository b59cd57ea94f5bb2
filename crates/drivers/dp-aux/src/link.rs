//! Link training decode helpers.
//!
//! Pure functions over the link status block (DPCD 0x202-0x207) and the
//! receiver capability block (DPCD 0x000-0x00e). Nothing here touches the
//! AUX channel except the `wait_*` helpers, which only sleep.

use core::time::Duration;

use bitflags::bitflags;

use crate::delay::Delay;
use crate::regs;

/// DPCD 0x202-0x207 as read by [`AuxChannel::read_link_status`](crate::AuxChannel::read_link_status).
pub type LinkStatus = [u8; regs::LINK_STATUS_SIZE];

/// DPCD 0x000-0x00e.
pub type ReceiverCaps = [u8; regs::RECEIVER_CAP_SIZE];

/// Data rate of one lane in 10 kbps units per bandwidth code.
pub const LINK_RATE_UNIT: u32 = 27_000;

const MAX_LANES: u8 = 4;

bitflags! {
    /// Per-lane status nibble from LANEx_y_STATUS.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LaneStatus: u8 {
        const CR_DONE = 1 << 0;
        const CHANNEL_EQ_DONE = 1 << 1;
        const SYMBOL_LOCKED = 1 << 2;
        /// Everything channel equalization needs.
        const CHANNEL_EQ_BITS = Self::CR_DONE.bits()
            | Self::CHANNEL_EQ_DONE.bits()
            | Self::SYMBOL_LOCKED.bits();
    }
}

fn status_byte(link_status: &LinkStatus, reg: u32) -> u8 {
    link_status[(reg - regs::LANE0_1_STATUS) as usize]
}

/// Status nibble of `lane`, two lanes packed per byte. Only the low two
/// bits of `lane` are used.
pub fn lane_status(link_status: &LinkStatus, lane: u8) -> LaneStatus {
    let lane = lane & 3;
    let reg = regs::LANE0_1_STATUS + u32::from(lane >> 1);
    let shift = (lane & 1) * 4;
    LaneStatus::from_bits_truncate((status_byte(link_status, reg) >> shift) & 0xf)
}

// Counts above four are clamped
fn active_lanes(lane_count: u8) -> core::ops::Range<u8> {
    0..lane_count.min(MAX_LANES)
}

/// Inter-lane alignment is done and every active lane finished equalization.
pub fn channel_eq_ok(link_status: &LinkStatus, lane_count: u8) -> bool {
    let align = status_byte(link_status, regs::LANE_ALIGN_STATUS_UPDATED);
    if align & regs::INTERLANE_ALIGN_DONE == 0 {
        return false;
    }
    active_lanes(lane_count)
        .all(|lane| lane_status(link_status, lane).contains(LaneStatus::CHANNEL_EQ_BITS))
}

/// Every active lane reports clock recovery done.
pub fn clock_recovery_ok(link_status: &LinkStatus, lane_count: u8) -> bool {
    active_lanes(lane_count)
        .all(|lane| lane_status(link_status, lane).contains(LaneStatus::CR_DONE))
}

fn adjust_request(link_status: &LinkStatus, lane: u8, lane0_shift: u8, lane1_shift: u8) -> u8 {
    let lane = lane & 3;
    let reg = regs::ADJUST_REQUEST_LANE0_1 + u32::from(lane >> 1);
    let shift = if lane & 1 == 1 { lane1_shift } else { lane0_shift };
    (status_byte(link_status, reg) >> shift) & 0x3
}

/// Requested voltage swing for `lane`, positioned for TRAINING_LANEx_SET.
pub fn adjust_request_voltage(link_status: &LinkStatus, lane: u8) -> u8 {
    adjust_request(
        link_status,
        lane,
        regs::ADJUST_VOLTAGE_SWING_LANE0_SHIFT,
        regs::ADJUST_VOLTAGE_SWING_LANE1_SHIFT,
    ) << regs::TRAIN_VOLTAGE_SWING_SHIFT
}

/// Requested pre-emphasis for `lane`, positioned for TRAINING_LANEx_SET.
pub fn adjust_request_pre_emphasis(link_status: &LinkStatus, lane: u8) -> u8 {
    adjust_request(
        link_status,
        lane,
        regs::ADJUST_PRE_EMPHASIS_LANE0_SHIFT,
        regs::ADJUST_PRE_EMPHASIS_LANE1_SHIFT,
    ) << regs::TRAIN_PRE_EMPHASIS_SHIFT
}

/// Requested post-cursor2 level for `lane`.
///
/// ADJUST_REQUEST_POST_CURSOR2 (0x20c) lies past the 6-byte link status, so
/// this takes the status block read from 0x202 with at least 11 bytes.
/// A shorter block reads as "no adjustment".
pub fn adjust_request_post_cursor(status_block: &[u8], lane: u8) -> u8 {
    let index = (regs::ADJUST_REQUEST_POST_CURSOR2 - regs::LANE0_1_STATUS) as usize;
    status_block
        .get(index)
        .map_or(0, |value| (value >> ((lane & 3) << 1)) & 0x3)
}

/// Bandwidth code (LINK_BW_SET value) for a link rate in 10 kbps units.
pub const fn link_rate_to_bw_code(link_rate: u32) -> u8 {
    (link_rate / LINK_RATE_UNIT) as u8
}

/// Link rate in 10 kbps units for a bandwidth code.
pub const fn bw_code_to_link_rate(bw_code: u8) -> u32 {
    bw_code as u32 * LINK_RATE_UNIT
}

fn training_rd_interval(dpcd: &ReceiverCaps) -> u32 {
    let interval = dpcd[regs::TRAINING_AUX_RD_INTERVAL as usize] & regs::TRAINING_AUX_RD_MASK;
    if interval > 4 {
        log::debug!("AUX interval {interval}, out of range (max 4)");
    }
    u32::from(interval)
}

/// Wait required before reading status during clock recovery.
///
/// DPCD 1.4+ sinks and sinks advertising no interval get 100us.
pub fn clock_recovery_delay(dpcd: &ReceiverCaps) -> Duration {
    let interval = training_rd_interval(dpcd);
    if interval == 0 || dpcd[regs::DPCD_REV as usize] >= regs::DPCD_REV_14 {
        Duration::from_micros(100)
    } else {
        Duration::from_millis(u64::from(interval) * 4)
    }
}

/// Wait required before reading status during channel equalization.
pub fn channel_eq_delay(dpcd: &ReceiverCaps) -> Duration {
    match training_rd_interval(dpcd) {
        0 => Duration::from_micros(400),
        interval => Duration::from_millis(u64::from(interval) * 4),
    }
}

fn sleep_at_least(delay: &dyn Delay, wait: Duration) {
    let us = u32::try_from(wait.as_micros()).unwrap_or(u32::MAX / 2);
    delay.sleep_range_us(us, us.saturating_mul(2));
}

/// Sleep for the clock recovery interval (up to twice as long).
pub fn wait_clock_recovery(delay: &dyn Delay, dpcd: &ReceiverCaps) {
    sleep_at_least(delay, clock_recovery_delay(dpcd));
}

/// Sleep for the channel equalization interval (up to twice as long).
pub fn wait_channel_eq(delay: &dyn Delay, dpcd: &ReceiverCaps) {
    sleep_at_least(delay, channel_eq_delay(dpcd));
}
