// Native DPCD access against the scripted sink.

mod common;

use common::{Harness, Step};
use dp_aux::caps::PortCaps;
use dp_aux::link::{self, ReceiverCaps};
use dp_aux::{AuxError, AuxPayload, Errno, PhyTestParams, Quirks, regs};

/// Up to 31 NACKs are absorbed by the 32 attempts.
#[test]
fn test_nacks_below_limit_succeed() {
    for n in [0usize, 1, 7, 31] {
        let h = Harness::new();
        h.script(std::iter::repeat_n(Step::NATIVE_NACK, n));
        let mut buf = [0u8; 4];
        assert_eq!(h.aux.dpcd_access(0x100, AuxPayload::Read(&mut buf)), Ok(4), "n={n}");
        assert_eq!(h.seen().len(), n + 1);
        // One wait before every retry
        assert_eq!(h.delay.count(), n);
    }
}

/// 32 NACKs exhaust the retries with EIO.
#[test]
fn test_nacks_at_limit_fail() {
    let h = Harness::new();
    h.set_default(Step::NATIVE_NACK);
    let mut buf = [0u8; 1];
    let err = h.aux.dpcd_access(0x100, AuxPayload::Read(&mut buf)).unwrap_err();
    assert_eq!(err, AuxError::Io);
    assert_eq!(err.errno(), -5);
    assert_eq!(h.seen().len(), 32);
}

/// The error of the first attempt is reported, not the last.
#[test]
fn test_first_error_is_returned() {
    let h = Harness::new();
    h.script([Step::Fail(AuxError::Transport(Errno(6)))]);
    h.set_default(Step::NATIVE_DEFER);
    let err = h.aux.dpcd_access(0x000, AuxPayload::Write(&[1])).unwrap_err();
    assert_eq!(err, AuxError::Transport(Errno(6)));

    let h = Harness::new();
    h.script([Step::NATIVE_NACK]);
    h.set_default(Step::Fail(AuxError::TimedOut));
    let err = h.aux.dpcd_access(0x000, AuxPayload::Write(&[1])).unwrap_err();
    assert_eq!(err, AuxError::Io);
}

/// No wait after a timeout; busy and NACK wait 500-600us.
#[test]
fn test_no_wait_after_timeout() {
    let h = Harness::new();
    h.script([
        Step::Fail(AuxError::TimedOut),
        Step::Fail(AuxError::TimedOut),
        Step::Fail(AuxError::Busy),
        Step::NATIVE_NACK,
    ]);
    let mut buf = [0u8; 2];
    assert_eq!(h.aux.dpcd_access(0x10, AuxPayload::Read(&mut buf)), Ok(2));
    assert_eq!(*h.delay.0.lock().unwrap(), [(500, 600), (500, 600)]);
}

/// An ACK for fewer bytes than requested is a protocol error.
#[test]
fn test_short_ack_is_protocol_error() {
    let h = Harness::new();
    h.set_default(Step::short(2));
    let mut buf = [0u8; 4];
    assert_eq!(
        h.aux.dpcd_access(0x100, AuxPayload::Read(&mut buf)),
        Err(AuxError::Protocol)
    );

    // ...but a later full ACK still wins
    let h = Harness::new();
    h.script([Step::short(2)]);
    assert_eq!(h.aux.dpcd_access(0x100, AuxPayload::Read(&mut buf)), Ok(4));
}

#[test]
fn test_read_throwaway_then_data() {
    let h = Harness::new();
    h.poke(0x000, &[0x12]);
    h.poke(0x100, &[0x0a, 0x84]);
    let mut buf = [0u8; 2];
    assert_eq!(h.aux.dpcd_read(0x100, &mut buf), Ok(2));
    assert_eq!(buf, [0x0a, 0x84]);

    let addrs: Vec<u32> = h.seen().iter().map(|s| s.address).collect();
    assert_eq!(addrs, [regs::DPCD_REV, 0x100]);
    assert_eq!(h.seen()[0].size, 1);
}

/// A failing throwaway read aborts before the real read.
#[test]
fn test_throwaway_failure_aborts_read() {
    let h = Harness::new();
    h.set_default(Step::NATIVE_NACK);
    let mut buf = [0xeeu8; 4];
    assert_eq!(h.aux.dpcd_read(0x200, &mut buf), Err(AuxError::Io));
    assert!(h.seen().iter().all(|s| s.address == regs::DPCD_REV));
    assert_eq!(buf, [0xee; 4]);
}

#[test]
fn test_write_and_byte_helpers() {
    let h = Harness::new();
    h.aux.dpcd_write(0x600, &[1, 2, 3]).unwrap();
    assert_eq!(h.peek(0x602), 3);
    h.aux.dpcd_writeb(0x103, 0x38).unwrap();
    assert_eq!(h.aux.dpcd_readb(0x103), Ok(0x38));
}

#[test]
fn test_read_link_status() {
    let h = Harness::new();
    h.poke(regs::LANE0_1_STATUS, &[0x77, 0x77, 0x01, 0x00, 0x00, 0x00]);
    let status = h.aux.read_link_status().unwrap();
    assert!(link::clock_recovery_ok(&status, 4));
    assert!(link::channel_eq_ok(&status, 4));
}

#[test]
fn test_read_desc_attaches_quirks() {
    let h = Harness::new();
    h.poke(
        regs::BRANCH_OUI,
        &[0x90, 0xcc, 0x24, b'S', b'Y', b'N', b'A', 0, 0, 0x10, 1, 2],
    );
    let desc = h.aux.read_desc(true).unwrap();
    assert_eq!(desc.ident.oui, [0x90, 0xcc, 0x24]);
    assert_eq!(desc.ident.device_id_trimmed(), b"SYNA");
    assert!(desc.has_quirk(Quirks::DSC_WITHOUT_VIRTUAL_DPCD));

    // Same bytes at the sink address do not match the branch-only rule
    h.poke(regs::SINK_OUI, &[0x90, 0xcc, 0x24, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(h.aux.read_desc(false).unwrap().quirks, Quirks::empty());
}

#[test]
fn test_downstream_id() {
    let h = Harness::new();
    h.poke(regs::BRANCH_ID, b"DP-HDM");
    assert_eq!(h.aux.downstream_id(), Ok(*b"DP-HDM"));
}

#[test]
fn test_send_real_edid_checksum() {
    let h = Harness::new();
    h.poke(regs::DEVICE_SERVICE_IRQ_VECTOR, &[0x42]);
    h.poke(regs::TEST_REQUEST, &[regs::TEST_LINK_EDID_READ]);

    h.aux.send_real_edid_checksum(0xab).unwrap();
    assert_eq!(h.peek(regs::DEVICE_SERVICE_IRQ_VECTOR), regs::AUTOMATED_TEST_REQUEST);
    assert_eq!(h.peek(regs::TEST_EDID_CHECKSUM), 0xab);
    assert_eq!(h.peek(regs::TEST_RESPONSE), regs::TEST_EDID_CHECKSUM_WRITE);
}

#[test]
fn test_edid_checksum_needs_test_request() {
    let h = Harness::new();
    h.poke(regs::DEVICE_SERVICE_IRQ_VECTOR, &[regs::AUTOMATED_TEST_REQUEST]);
    assert_eq!(h.aux.send_real_edid_checksum(0xab), Err(AuxError::NotSupported));
    assert_eq!(h.peek(regs::TEST_EDID_CHECKSUM), 0);
}

#[test]
fn test_get_phy_test_pattern() {
    let h = Harness::new();
    h.poke(regs::TEST_LINK_RATE, &[regs::LINK_BW_5_4]);
    h.poke(regs::TEST_LANE_COUNT, &[0x84]);
    h.poke(regs::PHY_TEST_PATTERN, &[4]);
    h.poke(regs::TEST_80BIT_CUSTOM_PATTERN_7_0, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);

    let params = h.aux.get_phy_test_pattern().unwrap();
    assert_eq!(params.link_rate, 540_000);
    assert_eq!(params.num_lanes, 4);
    assert!(params.enhanced_frame_cap);
    assert_eq!(params.phy_pattern, 4);
    assert_eq!(params.custom80, [1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    assert_eq!(params.hbr2_reset, [0, 0]);
}

#[test]
fn test_set_phy_test_pattern_per_lane() {
    let h = Harness::new();
    let params = PhyTestParams {
        link_rate: 270_000,
        num_lanes: 2,
        enhanced_frame_cap: true,
        phy_pattern: 3,
        ..PhyTestParams::default()
    };
    h.aux.set_phy_test_pattern(&params, 0x12).unwrap();
    assert_eq!(h.peek(regs::LINK_BW_SET), regs::LINK_BW_2_7);
    assert_eq!(h.peek(regs::LANE_COUNT_SET), 0x82);
    assert_eq!(h.peek(regs::LINK_QUAL_LANE0_SET), 3);
    assert_eq!(h.peek(regs::LINK_QUAL_LANE0_SET + 1), 3);
    assert_eq!(h.peek(regs::LINK_QUAL_LANE0_SET + 2), 0);
    assert_eq!(h.peek(regs::TRAINING_PATTERN_SET), 0);
}

#[test]
fn test_set_phy_test_pattern_legacy() {
    let h = Harness::new();
    let params = PhyTestParams {
        link_rate: 162_000,
        num_lanes: 1,
        phy_pattern: 3,
        ..PhyTestParams::default()
    };
    h.aux.set_phy_test_pattern(&params, 0x11).unwrap();
    assert_eq!(h.peek(regs::LANE_COUNT_SET), 1);
    assert_eq!(h.peek(regs::TRAINING_PATTERN_SET), 0x0c);
    assert_eq!(h.peek(regs::LINK_QUAL_LANE0_SET), 0);
}

#[test]
fn test_downstream_debug_report() {
    let h = Harness::new();
    h.poke(regs::BRANCH_ID, b"HDMI\0\0");
    h.poke(regs::BRANCH_HW_REV, &[0x21, 3, 4]);

    let mut dpcd: ReceiverCaps = [0; regs::RECEIVER_CAP_SIZE];
    dpcd[regs::DOWNSTREAMPORT_PRESENT as usize] =
        regs::DWN_STRM_PORT_PRESENT | regs::DETAILED_CAP_INFO_AVAILABLE;
    let port: PortCaps = [3, 120, 1, 0];

    let mut out = String::new();
    h.aux.downstream_debug(&dpcd, &port, &mut out).unwrap();
    assert_eq!(
        out,
        "\tDP branch device present: yes\n\
         \t\tType: HDMI\n\
         \t\tID: HDMI\n\
         \t\tHW: 2.1\n\
         \t\tSW: 3.4\n\
         \t\tMax TMDS clock: 300000 kHz\n\
         \t\tMax bpc: 10\n"
    );
}

#[test]
fn test_downstream_debug_without_branch() {
    let h = Harness::new();
    let dpcd: ReceiverCaps = [0; regs::RECEIVER_CAP_SIZE];
    let mut out = String::new();
    h.aux.downstream_debug(&dpcd, &[0; 4], &mut out).unwrap();
    assert_eq!(out, "\tDP branch device present: no\n");
    assert!(h.seen().is_empty());
}
