//! DPCD register offsets and bit definitions.
//!
//! Offsets and masks are bit-exact with the VESA DisplayPort standard.
//! Only the registers this crate touches are listed.

/// DPCD address space is 20 bits wide.
pub const DPCD_ADDRESS_MASK: u32 = 0xf_ffff;

// Receiver capability (0x000 - 0x00e)
pub const DPCD_REV: u32 = 0x000;
pub const DPCD_REV_12: u8 = 0x12;
pub const DPCD_REV_14: u8 = 0x14;

pub const MAX_LANE_COUNT: u32 = 0x002;
pub const MAX_LANE_COUNT_MASK: u8 = 0x1f;
pub const ENHANCED_FRAME_CAP: u8 = 1 << 7;

pub const DOWNSTREAMPORT_PRESENT: u32 = 0x005;
pub const DWN_STRM_PORT_PRESENT: u8 = 1 << 0;
pub const DETAILED_CAP_INFO_AVAILABLE: u8 = 1 << 4;

pub const TRAINING_AUX_RD_INTERVAL: u32 = 0x00e;
pub const TRAINING_AUX_RD_MASK: u8 = 0x7f;

pub const RECEIVER_CAP_SIZE: usize = 0xf;

// DSC capability (0x060 - 0x06e)
pub const DSC_SUPPORT: u32 = 0x060;
pub const DSC_SLICE_CAP_1: u32 = 0x064;
pub const DSC_1_PER_DP_DSC_SINK: u8 = 1 << 0;
pub const DSC_2_PER_DP_DSC_SINK: u8 = 1 << 1;
pub const DSC_4_PER_DP_DSC_SINK: u8 = 1 << 3;
pub const DSC_6_PER_DP_DSC_SINK: u8 = 1 << 4;
pub const DSC_8_PER_DP_DSC_SINK: u8 = 1 << 5;
pub const DSC_10_PER_DP_DSC_SINK: u8 = 1 << 6;
pub const DSC_12_PER_DP_DSC_SINK: u8 = 1 << 7;
pub const DSC_LINE_BUF_BIT_DEPTH: u32 = 0x065;
pub const DSC_LINE_BUF_BIT_DEPTH_MASK: u8 = 0xf;
pub const DSC_DEC_COLOR_DEPTH_CAP: u32 = 0x06a;
pub const DSC_8_BPC: u8 = 1 << 1;
pub const DSC_10_BPC: u8 = 1 << 2;
pub const DSC_12_BPC: u8 = 1 << 3;
pub const DSC_SLICE_CAP_2: u32 = 0x06d;
pub const DSC_16_PER_DP_DSC_SINK: u8 = 1 << 0;
pub const DSC_20_PER_DP_DSC_SINK: u8 = 1 << 1;
pub const DSC_24_PER_DP_DSC_SINK: u8 = 1 << 2;
pub const DSC_RECEIVER_CAP_SIZE: usize = 0xf;

// PSR capability (0x070 - 0x071)
pub const PSR_SUPPORT: u32 = 0x070;
pub const PSR_CAPS: u32 = 0x071;
pub const PSR_SETUP_TIME_MASK: u8 = 7 << 1;
pub const PSR_SETUP_TIME_SHIFT: u8 = 1;
pub const EDP_PSR_RECEIVER_CAP_SIZE: usize = 2;

// Downstream port capability (0x080 - 0x08f, 4 bytes per port)
pub const DOWNSTREAM_PORT_0: u32 = 0x080;
pub const DS_PORT_TYPE_MASK: u8 = 7;
pub const DS_MAX_BPC_MASK: u8 = 3;

// Link configuration (0x100 - )
pub const LINK_BW_SET: u32 = 0x100;
pub const LINK_BW_1_62: u8 = 0x06;
pub const LINK_BW_2_7: u8 = 0x0a;
pub const LINK_BW_5_4: u8 = 0x14;
pub const LINK_BW_8_1: u8 = 0x1e;
pub const LANE_COUNT_SET: u32 = 0x101;
pub const LANE_COUNT_ENHANCED_FRAME_EN: u8 = 1 << 7;
pub const TRAINING_PATTERN_SET: u32 = 0x102;
pub const LINK_QUAL_PATTERN_11_MASK: u8 = 3 << 2;
pub const TRAIN_VOLTAGE_SWING_SHIFT: u8 = 0;
pub const TRAIN_PRE_EMPHASIS_SHIFT: u8 = 3;
pub const LINK_QUAL_LANE0_SET: u32 = 0x10b;

// Link/sink status (0x200 - )
pub const DEVICE_SERVICE_IRQ_VECTOR: u32 = 0x201;
pub const AUTOMATED_TEST_REQUEST: u8 = 1 << 1;

pub const LANE0_1_STATUS: u32 = 0x202;
pub const LANE_ALIGN_STATUS_UPDATED: u32 = 0x204;
pub const INTERLANE_ALIGN_DONE: u8 = 1 << 0;
pub const ADJUST_REQUEST_LANE0_1: u32 = 0x206;
pub const ADJUST_VOLTAGE_SWING_LANE0_SHIFT: u8 = 0;
pub const ADJUST_PRE_EMPHASIS_LANE0_SHIFT: u8 = 2;
pub const ADJUST_VOLTAGE_SWING_LANE1_SHIFT: u8 = 4;
pub const ADJUST_PRE_EMPHASIS_LANE1_SHIFT: u8 = 6;
pub const ADJUST_REQUEST_POST_CURSOR2: u32 = 0x20c;
pub const LINK_STATUS_SIZE: usize = 6;

// Automated test registers (0x218 - 0x27f)
pub const TEST_REQUEST: u32 = 0x218;
pub const TEST_LINK_EDID_READ: u8 = 1 << 2;
pub const TEST_LINK_RATE: u32 = 0x219;
pub const TEST_LANE_COUNT: u32 = 0x220;
pub const TEST_CRC_R_CR: u32 = 0x240;
pub const TEST_SINK_MISC: u32 = 0x246;
pub const TEST_CRC_SUPPORTED: u8 = 1 << 5;
pub const TEST_COUNT_MASK: u8 = 0xf;
pub const PHY_TEST_PATTERN: u32 = 0x248;
pub const TEST_HBR2_SCRAMBLER_RESET: u32 = 0x24a;
pub const TEST_80BIT_CUSTOM_PATTERN_7_0: u32 = 0x250;
pub const TEST_RESPONSE: u32 = 0x260;
pub const TEST_ACK: u8 = 1 << 0;
pub const TEST_NAK: u8 = 1 << 1;
pub const TEST_EDID_CHECKSUM_WRITE: u8 = 1 << 2;
pub const TEST_EDID_CHECKSUM: u32 = 0x261;
pub const TEST_SINK: u32 = 0x270;
pub const TEST_SINK_START: u8 = 1 << 0;

// Sink / branch identification (0x400, 0x500)
pub const SINK_OUI: u32 = 0x400;
pub const BRANCH_OUI: u32 = 0x500;
pub const BRANCH_ID: u32 = 0x503;
pub const BRANCH_HW_REV: u32 = 0x509;
pub const BRANCH_SW_REV: u32 = 0x50a;

// AUX request and reply encoding
pub const AUX_I2C_WRITE: u8 = 0x0;
pub const AUX_I2C_READ: u8 = 0x1;
pub const AUX_I2C_WRITE_STATUS_UPDATE: u8 = 0x2;
pub const AUX_I2C_MOT: u8 = 0x4;
pub const AUX_NATIVE_WRITE: u8 = 0x8;
pub const AUX_NATIVE_READ: u8 = 0x9;

pub const AUX_NATIVE_REPLY_ACK: u8 = 0x0;
pub const AUX_NATIVE_REPLY_NACK: u8 = 0x1;
pub const AUX_NATIVE_REPLY_DEFER: u8 = 0x2;
pub const AUX_NATIVE_REPLY_MASK: u8 = 0x3;

pub const AUX_I2C_REPLY_ACK: u8 = 0x0 << 2;
pub const AUX_I2C_REPLY_NACK: u8 = 0x1 << 2;
pub const AUX_I2C_REPLY_DEFER: u8 = 0x2 << 2;
pub const AUX_I2C_REPLY_MASK: u8 = 0x3 << 2;

/// Largest payload a single AUX transaction can carry.
pub const AUX_MAX_PAYLOAD_BYTES: usize = 16;
