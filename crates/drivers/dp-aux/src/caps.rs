//! Downstream port, DSC and PSR capability decoding.
//!
//! Every decoder here is total: reserved or unadvertised capabilities decode
//! to a zero/empty sentinel instead of an error.

use crate::link::ReceiverCaps;
use crate::regs;

/// DSC capability block, DPCD 0x060-0x06e.
pub type DscCaps = [u8; regs::DSC_RECEIVER_CAP_SIZE];

/// eDP PSR capability block, DPCD 0x070-0x071.
pub type PsrCaps = [u8; regs::EDP_PSR_RECEIVER_CAP_SIZE];

/// Four capability bytes of one downstream port (DPCD 0x080 + 4 * port).
pub type PortCaps = [u8; 4];

/// Downstream facing port type (DS_PORT_TYPE field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DownstreamPortType {
    Dp = 0,
    Vga = 1,
    Dvi = 2,
    Hdmi = 3,
    NonEdid = 4,
    DpDualMode = 5,
    Wireless = 6,
    Reserved = 7,
}

impl DownstreamPortType {
    pub const fn from_port_caps(port_cap: &PortCaps) -> Self {
        match port_cap[0] & regs::DS_PORT_TYPE_MASK {
            0 => Self::Dp,
            1 => Self::Vga,
            2 => Self::Dvi,
            3 => Self::Hdmi,
            4 => Self::NonEdid,
            5 => Self::DpDualMode,
            6 => Self::Wireless,
            _ => Self::Reserved,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Dp => "DisplayPort",
            Self::Vga => "VGA",
            Self::Dvi => "DVI",
            Self::Hdmi => "HDMI",
            Self::NonEdid => "others without EDID support",
            Self::DpDualMode => "DP++",
            Self::Wireless => "Wireless",
            Self::Reserved => "N/A",
        }
    }

    /// Converters that report a max clock and bpc in their detailed caps.
    const fn has_detailed_limits(self) -> bool {
        matches!(self, Self::Vga | Self::Dvi | Self::Hdmi | Self::DpDualMode)
    }
}

/// A branch device is present behind the sink.
pub fn branch_device_present(dpcd: &ReceiverCaps) -> bool {
    dpcd[regs::DOWNSTREAMPORT_PRESENT as usize] & regs::DWN_STRM_PORT_PRESENT != 0
}

fn detailed_cap_info(dpcd: &ReceiverCaps) -> bool {
    dpcd[regs::DOWNSTREAMPORT_PRESENT as usize] & regs::DETAILED_CAP_INFO_AVAILABLE != 0
}

/// Max pixel clock (VGA) or TMDS clock (DVI/HDMI/DP++) in kHz, 0 if unknown.
pub fn downstream_max_clock(dpcd: &ReceiverCaps, port_cap: &PortCaps) -> u32 {
    if !detailed_cap_info(dpcd) {
        return 0;
    }
    match DownstreamPortType::from_port_caps(port_cap) {
        DownstreamPortType::Vga => u32::from(port_cap[1]) * 8 * 1000,
        DownstreamPortType::Dvi | DownstreamPortType::Hdmi | DownstreamPortType::DpDualMode => {
            u32::from(port_cap[1]) * 2500
        }
        _ => 0,
    }
}

/// Max bits per component of a converter port, 0 if unknown.
pub fn downstream_max_bpc(dpcd: &ReceiverCaps, port_cap: &PortCaps) -> u8 {
    if !detailed_cap_info(dpcd) || !DownstreamPortType::from_port_caps(port_cap).has_detailed_limits() {
        return 0;
    }
    match port_cap[2] & regs::DS_MAX_BPC_MASK {
        0 => 8,
        1 => 10,
        2 => 12,
        _ => 16,
    }
}

fn dsc_byte(dsc_dpcd: &DscCaps, reg: u32) -> u8 {
    dsc_dpcd[(reg - regs::DSC_SUPPORT) as usize]
}

/// Largest slice count per line the DSC decoder supports, 0 if none.
///
/// eDP panels only use SLICE_CAP_1 and top out at 4 slices.
pub fn dsc_sink_max_slice_count(dsc_dpcd: &DscCaps, is_edp: bool) -> u8 {
    let cap1 = dsc_byte(dsc_dpcd, regs::DSC_SLICE_CAP_1);

    let cap1_table: &[(u8, u8)] = if is_edp {
        &[
            (regs::DSC_4_PER_DP_DSC_SINK, 4),
            (regs::DSC_2_PER_DP_DSC_SINK, 2),
            (regs::DSC_1_PER_DP_DSC_SINK, 1),
        ]
    } else {
        let cap2 = dsc_byte(dsc_dpcd, regs::DSC_SLICE_CAP_2);
        let cap2_table = [
            (regs::DSC_24_PER_DP_DSC_SINK, 24),
            (regs::DSC_20_PER_DP_DSC_SINK, 20),
            (regs::DSC_16_PER_DP_DSC_SINK, 16),
        ];
        if let Some(&(_, count)) = cap2_table.iter().find(|(bit, _)| cap2 & bit != 0) {
            return count;
        }
        &[
            (regs::DSC_12_PER_DP_DSC_SINK, 12),
            (regs::DSC_10_PER_DP_DSC_SINK, 10),
            (regs::DSC_8_PER_DP_DSC_SINK, 8),
            (regs::DSC_6_PER_DP_DSC_SINK, 6),
            (regs::DSC_4_PER_DP_DSC_SINK, 4),
            (regs::DSC_2_PER_DP_DSC_SINK, 2),
            (regs::DSC_1_PER_DP_DSC_SINK, 1),
        ]
    };

    cap1_table
        .iter()
        .find(|(bit, _)| cap1 & bit != 0)
        .map_or(0, |&(_, count)| count)
}

/// Decoder line buffer depth in bits, 0 for reserved codes.
pub fn dsc_sink_line_buf_depth(dsc_dpcd: &DscCaps) -> u8 {
    match dsc_byte(dsc_dpcd, regs::DSC_LINE_BUF_BIT_DEPTH) & regs::DSC_LINE_BUF_BIT_DEPTH_MASK {
        // Codes 0..=7 are 9..=16 bits; 8 bits was added later as code 8
        code @ 0..=7 => code + 9,
        8 => 8,
        _ => 0,
    }
}

/// Input bits per component the DSC decoder accepts, highest first.
pub fn dsc_sink_supported_input_bpcs(dsc_dpcd: &DscCaps) -> impl Iterator<Item = u8> {
    let depth = dsc_byte(dsc_dpcd, regs::DSC_DEC_COLOR_DEPTH_CAP);
    [
        (regs::DSC_12_BPC, 12),
        (regs::DSC_10_BPC, 10),
        (regs::DSC_8_BPC, 8),
    ]
    .into_iter()
    .filter(move |(bit, _)| depth & bit != 0)
    .map(|(_, bpc)| bpc)
}

const PSR_SETUP_TIME_US: [u16; 7] = [330, 275, 220, 165, 110, 55, 0];

/// PSR setup time in microseconds, `None` for the reserved code.
pub fn psr_setup_time(psr_cap: &PsrCaps) -> Option<u16> {
    let index = (psr_cap[1] & regs::PSR_SETUP_TIME_MASK) >> regs::PSR_SETUP_TIME_SHIFT;
    PSR_SETUP_TIME_US.get(usize::from(index)).copied()
}
