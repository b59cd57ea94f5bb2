//! Sink and branch device quirks.
//!
//! Devices are matched by the identification block at DPCD 0x400/0x500
//! and, for devices that leave their device id blank, by the EDID vendor
//! and product codes. Drivers decide what to do with the returned flags.

use core::fmt;

use bitflags::bitflags;

bitflags! {
    /// Known deviations from the DisplayPort standard.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Quirks: u32 {
        /// Needs a constant N value (reduced M/N) at HBR2.
        const CONSTANT_N = 1 << 0;
        /// PSR does not work without extra handling.
        const NO_PSR = 1 << 1;
        /// SINK_COUNT is left at zero.
        const NO_SINK_COUNT = 1 << 2;
        /// MST hub decodes DSC without exposing a virtual DPCD.
        const DSC_WITHOUT_VIRTUAL_DPCD = 1 << 3;
        /// Panel only works with DPCD backlight control.
        const FORCE_DPCD_BACKLIGHT = 1 << 4;
    }
}

/// Device id half of a DPCD quirk rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceIdMatch {
    Any,
    Exact([u8; 6]),
}

impl DeviceIdMatch {
    fn matches(&self, device_id: &[u8; 6]) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(id) => id == device_id,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DpcdQuirkRule {
    pub oui: [u8; 3],
    pub device_id: DeviceIdMatch,
    pub is_branch: bool,
    pub quirks: Quirks,
}

#[derive(Debug, Clone, Copy)]
pub struct EdidQuirkRule {
    pub mfg_id: [u8; 2],
    pub prod_id: [u8; 2],
    pub quirks: Quirks,
}

pub static DPCD_QUIRKS: [DpcdQuirkRule; 5] = [
    // Analogix 7737 needs reduced M and N at HBR2
    DpcdQuirkRule {
        oui: [0x00, 0x22, 0xb9],
        device_id: DeviceIdMatch::Any,
        is_branch: true,
        quirks: Quirks::CONSTANT_N,
    },
    // LG LP140WF6-SPM1 eDP panel
    DpcdQuirkRule {
        oui: [0x00, 0x22, 0xb9],
        device_id: DeviceIdMatch::Exact(*b"sivarT"),
        is_branch: false,
        quirks: Quirks::CONSTANT_N,
    },
    // Apple panels
    DpcdQuirkRule {
        oui: [0x00, 0x10, 0xfa],
        device_id: DeviceIdMatch::Any,
        is_branch: false,
        quirks: Quirks::NO_PSR,
    },
    // CH7511
    DpcdQuirkRule {
        oui: [0x00, 0x00, 0x00],
        device_id: DeviceIdMatch::Exact(*b"CH7511"),
        is_branch: false,
        quirks: Quirks::NO_SINK_COUNT,
    },
    // Synaptics DP1.4 MST hubs
    DpcdQuirkRule {
        oui: [0x90, 0xcc, 0x24],
        device_id: DeviceIdMatch::Any,
        is_branch: true,
        quirks: Quirks::DSC_WITHOUT_VIRTUAL_DPCD,
    },
];

pub static EDID_QUIRKS: [EdidQuirkRule; 5] = [
    // ThinkPad X1 Extreme gen 2 4K AMOLED
    EdidQuirkRule {
        mfg_id: [0x4c, 0x83],
        prod_id: [0x41, 0x41],
        quirks: Quirks::FORCE_DPCD_BACKLIGHT,
    },
    // Dell CML 2020 panels start in AUX backlight mode
    EdidQuirkRule {
        mfg_id: [0x06, 0xaf],
        prod_id: [0x9b, 0x32],
        quirks: Quirks::FORCE_DPCD_BACKLIGHT,
    },
    EdidQuirkRule {
        mfg_id: [0x06, 0xaf],
        prod_id: [0xeb, 0x41],
        quirks: Quirks::FORCE_DPCD_BACKLIGHT,
    },
    EdidQuirkRule {
        mfg_id: [0x4d, 0x10],
        prod_id: [0xc7, 0x14],
        quirks: Quirks::FORCE_DPCD_BACKLIGHT,
    },
    EdidQuirkRule {
        mfg_id: [0x4d, 0x10],
        prod_id: [0xe6, 0x14],
        quirks: Quirks::FORCE_DPCD_BACKLIGHT,
    },
];

/// Size of the identification block at DPCD 0x400 / 0x500.
pub const DPCD_IDENT_SIZE: usize = 12;

/// Sink or branch identification block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DpcdIdent {
    pub oui: [u8; 3],
    /// ASCII, NUL padded.
    pub device_id: [u8; 6],
    pub hw_rev: u8,
    pub sw_major_rev: u8,
    pub sw_minor_rev: u8,
}

impl DpcdIdent {
    pub fn from_bytes(raw: &[u8; DPCD_IDENT_SIZE]) -> Self {
        let mut ident = Self {
            hw_rev: raw[9],
            sw_major_rev: raw[10],
            sw_minor_rev: raw[11],
            ..Self::default()
        };
        ident.oui.copy_from_slice(&raw[0..3]);
        ident.device_id.copy_from_slice(&raw[3..9]);
        ident
    }

    /// Device id up to the first NUL.
    pub fn device_id_trimmed(&self) -> &[u8] {
        let len = self
            .device_id
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.device_id.len());
        &self.device_id[..len]
    }
}

/// Identification block plus the quirks that apply to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DpDesc {
    pub ident: DpcdIdent,
    pub quirks: Quirks,
}

impl DpDesc {
    pub fn has_quirk(&self, quirk: Quirks) -> bool {
        self.quirks.contains(quirk)
    }
}

/// Quirks for a device id read from DPCD 0x400 (sink) or 0x500 (branch).
pub fn dpcd_quirks(ident: &DpcdIdent, is_branch: bool) -> Quirks {
    DPCD_QUIRKS
        .iter()
        .filter(|rule| rule.is_branch == is_branch)
        .filter(|rule| rule.oui == ident.oui)
        .filter(|rule| rule.device_id.matches(&ident.device_id))
        .fold(Quirks::empty(), |acc, rule| acc | rule.quirks)
}

/// Vendor and product code from an EDID base block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdidId {
    pub mfg_id: [u8; 2],
    pub prod_id: [u8; 2],
}

impl EdidId {
    /// `None` if the block is too short to carry the product code.
    pub fn from_edid(edid: &[u8]) -> Option<Self> {
        match edid.get(8..12)? {
            &[m0, m1, p0, p1] => Some(Self {
                mfg_id: [m0, m1],
                prod_id: [p0, p1],
            }),
            _ => None,
        }
    }
}

/// Quirks keyed by EDID vendor/product code.
///
/// Some devices never fill in their DPCD device id, leaving the EDID as
/// the only way to recognize them.
pub fn edid_quirks(edid: &[u8]) -> Quirks {
    let Some(id) = EdidId::from_edid(edid) else {
        return Quirks::empty();
    };

    let quirks = EDID_QUIRKS
        .iter()
        .filter(|rule| rule.mfg_id == id.mfg_id && rule.prod_id == id.prod_id)
        .fold(Quirks::empty(), |acc, rule| acc | rule.quirks);

    log::debug!(
        "DP sink: EDID mfg {} prod-ID {} quirks: {:#06x}",
        dp_utils::HexBytes::new(&id.mfg_id).separated_by(Some('-')),
        dp_utils::HexBytes::new(&id.prod_id).separated_by(Some('-')),
        quirks.bits()
    );
    quirks
}

impl fmt::Display for DpcdIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OUI {} dev-ID {} HW-rev {}.{} SW-rev {}.{}",
            dp_utils::HexBytes::new(&self.oui).separated_by(Some('-')),
            self.device_id_trimmed().escape_ascii(),
            self.hw_rev >> 4,
            self.hw_rev & 0xf,
            self.sw_major_rev,
            self.sw_minor_rev
        )
    }
}
