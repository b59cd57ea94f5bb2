//! Automated compliance test requests (DPCD 0x218 and up).

use crate::channel::{AuxChannel, AuxTransfer};
use crate::delay::Delay;
use crate::error::AuxError;
use crate::link::{bw_code_to_link_rate, link_rate_to_bw_code};
use crate::regs;

/// PHY_TEST_PATTERN values that carry extra data.
pub const PHY_TEST_PATTERN_80BIT_CUSTOM: u8 = 0x4;
pub const PHY_TEST_PATTERN_CP2520: u8 = 0x5;

/// PHY compliance test parameters requested by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhyTestParams {
    /// Link rate in 10 kbps units.
    pub link_rate: u32,
    pub num_lanes: u8,
    pub enhanced_frame_cap: bool,
    pub phy_pattern: u8,
    /// Only read for the 80 bit custom pattern.
    pub custom80: [u8; 10],
    /// Only read for CP2520.
    pub hbr2_reset: [u8; 2],
}

impl<T: AuxTransfer, D: Delay> AuxChannel<T, D> {
    /// Answer a TEST_EDID_READ request with the checksum of the last EDID
    /// block the source actually read.
    ///
    /// Fails with [`AuxError::NotSupported`] when the sink did not ask for
    /// an EDID read test.
    pub fn send_real_edid_checksum(&self, real_edid_checksum: u8) -> Result<(), AuxError> {
        let auto_test_req = self
            .dpcd_readb(regs::DEVICE_SERVICE_IRQ_VECTOR)
            .inspect_err(|_| self.log_dpcd_failure("read", regs::DEVICE_SERVICE_IRQ_VECTOR))?
            & regs::AUTOMATED_TEST_REQUEST;

        let link_edid_read = self
            .dpcd_readb(regs::TEST_REQUEST)
            .inspect_err(|_| self.log_dpcd_failure("read", regs::TEST_REQUEST))?
            & regs::TEST_LINK_EDID_READ;

        if auto_test_req == 0 || link_edid_read == 0 {
            log::debug!("{}: Source DUT does not support TEST_EDID_READ", self.name());
            return Err(AuxError::NotSupported);
        }

        let writes = [
            (regs::DEVICE_SERVICE_IRQ_VECTOR, auto_test_req),
            // Checksum of the last EDID extension block
            (regs::TEST_EDID_CHECKSUM, real_edid_checksum),
            (regs::TEST_RESPONSE, regs::TEST_EDID_CHECKSUM_WRITE),
        ];
        for (offset, value) in writes {
            self.dpcd_writeb(offset, value)
                .inspect_err(|_| self.log_dpcd_failure("write", offset))?;
        }
        Ok(())
    }

    fn log_dpcd_failure(&self, op: &str, offset: u32) {
        log::error!("{}: DPCD failed {} at register {:#x}", self.name(), op, offset);
    }

    /// Read the PHY test pattern the sink wants to see.
    pub fn get_phy_test_pattern(&self) -> Result<PhyTestParams, AuxError> {
        let mut params = PhyTestParams {
            link_rate: bw_code_to_link_rate(self.dpcd_readb(regs::TEST_LINK_RATE)?),
            ..PhyTestParams::default()
        };

        let lanes = self.dpcd_readb(regs::TEST_LANE_COUNT)?;
        params.num_lanes = lanes & regs::MAX_LANE_COUNT_MASK;
        params.enhanced_frame_cap = lanes & regs::ENHANCED_FRAME_CAP != 0;

        params.phy_pattern = self.dpcd_readb(regs::PHY_TEST_PATTERN)?;
        match params.phy_pattern {
            PHY_TEST_PATTERN_80BIT_CUSTOM => {
                self.dpcd_read_exact(regs::TEST_80BIT_CUSTOM_PATTERN_7_0, &mut params.custom80)?;
            }
            PHY_TEST_PATTERN_CP2520 => {
                self.dpcd_read_exact(regs::TEST_HBR2_SCRAMBLER_RESET, &mut params.hbr2_reset)?;
            }
            _ => {}
        }
        Ok(params)
    }

    /// Configure the link and program the PHY test pattern.
    ///
    /// DPCD revisions before 1.2 have a single pattern field in
    /// TRAINING_PATTERN_SET; later ones take it per lane.
    pub fn set_phy_test_pattern(&self, params: &PhyTestParams, dp_rev: u8) -> Result<(), AuxError> {
        let mut lane_count = params.num_lanes;
        if params.enhanced_frame_cap {
            lane_count |= regs::LANE_COUNT_ENHANCED_FRAME_EN;
        }
        let link_config = [link_rate_to_bw_code(params.link_rate), lane_count];
        self.dpcd_write_all(regs::LINK_BW_SET, &link_config)?;

        if dp_rev < regs::DPCD_REV_12 {
            let pattern = (params.phy_pattern << 2) & regs::LINK_QUAL_PATTERN_11_MASK;
            self.dpcd_writeb(regs::TRAINING_PATTERN_SET, pattern)?;
        } else {
            for lane in 0..u32::from(params.num_lanes) {
                self.dpcd_writeb(regs::LINK_QUAL_LANE0_SET + lane, params.phy_pattern)?;
            }
        }
        Ok(())
    }
}
