//! Branch device report for debugfs-style dumps.

use core::fmt;

use crate::caps::{
    DownstreamPortType, PortCaps, branch_device_present, downstream_max_bpc,
    downstream_max_clock,
};
use crate::channel::{AuxChannel, AuxTransfer};
use crate::delay::Delay;
use crate::link::ReceiverCaps;
use crate::regs;

impl<T: AuxTransfer, D: Delay> AuxChannel<T, D> {
    /// Write a description of the branch device behind this channel.
    ///
    /// DPCD read failures only drop the affected lines.
    pub fn downstream_debug(
        &self,
        dpcd: &ReceiverCaps,
        port_cap: &PortCaps,
        out: &mut dyn fmt::Write,
    ) -> fmt::Result {
        let present = branch_device_present(dpcd);
        writeln!(
            out,
            "\tDP branch device present: {}",
            if present { "yes" } else { "no" }
        )?;
        if !present {
            return Ok(());
        }

        let port_type = DownstreamPortType::from_port_caps(port_cap);
        writeln!(out, "\t\tType: {}", port_type.name())?;

        let id = self.downstream_id().unwrap_or_default();
        let len = id.iter().position(|&b| b == 0).unwrap_or(id.len());
        writeln!(out, "\t\tID: {}", id[..len].escape_ascii())?;

        if let Ok(hw) = self.dpcd_readb(regs::BRANCH_HW_REV) {
            writeln!(out, "\t\tHW: {}.{}", hw >> 4, hw & 0xf)?;
        }

        let mut sw = [0u8; 2];
        if matches!(self.dpcd_read(regs::BRANCH_SW_REV, &mut sw), Ok(n) if n > 0) {
            writeln!(out, "\t\tSW: {}.{}", sw[0], sw[1])?;
        }

        let clk = downstream_max_clock(dpcd, port_cap);
        if clk > 0 {
            let kind = if port_type == DownstreamPortType::Vga {
                "dot"
            } else {
                "TMDS"
            };
            writeln!(out, "\t\tMax {kind} clock: {clk} kHz")?;
        }

        let bpc = downstream_max_bpc(dpcd, port_cap);
        if bpc > 0 {
            writeln!(out, "\t\tMax bpc: {bpc}")?;
        }
        Ok(())
    }
}
