//! Native DPCD access.

use dp_utils::HexBytes;

use crate::channel::{AuxChannel, AuxTransfer};
use crate::delay::Delay;
use crate::error::AuxError;
use crate::link::LinkStatus;
use crate::msg::{AuxMessage, AuxPayload, AuxRequest, NativeReply};
use crate::quirks::{self, DPCD_IDENT_SIZE, DpDesc, DpcdIdent};
use crate::regs;

/// Attempts per native transaction. Seven was not enough for some Dell 4k
/// monitors.
pub const AUX_NATIVE_RETRIES: u32 = 32;

/// Bytes of payload shown in access traces.
const DUMP_MAX_BYTES: usize = 20;

impl<T: AuxTransfer, D: Delay> AuxChannel<T, D> {
    /// One native transaction with retries.
    ///
    /// The direction follows the payload. Succeeds only when the sink acks
    /// the full size; otherwise returns the error from the *first* failed
    /// attempt once all attempts are used up. The channel lock is taken
    /// per attempt and never held while sleeping.
    pub fn dpcd_access(&self, offset: u32, payload: AuxPayload<'_>) -> Result<usize, AuxError> {
        let request = match payload {
            AuxPayload::Read(_) => AuxRequest::NATIVE_READ,
            AuxPayload::Write(_) => AuxRequest::NATIVE_WRITE,
        };
        let size = payload.len();
        let mut msg = AuxMessage::new(offset, request, payload);

        let mut first_err = None;
        let mut wait = false;
        for _ in 0..AUX_NATIVE_RETRIES {
            if wait {
                self.delay.aux_retry_wait();
            }

            let err = match self.raw_transfer(&mut msg) {
                Ok(n) if msg.reply.native() == NativeReply::Ack => {
                    if n == size {
                        return Ok(n);
                    }
                    AuxError::Protocol
                }
                Ok(_) => AuxError::Io,
                Err(err) => err,
            };

            // A timeout already took long enough
            wait = !err.is_timeout();
            first_err.get_or_insert(err);
        }

        let err = first_err.unwrap_or(AuxError::Io);
        log::debug!(
            "{}: Too many retries, giving up. First error: {}",
            self.name(),
            err.errno()
        );
        Err(err)
    }

    /// Read `buf.len()` bytes starting at `offset`.
    ///
    /// Direct channels first do a throw-away one byte read of DPCD_REV:
    /// some monitors (HP ZR24w) corrupt the first access after entering
    /// power save. A failure of that read aborts the access.
    pub fn dpcd_read(&self, offset: u32, buf: &mut [u8]) -> Result<usize, AuxError> {
        let ret = match self.remote() {
            Some(remote) => remote.dpcd_read(offset, buf),
            None => {
                let mut scratch = [0u8; 1];
                match self.dpcd_access(regs::DPCD_REV, AuxPayload::Read(&mut scratch)) {
                    Ok(_) => self.dpcd_access(offset, AuxPayload::Read(&mut *buf)),
                    Err(err) => Err(err),
                }
            }
        };
        self.dump_access(AuxRequest::NATIVE_READ, offset, buf, &ret);
        ret
    }

    /// Write `buf` starting at `offset`.
    pub fn dpcd_write(&self, offset: u32, buf: &[u8]) -> Result<usize, AuxError> {
        let ret = match self.remote() {
            Some(remote) => remote.dpcd_write(offset, buf),
            None => self.dpcd_access(offset, AuxPayload::Write(buf)),
        };
        self.dump_access(AuxRequest::NATIVE_WRITE, offset, buf, &ret);
        ret
    }

    /// Like [`dpcd_read`](Self::dpcd_read) but a short read is an error.
    pub fn dpcd_read_exact(&self, offset: u32, buf: &mut [u8]) -> Result<(), AuxError> {
        match self.dpcd_read(offset, buf)? {
            n if n == buf.len() => Ok(()),
            _ => Err(AuxError::Protocol),
        }
    }

    /// Like [`dpcd_write`](Self::dpcd_write) but a short write is an error.
    pub fn dpcd_write_all(&self, offset: u32, buf: &[u8]) -> Result<(), AuxError> {
        match self.dpcd_write(offset, buf)? {
            n if n == buf.len() => Ok(()),
            _ => Err(AuxError::Protocol),
        }
    }

    pub fn dpcd_readb(&self, offset: u32) -> Result<u8, AuxError> {
        let mut value = [0u8; 1];
        self.dpcd_read_exact(offset, &mut value)?;
        Ok(value[0])
    }

    pub fn dpcd_writeb(&self, offset: u32, value: u8) -> Result<(), AuxError> {
        self.dpcd_write_all(offset, &[value])
    }

    /// Lane status block, DPCD 0x202-0x207.
    pub fn read_link_status(&self) -> Result<LinkStatus, AuxError> {
        let mut status = [0u8; regs::LINK_STATUS_SIZE];
        self.dpcd_read_exact(regs::LANE0_1_STATUS, &mut status)?;
        Ok(status)
    }

    /// Branch device id string, DPCD 0x503-0x508.
    pub fn downstream_id(&self) -> Result<[u8; 6], AuxError> {
        let mut id = [0u8; 6];
        self.dpcd_read_exact(regs::BRANCH_ID, &mut id)?;
        Ok(id)
    }

    /// Read the sink (0x400) or branch (0x500) identification and look up
    /// its quirks.
    pub fn read_desc(&self, is_branch: bool) -> Result<DpDesc, AuxError> {
        let offset = if is_branch {
            regs::BRANCH_OUI
        } else {
            regs::SINK_OUI
        };
        let mut raw = [0u8; DPCD_IDENT_SIZE];
        self.dpcd_read_exact(offset, &mut raw)?;

        let ident = DpcdIdent::from_bytes(&raw);
        let desc = DpDesc {
            ident,
            quirks: quirks::dpcd_quirks(&ident, is_branch),
        };
        log::debug!(
            "{}: DP {}: {} quirks {:#06x}",
            self.name(),
            if is_branch { "branch" } else { "sink" },
            desc.ident,
            desc.quirks.bits()
        );
        Ok(desc)
    }

    fn dump_access(
        &self,
        request: AuxRequest,
        offset: u32,
        buf: &[u8],
        ret: &Result<usize, AuxError>,
    ) {
        let arrow = if request.is_read() { "->" } else { "<-" };
        match ret {
            Ok(n) if *n > 0 => log::debug!(
                "{}: 0x{:05x} AUX {} (ret={:3}) {}",
                self.name(),
                offset,
                arrow,
                n,
                HexBytes::truncated(&buf[..(*n).min(buf.len())], DUMP_MAX_BYTES)
            ),
            Ok(n) => log::debug!("{}: 0x{:05x} AUX {} (ret={:3})", self.name(), offset, arrow, n),
            Err(err) => log::debug!(
                "{}: 0x{:05x} AUX {} (ret={:3})",
                self.name(),
                offset,
                arrow,
                err.errno()
            ),
        }
    }
}
