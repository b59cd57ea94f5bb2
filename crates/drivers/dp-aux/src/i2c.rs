//! I2C-over-AUX.
//!
//! Each I2C message becomes a bare address packet followed by as many
//! payload-sized AUX transactions as it takes to move the data. The whole
//! exchange ends with a bare packet that drops the MOT bit, which releases
//! the sink's I2C bus. Retries are budgeted per AUX transaction from the
//! estimated duration of the I2C transfer behind it.

use alloc::string::String;

use bitflags::bitflags;

use crate::channel::{AuxChannel, AuxTransfer};
use crate::delay::{AUX_RETRY_INTERVAL_US, Delay};
use crate::error::AuxError;
use crate::msg::{AuxMessage, AuxPayload, AuxRequest, I2cReply, NativeReply, RequestKind};
use crate::regs;

/// DP 1.2 requires at least seven retries on AUX DEFER.
pub const I2C_MIN_RETRIES: u32 = 7;

/// Upper bound on extra attempts earned by I2C DEFER replies.
pub const I2C_MAX_DEFER_RETRIES: u32 = 7;

// AUX transaction timing at 1 Mbit/s, in bit times (= microseconds)
const AUX_PRECHARGE_LEN: u32 = 10;
const AUX_SYNC_LEN: u32 = 16 + 4;
const AUX_STOP_LEN: u32 = 4;
const AUX_CMD_LEN: u32 = 4;
const AUX_ADDRESS_LEN: u32 = 20;
const AUX_REPLY_PAD_LEN: u32 = 4;
const AUX_LENGTH_LEN: u32 = 8;

// I2C bus timing, in I2C clock cycles
const I2C_START_LEN: u32 = 1;
const I2C_STOP_LEN: u32 = 1;
const I2C_ADDR_LEN: u32 = 9;
const I2C_DATA_LEN: u32 = 9;

/// Tunables for the I2C-over-AUX adapter.
///
/// Only built through [`I2cConfig::new`], so both values are always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cConfig {
    speed_khz: u32,
    transfer_size: usize,
}

impl I2cConfig {
    pub const MIN_SPEED_KHZ: u32 = 1;
    pub const MAX_SPEED_KHZ: u32 = 400;

    /// Build a config, clamping both values into their legal ranges.
    pub fn new(speed_khz: u32, transfer_size: usize) -> Self {
        Self {
            speed_khz: speed_khz.clamp(Self::MIN_SPEED_KHZ, Self::MAX_SPEED_KHZ),
            transfer_size: transfer_size.clamp(1, regs::AUX_MAX_PAYLOAD_BYTES),
        }
    }

    /// Assumed I2C bus speed behind the sink, 1-400 kHz.
    pub fn speed_khz(&self) -> u32 {
        self.speed_khz
    }

    /// Bytes per AUX transaction, 1-16.
    ///
    /// Some DP->DVI dual link adapters only work with full-size packets.
    pub fn transfer_size(&self) -> usize {
        self.transfer_size
    }
}

impl Default for I2cConfig {
    /// 10 kHz: some real world devices need it.
    fn default() -> Self {
        Self {
            speed_khz: 10,
            transfer_size: regs::AUX_MAX_PAYLOAD_BYTES,
        }
    }
}

bitflags! {
    /// `struct i2c_msg` flags understood by the adapter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct I2cMsgFlags: u16 {
        /// Read from the slave.
        const RD = 0x0001;
        /// End the I2C transaction after this message.
        const STOP = 0x8000;
    }
}

bitflags! {
    /// I2C adapter functionality bits (Linux `I2C_FUNC_*`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct I2cFunctionality: u32 {
        const I2C = 0x0000_0001;
        const TEN_BIT_ADDR = 0x0000_0002;
        const SMBUS_PEC = 0x0000_0008;
        const SMBUS_BLOCK_PROC_CALL = 0x0000_8000;
        const SMBUS_QUICK = 0x0001_0000;
        const SMBUS_BYTE = 0x0006_0000;
        const SMBUS_BYTE_DATA = 0x0018_0000;
        const SMBUS_WORD_DATA = 0x0060_0000;
        const SMBUS_PROC_CALL = 0x0080_0000;
        const SMBUS_READ_BLOCK_DATA = 0x0100_0000;
        const SMBUS_WRITE_BLOCK_DATA = 0x0200_0000;
        const SMBUS_I2C_BLOCK = 0x0c00_0000;
        /// Everything the SMBus emulation layer can build from plain I2C.
        const SMBUS_EMUL = Self::SMBUS_QUICK.bits()
            | Self::SMBUS_BYTE.bits()
            | Self::SMBUS_BYTE_DATA.bits()
            | Self::SMBUS_WORD_DATA.bits()
            | Self::SMBUS_PROC_CALL.bits()
            | Self::SMBUS_WRITE_BLOCK_DATA.bits()
            | Self::SMBUS_I2C_BLOCK.bits()
            | Self::SMBUS_PEC.bits();
    }
}

/// What a DP AUX channel offers as an I2C adapter.
pub const DP_I2C_FUNCTIONALITY: I2cFunctionality = I2cFunctionality::I2C
    .union(I2cFunctionality::SMBUS_EMUL)
    .union(I2cFunctionality::SMBUS_READ_BLOCK_DATA)
    .union(I2cFunctionality::SMBUS_BLOCK_PROC_CALL)
    .union(I2cFunctionality::TEN_BIT_ADDR);

/// Adapter class for display data channels.
pub const I2C_CLASS_DDC: u32 = 1 << 3;

/// Longest adapter name the I2C core stores.
pub const I2C_NAME_MAX: usize = 47;

/// Description handed to [`BusRegistry::add_adapter`](crate::BusRegistry::add_adapter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    pub name: String,
    pub class: u32,
    pub retries: u32,
    pub functionality: I2cFunctionality,
}

impl AdapterInfo {
    pub fn new(name: &str) -> Self {
        let mut end = name.len().min(I2C_NAME_MAX);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        Self {
            name: String::from(&name[..end]),
            class: I2C_CLASS_DDC,
            retries: 3,
            functionality: DP_I2C_FUNCTIONALITY,
        }
    }
}

/// One I2C message of a combined transfer.
///
/// `RD` in `flags` must agree with the payload direction; the constructors
/// take care of that.
#[derive(Debug)]
pub struct I2cMsg<'a> {
    pub addr: u16,
    pub flags: I2cMsgFlags,
    pub payload: AuxPayload<'a>,
}

impl<'a> I2cMsg<'a> {
    pub fn read(addr: u16, buf: &'a mut [u8]) -> Self {
        Self {
            addr,
            flags: I2cMsgFlags::RD,
            payload: AuxPayload::Read(buf),
        }
    }

    pub fn write(addr: u16, buf: &'a [u8]) -> Self {
        Self {
            addr,
            flags: I2cMsgFlags::empty(),
            payload: AuxPayload::Write(buf),
        }
    }

    #[must_use]
    pub fn with_stop(mut self) -> Self {
        self.flags |= I2cMsgFlags::STOP;
        self
    }

    /// AUX request carrying this message; MOT unless it ends with STOP.
    pub fn request(&self) -> AuxRequest {
        let kind = if self.flags.contains(I2cMsgFlags::RD) {
            RequestKind::I2cRead
        } else {
            RequestKind::I2cWrite
        };
        AuxRequest::new(kind).with_mot(!self.flags.contains(I2cMsgFlags::STOP))
    }
}

/// Best-case duration of the AUX request in microseconds.
pub fn aux_req_duration(request: AuxRequest, size: usize) -> u32 {
    let mut len = AUX_PRECHARGE_LEN
        + AUX_SYNC_LEN
        + AUX_STOP_LEN
        + AUX_CMD_LEN
        + AUX_ADDRESS_LEN
        + AUX_LENGTH_LEN;
    if !request.is_read() {
        len += size as u32 * 8;
    }
    len
}

/// Best-case duration of the AUX reply in microseconds.
///
/// Write replies carry zero or one data byte; zero is assumed.
pub fn aux_reply_duration(request: AuxRequest, size: usize) -> u32 {
    let mut len = AUX_PRECHARGE_LEN + AUX_SYNC_LEN + AUX_STOP_LEN + AUX_CMD_LEN + AUX_REPLY_PAD_LEN;
    if request.is_read() {
        len += size as u32 * 8;
    }
    len
}

/// Worst-case duration of the I2C transfer behind an AUX transaction.
///
/// Assumes every message carries its own START, address and STOP and
/// ignores clock stretching.
pub fn i2c_msg_duration(size: usize, speed_khz: u32) -> u32 {
    let bits = I2C_START_LEN + I2C_ADDR_LEN + size as u32 * I2C_DATA_LEN + I2C_STOP_LEN;
    (bits * 1000).div_ceil(speed_khz.max(1))
}

/// AUX attempts needed to cover the I2C transfer time.
pub fn i2c_retry_count(request: AuxRequest, size: usize, speed_khz: u32) -> u32 {
    let aux_time_us = aux_req_duration(request, size) + aux_reply_duration(request, size);
    let i2c_time_us = i2c_msg_duration(size, speed_khz);
    i2c_time_us.div_ceil(aux_time_us + AUX_RETRY_INTERVAL_US)
}

impl<T: AuxTransfer, D: Delay> AuxChannel<T, D> {
    /// Run one I2C-over-AUX transaction until it is acked or the budget
    /// runs out. Returns the byte count of the acked attempt.
    ///
    /// A short ACK or an I2C DEFER on a write turns `msg` into a write
    /// status update, so callers see the request it ended with.
    pub(crate) fn i2c_do_msg(&self, msg: &mut AuxMessage<'_>) -> Result<usize, AuxError> {
        let max_retries = I2C_MIN_RETRIES.max(i2c_retry_count(
            msg.request,
            msg.size(),
            self.i2c.speed_khz,
        ));
        let mut defer_i2c = 0;
        let mut retry = 0;

        while retry < max_retries + defer_i2c {
            retry += 1;

            let ret = match self.raw_transfer(msg) {
                Ok(n) => n,
                Err(AuxError::Busy) => continue,
                Err(err) => {
                    if err.is_timeout() {
                        if self.timeout_log.check() {
                            log::debug!("{}: transaction timed out", self.name());
                        }
                    } else {
                        log::debug!("{}: transaction failed: {}", self.name(), err);
                    }
                    return Err(err);
                }
            };

            match msg.reply.native() {
                NativeReply::Ack => {}
                NativeReply::Nack => {
                    log::debug!(
                        "{}: native nack (result={}, size={})",
                        self.name(),
                        ret,
                        msg.size()
                    );
                    return Err(AuxError::RemoteIo);
                }
                NativeReply::Defer => {
                    log::debug!("{}: native defer", self.name());
                    self.delay.aux_retry_wait();
                    continue;
                }
                NativeReply::Invalid => {
                    log::error!("{}: invalid native reply {:#04x}", self.name(), msg.reply.0);
                    return Err(AuxError::RemoteIo);
                }
            }

            match msg.reply.i2c() {
                I2cReply::Ack => {
                    if ret != msg.size() {
                        msg.switch_to_write_status_update();
                    }
                    return Ok(ret);
                }
                I2cReply::Nack => {
                    log::debug!(
                        "{}: I2C nack (result={}, size={})",
                        self.name(),
                        ret,
                        msg.size()
                    );
                    self.note_i2c_nack();
                    return Err(AuxError::RemoteIo);
                }
                I2cReply::Defer => {
                    log::debug!("{}: I2C defer", self.name());
                    self.note_i2c_defer();
                    if defer_i2c < I2C_MAX_DEFER_RETRIES {
                        defer_i2c += 1;
                    }
                    self.delay.aux_retry_wait();
                    msg.switch_to_write_status_update();
                }
                I2cReply::Invalid => {
                    log::error!("{}: invalid I2C reply {:#04x}", self.name(), msg.reply.0);
                    return Err(AuxError::RemoteIo);
                }
            }
        }

        log::debug!("{}: Too many retries, giving up", self.name());
        Err(AuxError::RemoteIo)
    }

    /// Move one chunk, repeating transactions until every byte went through.
    ///
    /// Returns the transfer size to use for the next chunk: the smallest
    /// partial reply seen, or the chunk size if none was short.
    fn i2c_drain_msg(
        &self,
        address: u32,
        mut request: AuxRequest,
        mut chunk: AuxPayload<'_>,
    ) -> Result<usize, AuxError> {
        let size = chunk.len();
        let mut recommended = size;
        let mut done = 0;

        while done < size {
            let remaining = size - done;
            let mut msg = AuxMessage::new(address, request, chunk.slice(done, size));
            let n = self.i2c_do_msg(&mut msg)?;
            request = msg.request;

            if n == 0 {
                return Err(AuxError::Protocol);
            }
            if n < remaining && n < recommended {
                log::debug!(
                    "{}: Partial I2C reply: requested {} bytes got {} bytes",
                    self.name(),
                    remaining,
                    n
                );
                recommended = n;
            }
            done += n.min(remaining);
        }

        Ok(recommended)
    }

    fn i2c_transfer_msgs(
        &self,
        msgs: &mut [I2cMsg<'_>],
        tail: &mut (u32, AuxRequest),
    ) -> Result<(), AuxError> {
        for i2c_msg in msgs.iter_mut() {
            let address = u32::from(i2c_msg.addr);
            let request = i2c_msg.request();
            *tail = (address, request);

            // Zero-sized messages address the slave without moving data
            let mut bare = AuxMessage::new(address, request, AuxPayload::empty());
            self.i2c_do_msg(&mut bare)?;

            // As large as possible, smaller after short replies
            let len = i2c_msg.payload.len();
            let mut transfer_size = self.i2c.transfer_size;
            let mut offset = 0;
            while offset < len {
                let end = offset + transfer_size.min(len - offset);
                transfer_size =
                    self.i2c_drain_msg(address, request, i2c_msg.payload.slice(offset, end))?;
                offset = end;
            }
        }
        Ok(())
    }

    /// Execute a combined I2C transfer. Returns the number of messages.
    ///
    /// Exchanges on one channel never interleave: the DDC bus stays owned
    /// from the first address packet until the close. The closing bare
    /// packet is sent even after a failure and its own result is ignored.
    pub fn i2c_transfer(&self, msgs: &mut [I2cMsg<'_>]) -> Result<usize, AuxError> {
        let _bus = self.ddc_bus.lock();
        let mut tail = (0, AuxRequest::new(RequestKind::I2cWrite));
        let result = self.i2c_transfer_msgs(msgs, &mut tail);

        let (address, request) = tail;
        let mut close = AuxMessage::new(address, request.with_mot(false), AuxPayload::empty());
        let _ = self.i2c_do_msg(&mut close);

        result.map(|()| msgs.len())
    }

    /// The channel's DDC bus as an I2C adapter.
    pub fn ddc(&self) -> DdcAdapter<'_, T, D> {
        DdcAdapter { aux: self }
    }
}

/// Minimal I2C master interface.
pub trait I2cBus {
    /// Run `msgs` as one combined transfer. Returns the number of messages.
    fn master_xfer(&self, msgs: &mut [I2cMsg<'_>]) -> Result<usize, AuxError>;

    fn functionality(&self) -> I2cFunctionality;

    /// Write `data` then read `buf.len()` bytes with a repeated start.
    fn write_read(&self, addr: u16, data: &[u8], buf: &mut [u8]) -> Result<(), AuxError> {
        let mut msgs = [I2cMsg::write(addr, data), I2cMsg::read(addr, buf)];
        self.master_xfer(&mut msgs).map(|_| ())
    }
}

/// I2C view of an [`AuxChannel`].
pub struct DdcAdapter<'a, T, D> {
    aux: &'a AuxChannel<T, D>,
}

impl<T: AuxTransfer, D: Delay> I2cBus for DdcAdapter<'_, T, D> {
    fn master_xfer(&self, msgs: &mut [I2cMsg<'_>]) -> Result<usize, AuxError> {
        self.aux.i2c_transfer(msgs)
    }

    fn functionality(&self) -> I2cFunctionality {
        DP_I2C_FUNCTIONALITY
    }
}
