//! AUX transaction messages.
//!
//! An [`AuxMessage`] is what the driver's [`AuxTransfer`](crate::AuxTransfer)
//! sees for one physical transfer: address, request code, payload and the
//! reply byte the hardware reports back.

use crate::regs;

/// Request command, without the middle-of-transaction bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RequestKind {
    I2cWrite = regs::AUX_I2C_WRITE,
    I2cRead = regs::AUX_I2C_READ,
    /// Ask an I2C write that was deferred or short-acked how far it got.
    I2cWriteStatusUpdate = regs::AUX_I2C_WRITE_STATUS_UPDATE,
    NativeWrite = regs::AUX_NATIVE_WRITE,
    NativeRead = regs::AUX_NATIVE_READ,
}

impl RequestKind {
    pub const fn is_native(self) -> bool {
        matches!(self, Self::NativeRead | Self::NativeWrite)
    }
}

/// Full AUX request: command plus the I2C "middle of transaction" flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AuxRequest {
    pub kind: RequestKind,
    /// More I2C transactions follow; the sink keeps the I2C bus claimed.
    pub mot: bool,
}

impl AuxRequest {
    pub const NATIVE_READ: Self = Self::new(RequestKind::NativeRead);
    pub const NATIVE_WRITE: Self = Self::new(RequestKind::NativeWrite);

    pub const fn new(kind: RequestKind) -> Self {
        Self { kind, mot: false }
    }

    #[must_use]
    pub const fn with_mot(mut self, mot: bool) -> Self {
        self.mot = mot;
        self
    }

    /// Wire encoding of the request nibble.
    pub const fn bits(self) -> u8 {
        let mot = if self.mot { regs::AUX_I2C_MOT } else { 0 };
        self.kind as u8 | mot
    }

    /// Decode a request nibble; `None` for reserved encodings.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        let mot = bits & regs::AUX_I2C_MOT != 0;
        let kind = match bits & !regs::AUX_I2C_MOT {
            regs::AUX_I2C_WRITE => RequestKind::I2cWrite,
            regs::AUX_I2C_READ => RequestKind::I2cRead,
            regs::AUX_I2C_WRITE_STATUS_UPDATE => RequestKind::I2cWriteStatusUpdate,
            regs::AUX_NATIVE_WRITE if !mot => RequestKind::NativeWrite,
            regs::AUX_NATIVE_READ if !mot => RequestKind::NativeRead,
            _ => return None,
        };
        Some(Self { kind, mot })
    }

    /// Whether the request moves data from sink to source.
    pub const fn is_read(self) -> bool {
        self.bits() & regs::AUX_I2C_READ != 0
    }
}

/// Native (AUX-level) reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeReply {
    Ack,
    Nack,
    Defer,
    /// Reserved encoding; the sink is misbehaving.
    Invalid,
}

/// I2C-level reply code, meaningful only after a native ACK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum I2cReply {
    Ack,
    Nack,
    Defer,
    Invalid,
}

/// Reply byte as filled in by the transfer implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuxReply(pub u8);

impl AuxReply {
    pub const ACK: Self = Self(regs::AUX_NATIVE_REPLY_ACK | regs::AUX_I2C_REPLY_ACK);
    pub const NATIVE_NACK: Self = Self(regs::AUX_NATIVE_REPLY_NACK);
    pub const NATIVE_DEFER: Self = Self(regs::AUX_NATIVE_REPLY_DEFER);
    pub const I2C_NACK: Self = Self(regs::AUX_NATIVE_REPLY_ACK | regs::AUX_I2C_REPLY_NACK);
    pub const I2C_DEFER: Self = Self(regs::AUX_NATIVE_REPLY_ACK | regs::AUX_I2C_REPLY_DEFER);

    pub const fn native(self) -> NativeReply {
        match self.0 & regs::AUX_NATIVE_REPLY_MASK {
            regs::AUX_NATIVE_REPLY_ACK => NativeReply::Ack,
            regs::AUX_NATIVE_REPLY_NACK => NativeReply::Nack,
            regs::AUX_NATIVE_REPLY_DEFER => NativeReply::Defer,
            _ => NativeReply::Invalid,
        }
    }

    pub const fn i2c(self) -> I2cReply {
        match self.0 & regs::AUX_I2C_REPLY_MASK {
            regs::AUX_I2C_REPLY_ACK => I2cReply::Ack,
            regs::AUX_I2C_REPLY_NACK => I2cReply::Nack,
            regs::AUX_I2C_REPLY_DEFER => I2cReply::Defer,
            _ => I2cReply::Invalid,
        }
    }
}

/// Data carried by a message.
///
/// Reads borrow the caller's buffer mutably so the transfer can fill it in
/// place; writes only need to look at the bytes.
#[derive(Debug)]
pub enum AuxPayload<'a> {
    Read(&'a mut [u8]),
    Write(&'a [u8]),
}

impl<'a> AuxPayload<'a> {
    /// Zero-length payload, used for bare address transactions.
    pub const fn empty() -> Self {
        Self::Write(&[])
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Read(buf) => buf.len(),
            Self::Write(buf) => buf.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        match self {
            Self::Read(buf) => &**buf,
            Self::Write(buf) => buf,
        }
    }

    /// Destination buffer for read replies; `None` for writes.
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        match self {
            Self::Read(buf) => Some(&mut **buf),
            Self::Write(_) => None,
        }
    }

    /// Reborrow the byte range `start..end` as a new payload.
    pub fn slice(&mut self, start: usize, end: usize) -> AuxPayload<'_> {
        match self {
            Self::Read(buf) => AuxPayload::Read(&mut buf[start..end]),
            Self::Write(buf) => AuxPayload::Write(&buf[start..end]),
        }
    }
}

/// One AUX transfer as handed to the transport.
///
/// The transport must only touch `reply` (and the payload bytes for reads).
#[derive(Debug)]
pub struct AuxMessage<'a> {
    /// DPCD offset for native requests, 7-bit I2C address otherwise.
    pub address: u32,
    pub request: AuxRequest,
    pub payload: AuxPayload<'a>,
    pub reply: AuxReply,
}

impl<'a> AuxMessage<'a> {
    pub fn new(address: u32, request: AuxRequest, payload: AuxPayload<'a>) -> Self {
        Self {
            address,
            request,
            payload,
            reply: AuxReply::default(),
        }
    }

    /// Requested transfer size in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Turn a pending I2C write into a WRITE_STATUS_UPDATE, keeping MOT.
    ///
    /// After an I2C DEFER or a short I2C ACK the rest of the write has to be
    /// drained with status-update requests.
    pub fn switch_to_write_status_update(&mut self) {
        if self.request.kind == RequestKind::I2cWrite {
            self.request.kind = RequestKind::I2cWriteStatusUpdate;
        }
    }
}
