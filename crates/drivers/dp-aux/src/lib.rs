//! # dp-aux
//!
//! DisplayPort AUX channel transaction engine.
//!
//! TEAM_502: Split out of the display driver so the retry logic can be
//! tested against a scripted sink.
//!
//! This crate provides:
//! - Native DPCD access with bounded retry, one locked transfer at a time
//! - I2C-over-AUX with timing-derived retry budgets and chunk draining
//! - Link status and capability decoders
//! - Sink/branch identification, quirk tables and compliance test helpers
//! - Frame CRC capture (threaded worker with the `std` feature)

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod caps;
pub mod channel;
pub mod crc;
pub mod debug;
pub mod delay;
pub mod dpcd;
pub mod error;
pub mod i2c;
pub mod link;
pub mod msg;
pub mod quirks;
pub mod regs;
pub mod sdp;
pub mod test_req;

pub use channel::{AuxChannel, AuxTransfer, BusRegistry, Lifecycle, RemoteDpcd};
pub use crc::{CrcPipeline, CrcTriple};
#[cfg(feature = "std")]
pub use delay::ThreadDelay;
pub use delay::Delay;
pub use error::{AsErrno, AuxError, Errno};
pub use i2c::{AdapterInfo, DdcAdapter, I2cBus, I2cConfig, I2cFunctionality, I2cMsg, I2cMsgFlags};
pub use link::{LinkStatus, ReceiverCaps};
pub use msg::{AuxMessage, AuxPayload, AuxReply, AuxRequest, RequestKind};
pub use quirks::{DpDesc, DpcdIdent, Quirks};
pub use test_req::PhyTestParams;
