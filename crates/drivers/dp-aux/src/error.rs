//! AUX channel error type.
//!
//! Error codes live in the 0x0Dxx range (DisplayPort AUX subsystem).

use dp_error::define_driver_error;
pub use dp_error::{AsErrno, Errno};

define_driver_error! {
    pub enum AuxError(0x0D) {
        /// Transport is busy; native and I2C transfers retry on this.
        Busy = 0x01 [EBUSY] => "AUX channel busy",
        /// No reply from the sink. Normal when probing absent devices.
        TimedOut = 0x02 [ETIMEDOUT] => "AUX transaction timed out",
        /// Native NACK/DEFER, or native retries exhausted.
        Io = 0x03 [EIO] => "AUX transaction failed",
        /// Reply received but the byte count is wrong.
        Protocol = 0x04 [EPROTO] => "Short AUX reply",
        /// Sink rejected an I2C-over-AUX transaction or retries ran out.
        RemoteIo = 0x05 [EREMOTEIO] => "Remote I/O error",
        /// Nothing new to report yet (CRC sample not updated).
        Again = 0x06 [EAGAIN] => "Try again",
        InvalidArgument = 0x07 [EINVAL] => "Invalid argument",
        /// Sink did not request the compliance test being answered.
        NotSupported = 0x08 [EOPNOTSUPP] => "Operation not supported by sink",
        AlreadyRegistered = 0x09 [EEXIST] => "AUX channel already registered",
        /// Sink reports that CRC generation is not running.
        CaptureStopped = 0x0A [ENODATA] => "CRC capture not running on sink",
        WorkerSpawn = 0x0B [ENOMEM] => "Failed to start CRC worker",
        /// Any other error reported by the transport, kept as-is.
        Transport(Errno) = 0x10 => "Transport error",
    }
}

impl AuxError {
    /// Timeouts are expected when nothing is connected.
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut)
    }
}
