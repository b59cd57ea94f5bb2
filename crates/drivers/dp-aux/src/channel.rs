//! AUX channel state and lifecycle.
//!
//! An [`AuxChannel`] owns everything shared by the operations on one
//! physical (or MST-virtual) AUX link: the transport behind its lock, the
//! sleeper, the I2C tunables and the diagnostic counters.
//!
//! Lifecycle:
//! ```text
//! Uninitialized -> Initialized -> Registered -> Unregistered
//!       \__________________________/ (register auto-initializes)
//! ```

use alloc::boxed::Box;
use alloc::string::String;
use core::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use dp_utils::{Mutex, RateLimit};

use crate::delay::Delay;
use crate::error::AuxError;
use crate::i2c::{AdapterInfo, I2cConfig};
use crate::msg::AuxMessage;

/// Performs exactly one physical AUX transaction.
///
/// Implementations must fill in `msg.reply`, may write read data into the
/// payload and must leave every other field alone. A call may transfer
/// fewer bytes than requested; the return value says how many went through.
/// Calls are retried freely, so they have to be safe to repeat.
pub trait AuxTransfer: Send {
    fn transfer(&mut self, msg: &mut AuxMessage<'_>) -> Result<usize, AuxError>;
}

/// DPCD access routed through an MST branch instead of the local AUX link.
pub trait RemoteDpcd: Send + Sync {
    fn dpcd_read(&self, offset: u32, buf: &mut [u8]) -> Result<usize, AuxError>;
    fn dpcd_write(&self, offset: u32, buf: &[u8]) -> Result<usize, AuxError>;
}

/// Host subsystem a channel publishes itself to when registered.
pub trait BusRegistry {
    /// Create the user-visible AUX device node for `name`.
    fn register_devnode(&mut self, name: &str) -> Result<(), AuxError>;
    fn unregister_devnode(&mut self, name: &str);
    /// Expose the channel's DDC bus as an I2C adapter.
    fn add_adapter(&mut self, info: &AdapterInfo) -> Result<(), AuxError>;
    fn del_adapter(&mut self, name: &str);
}

/// Channel lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Constructed, nothing set up yet.
    Uninitialized,
    /// Usable by the driver but not visible to the rest of the system.
    Initialized,
    /// Devnode and I2C adapter published.
    Registered,
    /// Devnode and adapter removed; may be registered again.
    Unregistered,
}

impl Lifecycle {
    pub fn is_registered(self) -> bool {
        self == Self::Registered
    }
}

/// One DisplayPort AUX channel.
pub struct AuxChannel<T, D> {
    /// Used as prefix in every log line and as the bus name.
    name: String,
    /// Held across exactly one raw transfer.
    hw: Mutex<T>,
    /// Held across one whole I2C exchange, open packet to close packet.
    /// Native DPCD access does not take it.
    pub(crate) ddc_bus: Mutex<()>,
    pub(crate) delay: D,
    remote: Option<Box<dyn RemoteDpcd>>,
    pub(crate) i2c: I2cConfig,
    /// Last TEST_SINK_MISC count seen by the CRC reader.
    pub(crate) crc_count: AtomicU8,
    i2c_nack_count: AtomicU32,
    i2c_defer_count: AtomicU32,
    pub(crate) timeout_log: RateLimit,
    state: Mutex<Lifecycle>,
    #[cfg(feature = "std")]
    pub(crate) crc_worker: Mutex<crate::crc::CrcSlot>,
}

impl<T: AuxTransfer, D: Delay> AuxChannel<T, D> {
    pub fn new(name: impl Into<String>, transport: T, delay: D) -> Self {
        Self {
            name: name.into(),
            hw: Mutex::new(transport),
            ddc_bus: Mutex::new(()),
            delay,
            remote: None,
            i2c: I2cConfig::default(),
            crc_count: AtomicU8::new(0),
            i2c_nack_count: AtomicU32::new(0),
            i2c_defer_count: AtomicU32::new(0),
            timeout_log: RateLimit::default(),
            state: Mutex::new(Lifecycle::Uninitialized),
            #[cfg(feature = "std")]
            crc_worker: Mutex::new(crate::crc::CrcSlot::Idle),
        }
    }

    #[must_use]
    pub fn with_i2c_config(mut self, config: I2cConfig) -> Self {
        self.i2c = config;
        self
    }

    /// Route DPCD reads and writes through an MST branch.
    ///
    /// I2C-over-AUX still goes through the local transport.
    #[must_use]
    pub fn with_remote(mut self, remote: Box<dyn RemoteDpcd>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub(crate) fn remote(&self) -> Option<&dyn RemoteDpcd> {
        self.remote.as_deref()
    }

    pub fn i2c_config(&self) -> I2cConfig {
        self.i2c
    }

    pub fn state(&self) -> Lifecycle {
        *self.state.lock()
    }

    /// I2C NACK replies seen since the channel was created.
    pub fn i2c_nack_count(&self) -> u32 {
        self.i2c_nack_count.load(Ordering::Relaxed)
    }

    /// I2C DEFER replies seen since the channel was created.
    pub fn i2c_defer_count(&self) -> u32 {
        self.i2c_defer_count.load(Ordering::Relaxed)
    }

    pub(crate) fn note_i2c_nack(&self) {
        self.i2c_nack_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn note_i2c_defer(&self) {
        self.i2c_defer_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Prepare the channel for use by the driver.
    ///
    /// Has no effect on a registered channel.
    pub fn init(&self) {
        let mut state = self.state.lock();
        if state.is_registered() {
            log::warn!("{}: init on registered AUX channel ignored", self.name);
            return;
        }
        *state = Lifecycle::Initialized;
        log::debug!("{}: AUX channel initialized", self.name);
    }

    /// Publish the devnode and the DDC adapter.
    ///
    /// An uninitialized channel is initialized first. If the adapter cannot
    /// be added the devnode is removed again and the state is unchanged.
    pub fn register(&self, registry: &mut dyn BusRegistry) -> Result<(), AuxError> {
        let mut state = self.state.lock();
        match *state {
            Lifecycle::Registered => return Err(AuxError::AlreadyRegistered),
            Lifecycle::Uninitialized => {
                *state = Lifecycle::Initialized;
                log::debug!("{}: AUX channel initialized", self.name);
            }
            Lifecycle::Initialized | Lifecycle::Unregistered => {}
        }

        registry.register_devnode(&self.name)?;

        let info = AdapterInfo::new(&self.name);
        if let Err(err) = registry.add_adapter(&info) {
            log::debug!("{}: failed to add I2C adapter: {}", self.name, err);
            registry.unregister_devnode(&self.name);
            return Err(err);
        }

        *state = Lifecycle::Registered;
        log::debug!("{}: registered as {}", self.name, info.name);
        Ok(())
    }

    /// Remove the devnode and adapter. A no-op unless registered.
    pub fn unregister(&self, registry: &mut dyn BusRegistry) {
        let mut state = self.state.lock();
        if !state.is_registered() {
            log::debug!("{}: unregister while {:?}", self.name, *state);
            return;
        }
        registry.unregister_devnode(&self.name);
        registry.del_adapter(&self.name);
        *state = Lifecycle::Unregistered;
    }

    /// Issue one physical transfer with the channel lock held.
    pub(crate) fn raw_transfer(&self, msg: &mut AuxMessage<'_>) -> Result<usize, AuxError> {
        let mut hw = self.hw.lock();
        hw.transfer(msg)
    }
}
