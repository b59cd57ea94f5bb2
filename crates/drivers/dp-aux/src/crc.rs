//! Frame CRC capture through the sink's TEST_SINK registers.
//!
//! With the `std` feature a worker thread polls the sink once per vblank
//! and forwards every new CRC triple to the display pipeline.

use core::sync::atomic::Ordering;

use crate::channel::{AuxChannel, AuxTransfer};
use crate::delay::Delay;
use crate::error::AuxError;
use crate::regs;

/// One CRC per color component (R/Cr, G/Y, B/Cb).
pub type CrcTriple = [u32; 3];

/// Display pipeline the CRCs are captured for.
pub trait CrcPipeline: Send + Sync {
    /// Userspace still has the CRC source open.
    fn capture_wanted(&self) -> bool;
    /// Block until the next vertical blank.
    fn wait_for_vblank(&self);
    fn add_crc_entry(&self, crcs: CrcTriple);
}

impl<T: AuxTransfer, D: Delay> AuxChannel<T, D> {
    /// Fetch the CRC of the last frame.
    ///
    /// Returns [`AuxError::Again`] if the sink has not produced a new one
    /// since the previous call and [`AuxError::CaptureStopped`] if CRC
    /// generation is off.
    pub fn read_crc(&self) -> Result<CrcTriple, AuxError> {
        let sink = self.dpcd_readb(regs::TEST_SINK)?;
        if sink & regs::TEST_SINK_START == 0 {
            log::debug!("{}: TEST_SINK_START is clear", self.name());
            return Err(AuxError::CaptureStopped);
        }

        let count = self.dpcd_readb(regs::TEST_SINK_MISC)? & regs::TEST_COUNT_MASK;
        if count == self.crc_count.load(Ordering::Relaxed) {
            return Err(AuxError::Again);
        }
        self.crc_count.store(count, Ordering::Relaxed);

        // Two bytes per component, little endian
        let mut raw = [0u8; 6];
        self.dpcd_read_exact(regs::TEST_CRC_R_CR, &mut raw)?;
        Ok([
            u32::from(u16::from_le_bytes([raw[0], raw[1]])),
            u32::from(u16::from_le_bytes([raw[2], raw[3]])),
            u32::from(u16::from_le_bytes([raw[4], raw[5]])),
        ])
    }
}

#[cfg(feature = "std")]
pub(crate) use worker::CrcSlot;

#[cfg(feature = "std")]
mod worker {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread::JoinHandle;

    use super::CrcPipeline;
    use crate::channel::{AuxChannel, AuxTransfer};
    use crate::delay::Delay;
    use crate::error::AuxError;
    use crate::regs;

    /// Handle of a running capture thread.
    pub(crate) struct CrcWorker {
        stop: Arc<AtomicBool>,
        handle: JoinHandle<()>,
    }

    impl CrcWorker {
        fn join(self) {
            self.stop.store(true, Ordering::Release);
            if self.handle.join().is_err() {
                log::warn!("CRC worker panicked");
            }
        }
    }

    /// Capture worker slot of a channel.
    #[derive(Default)]
    pub(crate) enum CrcSlot {
        #[default]
        Idle,
        /// Claimed by a `start_crc` that is still talking to the sink.
        Starting,
        Running(CrcWorker),
    }

    impl<T, D> AuxChannel<T, D>
    where
        T: AuxTransfer + 'static,
        D: Delay + 'static,
    {
        /// Enable CRC generation on the sink and start forwarding CRCs to
        /// `pipeline` until it stops wanting them or [`stop_crc`](Self::stop_crc).
        pub fn start_crc(self: &Arc<Self>, pipeline: Arc<dyn CrcPipeline>) -> Result<(), AuxError> {
            {
                let mut slot = self.crc_worker.lock();
                if !matches!(*slot, CrcSlot::Idle) {
                    return Err(AuxError::Busy);
                }
                *slot = CrcSlot::Starting;
            }

            // The slot lock is not held across sink I/O
            let ret = self.spawn_crc_worker(pipeline);
            let mut slot = self.crc_worker.lock();
            match ret {
                Ok(worker) => {
                    *slot = CrcSlot::Running(worker);
                    Ok(())
                }
                Err(err) => {
                    *slot = CrcSlot::Idle;
                    Err(err)
                }
            }
        }

        fn spawn_crc_worker(
            self: &Arc<Self>,
            pipeline: Arc<dyn CrcPipeline>,
        ) -> Result<CrcWorker, AuxError> {
            let sink = self.dpcd_readb(regs::TEST_SINK)?;
            self.dpcd_writeb(regs::TEST_SINK, sink | regs::TEST_SINK_START)?;
            self.crc_count.store(0, Ordering::Relaxed);

            let stop = Arc::new(AtomicBool::new(false));
            let aux = Arc::clone(self);
            let worker_stop = Arc::clone(&stop);
            let handle = std::thread::Builder::new()
                .name(std::format!("{}-crc", self.name()))
                .spawn(move || aux.crc_work(pipeline.as_ref(), &worker_stop))
                .map_err(|err| {
                    log::debug!("{}: failed to spawn CRC worker: {}", self.name(), err);
                    AuxError::WorkerSpawn
                })?;

            Ok(CrcWorker { stop, handle })
        }

        /// Disable CRC generation and wait for the worker to exit.
        ///
        /// Once this returns no further CRC is delivered. If the sink
        /// cannot be reached the worker keeps running and the error is
        /// returned.
        pub fn stop_crc(&self) -> Result<(), AuxError> {
            let sink = self.dpcd_readb(regs::TEST_SINK)?;
            self.dpcd_writeb(regs::TEST_SINK, sink & !regs::TEST_SINK_START)?;

            let worker = {
                let mut slot = self.crc_worker.lock();
                match core::mem::take(&mut *slot) {
                    CrcSlot::Running(worker) => Some(worker),
                    other => {
                        *slot = other;
                        None
                    }
                }
            };
            if let Some(worker) = worker {
                worker.join();
            }
            Ok(())
        }

        /// A capture worker is running or being started.
        pub fn crc_running(&self) -> bool {
            !matches!(*self.crc_worker.lock(), CrcSlot::Idle)
        }

        fn crc_work(&self, pipeline: &dyn CrcPipeline, stop: &AtomicBool) {
            let wanted = || pipeline.capture_wanted() && !stop.load(Ordering::Acquire);

            while wanted() {
                pipeline.wait_for_vblank();
                if !wanted() {
                    break;
                }

                let mut ret = self.read_crc();
                if ret == Err(AuxError::Again) {
                    self.delay.sleep_range_us(1000, 2000);
                    ret = self.read_crc();
                }

                match ret {
                    Ok(crcs) => pipeline.add_crc_entry(crcs),
                    Err(AuxError::CaptureStopped) => break,
                    Err(AuxError::Again) => {
                        log::debug!("{}: Get CRC failed after retrying", self.name());
                    }
                    Err(err) => log::debug!("{}: Failed to get a CRC: {}", self.name(), err),
                }
            }
            log::debug!("{}: CRC worker done", self.name());
        }
    }
}
