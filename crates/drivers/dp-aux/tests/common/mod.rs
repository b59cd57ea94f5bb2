// Scripted DisplayPort sink shared by the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dp_aux::{
    AuxChannel, AuxError, AuxMessage, AuxReply, AuxRequest, AuxTransfer, Delay, I2cConfig,
};

pub const DPCD_SIZE: usize = 0x1000;

/// What the sink does for one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Reply with this code; ACKs move `count` bytes (full size if `None`).
    Reply(AuxReply, Option<usize>),
    /// Transport-level failure.
    Fail(AuxError),
}

impl Step {
    pub const ACK: Self = Self::Reply(AuxReply::ACK, None);
    pub const NATIVE_NACK: Self = Self::Reply(AuxReply::NATIVE_NACK, None);
    pub const NATIVE_DEFER: Self = Self::Reply(AuxReply::NATIVE_DEFER, None);
    pub const I2C_NACK: Self = Self::Reply(AuxReply::I2C_NACK, None);
    pub const I2C_DEFER: Self = Self::Reply(AuxReply::I2C_DEFER, None);

    pub fn short(count: usize) -> Self {
        Self::Reply(AuxReply::ACK, Some(count))
    }
}

/// One transfer as the sink saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seen {
    pub address: u32,
    pub request: AuxRequest,
    pub size: usize,
}

pub struct SinkState {
    pub dpcd: Vec<u8>,
    /// Memory of the I2C slave behind the sink (EDID at 0x50).
    pub i2c_mem: Vec<u8>,
    i2c_ptr: usize,
    /// Consumed one per transfer before falling back to `default_step`.
    pub script: VecDeque<Step>,
    pub default_step: Step,
    pub seen: Vec<Seen>,
}

impl SinkState {
    pub fn data_sizes(&self) -> Vec<usize> {
        self.seen.iter().map(|s| s.size).collect()
    }

    fn native(&mut self, msg: &mut AuxMessage<'_>, count: usize) {
        let range = msg.address as usize..msg.address as usize + count;
        if msg.request.is_read() {
            if let Some(buf) = msg.payload.as_mut_slice() {
                buf[..count].copy_from_slice(&self.dpcd[range]);
            }
        } else {
            self.dpcd[range].copy_from_slice(&msg.payload.as_slice()[..count]);
        }
    }

    fn i2c(&mut self, msg: &mut AuxMessage<'_>, count: usize) {
        if msg.request.is_read() {
            if let Some(buf) = msg.payload.as_mut_slice() {
                for byte in &mut buf[..count] {
                    *byte = self.i2c_mem[self.i2c_ptr % self.i2c_mem.len()];
                    self.i2c_ptr += 1;
                }
            }
        } else if let Some(&offset) = msg.payload.as_slice().first() {
            self.i2c_ptr = usize::from(offset);
        }
    }
}

/// Fake transport. Panics if two transfers ever overlap.
pub struct FakeSink {
    pub state: Arc<Mutex<SinkState>>,
    in_flight: Arc<AtomicBool>,
    hold: Duration,
}

impl FakeSink {
    pub fn new() -> Self {
        let mut i2c_mem = vec![0u8; 256];
        for (i, byte) in i2c_mem.iter_mut().enumerate() {
            *byte = i as u8;
        }
        Self {
            state: Arc::new(Mutex::new(SinkState {
                dpcd: vec![0; DPCD_SIZE],
                i2c_mem,
                i2c_ptr: 0,
                script: VecDeque::new(),
                default_step: Step::ACK,
                seen: Vec::new(),
            })),
            in_flight: Arc::new(AtomicBool::new(false)),
            hold: Duration::ZERO,
        }
    }

    /// Keep every transfer busy for `hold` to widen overlap windows.
    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }
}

impl AuxTransfer for FakeSink {
    fn transfer(&mut self, msg: &mut AuxMessage<'_>) -> Result<usize, AuxError> {
        assert!(
            !self.in_flight.swap(true, Ordering::SeqCst),
            "overlapping AUX transfers"
        );
        if !self.hold.is_zero() {
            std::thread::sleep(self.hold);
        }

        let result = {
            let mut state = self.state.lock().unwrap();
            state.seen.push(Seen {
                address: msg.address,
                request: msg.request,
                size: msg.size(),
            });
            let step = state.script.pop_front().unwrap_or(state.default_step);
            match step {
                Step::Fail(err) => Err(err),
                Step::Reply(reply, count) => {
                    msg.reply = reply;
                    let count = count.unwrap_or(msg.size()).min(msg.size());
                    if reply == AuxReply::ACK {
                        if msg.request.kind.is_native() {
                            state.native(msg, count);
                        } else {
                            state.i2c(msg, count);
                        }
                    }
                    Ok(count)
                }
            }
        };

        self.in_flight.store(false, Ordering::SeqCst);
        result
    }
}

/// Records every requested sleep without sleeping.
#[derive(Clone, Default)]
pub struct RecordingDelay(pub Arc<Mutex<Vec<(u32, u32)>>>);

impl RecordingDelay {
    pub fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

impl Delay for RecordingDelay {
    fn sleep_range_us(&self, min_us: u32, max_us: u32) {
        self.0.lock().unwrap().push((min_us, max_us));
    }
}

pub struct Harness {
    pub aux: Arc<AuxChannel<FakeSink, RecordingDelay>>,
    pub sink: Arc<Mutex<SinkState>>,
    pub delay: RecordingDelay,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(FakeSink::new(), I2cConfig::default())
    }

    pub fn with_sink(sink: FakeSink) -> Self {
        Self::build(sink, I2cConfig::default())
    }

    pub fn with_config(config: I2cConfig) -> Self {
        Self::build(FakeSink::new(), config)
    }

    fn build(sink: FakeSink, config: I2cConfig) -> Self {
        let state = Arc::clone(&sink.state);
        let delay = RecordingDelay::default();
        let aux = AuxChannel::new("AUX A/fake", sink, delay.clone()).with_i2c_config(config);
        Self {
            aux: Arc::new(aux),
            sink: state,
            delay,
        }
    }

    pub fn script(&self, steps: impl IntoIterator<Item = Step>) {
        self.sink.lock().unwrap().script.extend(steps);
    }

    pub fn set_default(&self, step: Step) {
        self.sink.lock().unwrap().default_step = step;
    }

    pub fn poke(&self, offset: u32, bytes: &[u8]) {
        let start = offset as usize;
        self.sink.lock().unwrap().dpcd[start..start + bytes.len()].copy_from_slice(bytes);
    }

    pub fn peek(&self, offset: u32) -> u8 {
        self.sink.lock().unwrap().dpcd[offset as usize]
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.sink.lock().unwrap().seen.clone()
    }

    pub fn clear_seen(&self) {
        self.sink.lock().unwrap().seen.clear();
    }
}
