// CRC capture worker driven by a fake display pipeline.

mod common;

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use common::{FakeSink, Harness, SinkState};
use dp_aux::{AuxError, CrcPipeline, CrcTriple, regs};

/// Every vblank the sink produces a new frame CRC equal to the frame number.
struct Pipeline {
    sink: Arc<Mutex<SinkState>>,
    wanted: AtomicBool,
    frame: AtomicU32,
    entries: Mutex<Vec<CrcTriple>>,
}

impl Pipeline {
    fn new(sink: Arc<Mutex<SinkState>>) -> Arc<Self> {
        Arc::new(Self {
            sink,
            wanted: AtomicBool::new(true),
            frame: AtomicU32::new(0),
            entries: Mutex::new(Vec::new()),
        })
    }

    fn entries(&self) -> Vec<CrcTriple> {
        self.entries.lock().unwrap().clone()
    }

    fn wait_for_entries(&self, n: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.entries.lock().unwrap().len() < n {
            assert!(Instant::now() < deadline, "no CRCs captured");
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

impl CrcPipeline for Pipeline {
    fn capture_wanted(&self) -> bool {
        self.wanted.load(Ordering::SeqCst)
    }

    fn wait_for_vblank(&self) {
        std::thread::sleep(Duration::from_millis(1));
        let frame = self.frame.fetch_add(1, Ordering::SeqCst) + 1;
        let crc = (frame as u16).to_le_bytes();

        let mut sink = self.sink.lock().unwrap();
        let base = regs::TEST_CRC_R_CR as usize;
        for i in 0..3 {
            sink.dpcd[base + 2 * i..base + 2 * i + 2].copy_from_slice(&crc);
        }
        sink.dpcd[regs::TEST_SINK_MISC as usize] =
            regs::TEST_CRC_SUPPORTED | (frame as u8 & regs::TEST_COUNT_MASK);
    }

    fn add_crc_entry(&self, crcs: CrcTriple) {
        self.entries.lock().unwrap().push(crcs);
    }
}

#[test]
fn test_capture_start_stop() {
    let h = Harness::new();
    let aux = &h.aux;
    let pipeline = Pipeline::new(Arc::clone(&h.sink));

    aux.start_crc(pipeline.clone()).unwrap();
    assert!(aux.crc_running());
    assert_eq!(h.peek(regs::TEST_SINK) & regs::TEST_SINK_START, regs::TEST_SINK_START);

    pipeline.wait_for_entries(3);
    aux.stop_crc().unwrap();
    assert!(!aux.crc_running());
    assert_eq!(h.peek(regs::TEST_SINK) & regs::TEST_SINK_START, 0);

    // Nothing arrives once stop_crc returned
    let captured = pipeline.entries();
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(pipeline.entries(), captured);

    // Each entry is a frame number, strictly increasing
    for pair in captured.windows(2) {
        assert!(pair[0][0] < pair[1][0], "{captured:?}");
    }
    for crc in &captured {
        assert_eq!(crc[0], crc[1]);
        assert_eq!(crc[1], crc[2]);
    }
}

#[test]
fn test_second_start_is_busy() {
    let h = Harness::new();
    let aux = &h.aux;
    let pipeline = Pipeline::new(Arc::clone(&h.sink));

    aux.start_crc(pipeline.clone()).unwrap();
    assert_eq!(aux.start_crc(pipeline.clone()), Err(AuxError::Busy));
    aux.stop_crc().unwrap();

    // Restartable after a stop
    aux.start_crc(pipeline.clone()).unwrap();
    aux.stop_crc().unwrap();
}

#[test]
fn test_worker_exits_when_capture_unwanted() {
    let h = Harness::new();
    let aux = &h.aux;
    let pipeline = Pipeline::new(Arc::clone(&h.sink));

    aux.start_crc(pipeline.clone()).unwrap();
    pipeline.wait_for_entries(1);
    pipeline.wanted.store(false, Ordering::SeqCst);

    // The worker stops on its own; stop_crc only reaps it
    std::thread::sleep(Duration::from_millis(20));
    let captured = pipeline.entries().len();
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(pipeline.entries().len(), captured);
    aux.stop_crc().unwrap();
}

#[test]
fn test_stop_without_worker() {
    let h = Harness::new();
    let aux = &h.aux;
    h.poke(regs::TEST_SINK, &[regs::TEST_SINK_START | 0x40]);
    aux.stop_crc().unwrap();
    assert_eq!(h.peek(regs::TEST_SINK), 0x40);
}

/// Starting against a slow sink does not block callers asking about the
/// worker.
#[test]
fn test_start_does_not_block_state_queries() {
    let h = Harness::with_sink(FakeSink::new().with_hold(Duration::from_millis(50)));
    let pipeline = Pipeline::new(Arc::clone(&h.sink));

    std::thread::scope(|s| {
        let aux = &h.aux;
        let starter = s.spawn({
            let pipeline = pipeline.clone();
            move || aux.start_crc(pipeline)
        });

        // Inside the first sink transfer of start_crc
        std::thread::sleep(Duration::from_millis(20));
        let begin = Instant::now();
        assert!(aux.crc_running());
        assert_eq!(aux.start_crc(pipeline.clone()), Err(AuxError::Busy));
        assert!(begin.elapsed() < Duration::from_millis(40), "{:?}", begin.elapsed());

        starter.join().unwrap().unwrap();
    });

    h.aux.stop_crc().unwrap();
    assert!(!h.aux.crc_running());
}
