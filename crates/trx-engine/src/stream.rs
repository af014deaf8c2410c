//! Sample FIFOs and stream worker handles
//!
//! The engine never touches IQ samples itself; it owns the bounded FIFOs
//! the streaming side reads/writes and the handles of the worker tasks
//! that move samples. Workers receive live parameter updates (software
//! decimation/interpolation exponent) over a command channel so a running
//! stream does not have to be restarted for a DSP-only change.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::port::Direction;

/// Initial per-channel FIFO capacity in samples (256 Ki)
pub const SAMPLE_FIFO_INIT_CAPACITY: usize = 1 << 18;

/// Floor for the rate used to derive a FIFO size
pub const SAMPLE_FIFO_MIN_RATE: u32 = 48_000;

/// One complex sample as interleaved I/Q
pub type Sample = [i16; 2];

/// FIFO size for a derived stream rate: the next power of two above the
/// rate (one second of headroom at low rates), bounded to [64 Ki, 4 Mi]
pub fn fifo_size_for_rate(rate: u32) -> usize {
    (rate.max(SAMPLE_FIFO_MIN_RATE) as usize)
        .next_power_of_two()
        .clamp(1 << 16, 1 << 22)
}

/// Bounded producer/consumer sample queue shared between the engine and
/// one stream worker
///
/// Overflow drops the newest samples and counts them; the streaming side
/// prefers losing data over blocking the producer.
#[derive(Debug)]
pub struct SampleFifo {
    inner: Mutex<FifoInner>,
    capacity: AtomicUsize,
}

#[derive(Debug)]
struct FifoInner {
    buf: VecDeque<Sample>,
    dropped: u64,
}

impl SampleFifo {
    /// Create a FIFO with the given capacity in samples
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(FifoInner {
                buf: VecDeque::with_capacity(capacity.min(SAMPLE_FIFO_INIT_CAPACITY)),
                dropped: 0,
            }),
            capacity: AtomicUsize::new(capacity),
        }
    }

    /// Current capacity in samples
    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    /// Number of queued samples
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().buf.len()
    }

    /// Check if the FIFO is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples dropped on overflow since creation
    pub fn dropped(&self) -> u64 {
        self.inner.lock().unwrap().dropped
    }

    /// Append samples, dropping whatever exceeds the capacity
    ///
    /// Returns the number of samples accepted.
    pub fn push_slice(&self, samples: &[Sample]) -> usize {
        let capacity = self.capacity();
        let mut inner = self.inner.lock().unwrap();
        let room = capacity.saturating_sub(inner.buf.len());
        let accepted = samples.len().min(room);
        inner.buf.extend(samples[..accepted].iter().copied());
        let lost = (samples.len() - accepted) as u64;
        if lost > 0 {
            inner.dropped += lost;
        }
        accepted
    }

    /// Pop up to `out.len()` samples into `out`, returning the count
    pub fn pop_slice(&self, out: &mut [Sample]) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let mut n = 0;
        while n < out.len() {
            match inner.buf.pop_front() {
                Some(sample) => {
                    out[n] = sample;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }

    /// Change the capacity, discarding the oldest samples if shrinking
    pub fn resize(&self, capacity: usize) {
        let mut inner = self.inner.lock().unwrap();
        while inner.buf.len() > capacity {
            inner.buf.pop_front();
        }
        self.capacity.store(capacity, Ordering::Relaxed);
        debug!("sample FIFO resized to {} samples", capacity);
    }

    /// Discard all queued samples
    pub fn clear(&self) {
        self.inner.lock().unwrap().buf.clear();
    }
}

/// Commands that can be sent to a running stream worker task
#[derive(Debug)]
pub enum WorkerCommand {
    /// Update the software decimation/interpolation exponent in place
    SetSoftExponent(u32),
    /// Shutdown the task
    Shutdown,
}

/// Handle to a spawned stream worker task
///
/// Dropping the handle closes the command channel, which also terminates
/// the task.
#[derive(Debug)]
pub struct WorkerHandle {
    direction: Direction,
    cmd_tx: mpsc::Sender<WorkerCommand>,
    join: tokio::task::JoinHandle<()>,
}

impl WorkerHandle {
    /// Push a new soft exponent to the running worker without restarting it
    pub fn set_soft_exponent(&self, log2_exp: u32) {
        if self
            .cmd_tx
            .try_send(WorkerCommand::SetSoftExponent(log2_exp))
            .is_err()
        {
            warn!(
                "{} worker command queue full, dropping exponent update",
                self.direction.name()
            );
        }
    }

    /// Request shutdown and release the handle
    pub fn stop(self) {
        let _ = self.cmd_tx.try_send(WorkerCommand::Shutdown);
    }

    /// Check whether the task has exited
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Spawn a stream worker for one direction
///
/// Must be called from within a tokio runtime. The worker owns its copy of
/// the soft exponent; the engine pushes updates through the handle.
pub fn spawn_worker(direction: Direction, log2_soft_exp: u32) -> WorkerHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel(8);

    let join = tokio::spawn(async move {
        let mut log2_exp = log2_soft_exp;
        info!(
            "{} stream worker started (soft exponent {})",
            direction.name(),
            log2_exp
        );

        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                WorkerCommand::SetSoftExponent(exp) => {
                    log2_exp = exp;
                    debug!(
                        "{} worker soft factor set to {}",
                        direction.name(),
                        1u32 << log2_exp
                    );
                }
                WorkerCommand::Shutdown => break,
            }
        }

        info!("{} stream worker stopped", direction.name());
    });

    WorkerHandle {
        direction,
        cmd_tx,
        join,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_bounded_push() {
        let fifo = SampleFifo::new(4);
        let accepted = fifo.push_slice(&[[1, 1], [2, 2], [3, 3], [4, 4], [5, 5]]);
        assert_eq!(accepted, 4);
        assert_eq!(fifo.len(), 4);
        assert_eq!(fifo.dropped(), 1);
    }

    #[test]
    fn test_fifo_pop_preserves_order() {
        let fifo = SampleFifo::new(8);
        fifo.push_slice(&[[1, -1], [2, -2], [3, -3]]);

        let mut out = [[0i16; 2]; 2];
        assert_eq!(fifo.pop_slice(&mut out), 2);
        assert_eq!(out, [[1, -1], [2, -2]]);
        assert_eq!(fifo.len(), 1);
    }

    #[test]
    fn test_fifo_resize_discards_oldest() {
        let fifo = SampleFifo::new(8);
        fifo.push_slice(&[[1, 0], [2, 0], [3, 0], [4, 0]]);
        fifo.resize(2);

        assert_eq!(fifo.capacity(), 2);
        let mut out = [[0i16; 2]; 2];
        fifo.pop_slice(&mut out);
        assert_eq!(out, [[3, 0], [4, 0]]);
    }

    #[test]
    fn test_size_policy_bounds() {
        assert_eq!(fifo_size_for_rate(0), 1 << 16);
        assert_eq!(fifo_size_for_rate(48_000), 1 << 16);
        assert_eq!(fifo_size_for_rate(1_000_000), 1 << 20);
        assert_eq!(fifo_size_for_rate(120_000_000), 1 << 22);
    }

    #[tokio::test]
    async fn test_worker_shutdown() {
        let handle = spawn_worker(Direction::Rx, 2);
        assert!(!handle.is_finished());

        let join = handle.join.abort_handle();
        handle.stop();

        // The task drains the shutdown command and exits on its own
        for _ in 0..50 {
            if join.is_finished() {
                return;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(2)).await;
        }
        panic!("worker did not stop");
    }
}
