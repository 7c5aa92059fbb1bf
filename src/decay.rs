//! Periodic probabilistic decay of the bit array.
//!
//! Once per interval every set bit is cleared with probability `decay_rate`.
//! The word range is split into contiguous chunks, one per worker, and each
//! worker rewrites its words one at a time: atomic load, local Bernoulli
//! trials, atomic store. A cycle returns only after all workers are joined,
//! and cycles are serialized so two never touch the array at once.
//!
//! An `insert` racing with decay on the same word may be overwritten by the
//! decay store, or may mask a decay clear. Both outcomes are within the
//! filter's false positive / forgetting contract.

use crate::bits::AtomicBitArray;
use crate::error::Result;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::num::NonZeroUsize;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Clears each set bit of `word` with probability `decay_rate`.
pub fn decay_word<R: Rng>(word: u64, decay_rate: f64, rng: &mut R) -> u64 {
    let mut result = word;
    let mut remaining = word;
    while remaining != 0 {
        let bit = remaining & remaining.wrapping_neg();
        if rng.random::<f64>() < decay_rate {
            result &= !bit;
        }
        remaining &= remaining - 1;
    }
    result
}

/// Splits `num_words` into at most `workers` contiguous ranges.
///
/// Arrays with fewer words than workers are processed as a single range.
pub(crate) fn partition(num_words: usize, workers: usize) -> Vec<Range<usize>> {
    if num_words == 0 {
        return Vec::new();
    }
    if workers <= 1 || num_words < workers {
        return vec![0..num_words];
    }
    let chunk = num_words.div_ceil(workers);
    (0..num_words)
        .step_by(chunk)
        .map(|start| start..(start + chunk).min(num_words))
        .collect()
}

fn worker_seed(base: u64, cycle: u64, worker: usize) -> u64 {
    base ^ cycle.wrapping_mul(SEED_STRIDE) ^ (worker as u64).rotate_left(32)
}

fn decay_range(
    bits: &AtomicBitArray,
    range: Range<usize>,
    decay_rate: f64,
    rng: &mut StdRng,
) -> usize {
    let mut cleared = 0;
    for index in range {
        let old = bits.load_word(index);
        if old == 0 {
            continue;
        }
        let new = decay_word(old, decay_rate, rng);
        if new != old {
            bits.store_word(index, new);
            cleared += (old.count_ones() - new.count_ones()) as usize;
        }
    }
    cleared
}

/// Runs one full decay pass over `bits` and returns the number of bits cleared.
pub fn run_decay_cycle(
    bits: &AtomicBitArray,
    decay_rate: f64,
    workers: usize,
    seed: u64,
) -> usize {
    let ranges = partition(bits.num_words(), workers);

    if ranges.len() <= 1 {
        let mut rng = StdRng::seed_from_u64(worker_seed(seed, 0, 0));
        return ranges
            .into_iter()
            .map(|range| decay_range(bits, range, decay_rate, &mut rng))
            .sum();
    }

    thread::scope(|scope| {
        let handles: Vec<_> = ranges
            .into_iter()
            .enumerate()
            .map(|(worker, range)| {
                scope.spawn(move || {
                    let mut rng =
                        StdRng::seed_from_u64(worker_seed(seed, 0, worker));
                    let cleared =
                        decay_range(bits, range.clone(), decay_rate, &mut rng);
                    trace!(worker, ?range, cleared, "Decay chunk done");
                    cleared
                })
            })
            .collect();

        handles
            .into_iter()
            .enumerate()
            .map(|(worker, handle)| match handle.join() {
                Ok(cleared) => cleared,
                Err(_) => {
                    warn!(worker, "Decay worker panicked, chunk skipped");
                    0
                }
            })
            .sum()
    })
}

/// Parameters of the decay process, fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct DecaySettings {
    pub decay_rate: f64,
    pub interval: Duration,
    pub workers: usize,
    pub seed: u64,
}

impl DecaySettings {
    /// `workers`/`seed` of `None` resolve to available parallelism and an
    /// entropy-drawn seed.
    pub fn new(
        decay_rate: f64,
        interval: Duration,
        workers: Option<usize>,
        seed: Option<u64>,
    ) -> Self {
        let workers = workers.unwrap_or_else(|| {
            thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        });
        let seed = seed.unwrap_or_else(|| rand::rng().random());
        Self {
            decay_rate,
            interval,
            workers: workers.max(1),
            seed,
        }
    }
}

/// Shared decay state used by both the background task and manual cycles.
#[derive(Debug)]
pub(crate) struct Decayer {
    bits: Arc<AtomicBitArray>,
    settings: DecaySettings,
    cycles: AtomicU64,
    cycle_lock: Mutex<()>,
}

impl Decayer {
    pub(crate) fn new(bits: Arc<AtomicBitArray>, settings: DecaySettings) -> Self {
        Self {
            bits,
            settings,
            cycles: AtomicU64::new(0),
            cycle_lock: Mutex::new(()),
        }
    }

    pub(crate) fn settings(&self) -> &DecaySettings {
        &self.settings
    }

    pub(crate) fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Acquire)
    }

    /// Blocks until no cycle is running.
    pub(crate) fn wait_idle(&self) {
        drop(self.cycle_lock.lock());
    }

    /// Runs one cycle, waiting for any cycle already in progress.
    pub(crate) fn run_cycle(&self) -> usize {
        let _guard = self.cycle_lock.lock();

        let cycle = self.cycles.load(Ordering::Acquire);
        let started = Instant::now();
        let cleared = if self.settings.decay_rate > 0.0 {
            run_decay_cycle(
                &self.bits,
                self.settings.decay_rate,
                self.settings.workers,
                worker_seed(self.settings.seed, cycle, 0),
            )
        } else {
            0
        };
        self.cycles.fetch_add(1, Ordering::AcqRel);

        debug!(
            cycle,
            cleared,
            words = self.bits.num_words(),
            elapsed = ?started.elapsed(),
            "Decay cycle complete"
        );
        cleared
    }
}

/// Next tick on the fixed cadence anchored at `previous`, strictly after
/// `now`. Ticks already missed are skipped in one step. `None` once the tick
/// would fall past what `Instant` can represent.
pub(crate) fn next_tick(
    previous: Instant,
    interval: Duration,
    now: Instant,
) -> Option<Instant> {
    let candidate = previous.checked_add(interval)?;
    if candidate > now {
        return Some(candidate);
    }
    let missed = now
        .duration_since(previous)
        .as_nanos()
        .checked_div(interval.as_nanos())?;
    let offset = interval.as_nanos().checked_mul(missed + 1)?;
    let secs = u64::try_from(offset / 1_000_000_000).ok()?;
    let nanos = (offset % 1_000_000_000) as u32;
    previous.checked_add(Duration::new(secs, nanos))
}

/// Background task running decay cycles on a fixed cadence.
///
/// Owns the stop channel and join handle of one thread. Ticks missed while a
/// slow cycle runs are dropped rather than queued.
#[derive(Debug)]
pub struct DecayScheduler {
    decayer: Arc<Decayer>,
    handle: Mutex<Option<(Sender<()>, JoinHandle<()>)>>,
}

impl DecayScheduler {
    pub(crate) fn start(decayer: Arc<Decayer>) -> Result<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let interval = decayer.settings().interval;
        let worker = Arc::clone(&decayer);

        let handle = thread::Builder::new()
            .name("stable-bloom-decay".into())
            .spawn(move || run_ticker(&worker, interval, &stop_rx))?;

        info!(?interval, "Decay task started");
        Ok(Self {
            decayer,
            handle: Mutex::new(Some((stop_tx, handle))),
        })
    }

    pub fn is_running(&self) -> bool {
        matches!(&*self.handle.lock(), Some((_, handle)) if !handle.is_finished())
    }

    /// Signals the task and blocks until any in-flight cycle has finished,
    /// including a manual one. Later calls return immediately.
    pub fn stop(&self) {
        let taken = self.handle.lock().take();

        if let Some((stop_tx, handle)) = taken {
            // The receiver only disappears if the thread already exited
            let _ = stop_tx.send(());
            if handle.join().is_err() {
                warn!("Decay task panicked before shutdown");
            }
            self.decayer.wait_idle();
            info!("Decay task stopped");
        }
    }
}

impl Drop for DecayScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_ticker(decayer: &Decayer, interval: Duration, stop_rx: &Receiver<()>) {
    let mut tick = Instant::now().checked_add(interval);
    loop {
        let Some(deadline) = tick else {
            // Interval out of the clock's range, no tick ever fires
            let _ = stop_rx.recv();
            break;
        };
        match stop_rx.recv_deadline(deadline) {
            Err(RecvTimeoutError::Timeout) => {
                decayer.run_cycle();
                tick = next_tick(deadline, interval, Instant::now());
                if tick.is_none() {
                    trace!("Decay cadence past clock range, waiting for stop");
                }
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
