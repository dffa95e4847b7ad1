/*
 * Single-slot store for the latest distance measurement.
 *
 * The reading is replaced wholesale under an async mutex, so a reader sees
 * either the previous reading or the new one, never a mix. Both sides wait
 * for the lock for a bounded time only. A write that cannot get the lock is
 * dropped and a read that cannot get the lock returns `None`; the next cycle
 * of the producer or consumer repairs either case. Misses are counted.
 */

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, with_timeout};

use crate::config::INITIAL_DISTANCE_CM;

/// One sensor sample.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    /// Distance to the nearest echo, in centimetres. Zero when `valid` is false
    /// because of an echo timeout.
    pub distance_cm: f32,
    /// Milliseconds since boot at the end of the measurement.
    pub timestamp_ms: u64,
    /// False for the startup sentinel and for cycles where no echo was seen.
    pub valid: bool,
}

impl Reading {
    /// Placeholder held until the first measurement completes. Far enough away
    /// to select the slow blink.
    pub const INITIAL: Reading = Reading {
        distance_cm: INITIAL_DISTANCE_CM,
        timestamp_ms: 0,
        valid: false,
    };

    pub const fn measured(distance_cm: f32, timestamp_ms: u64) -> Self {
        Reading {
            distance_cm,
            timestamp_ms,
            valid: true,
        }
    }

    /// A cycle that ended on an echo timeout.
    pub const fn no_echo(timestamp_ms: u64) -> Self {
        Reading {
            distance_cm: 0.0,
            timestamp_ms,
            valid: false,
        }
    }
}

impl Default for Reading {
    fn default() -> Self {
        Self::INITIAL
    }
}

pub struct SharedReading<M: RawMutex> {
    slot: Mutex<M, Reading>,
    write_timeout: Duration,
    read_timeout: Duration,
    missed_writes: AtomicU32,
    missed_reads: AtomicU32,
}

impl<M: RawMutex> SharedReading<M> {
    pub const fn new(initial: Reading, write_timeout: Duration, read_timeout: Duration) -> Self {
        SharedReading {
            slot: Mutex::new(initial),
            write_timeout,
            read_timeout,
            missed_writes: AtomicU32::new(0),
            missed_reads: AtomicU32::new(0),
        }
    }

    /// Replace the stored reading.
    ///
    /// Returns `false` if the lock was not acquired within the write timeout,
    /// in which case the stored reading is untouched.
    pub async fn write(&self, reading: Reading) -> bool {
        match with_timeout(self.write_timeout, self.slot.lock()).await {
            Ok(mut slot) => {
                *slot = reading;
                true
            }
            Err(_) => {
                self.missed_writes.fetch_add(1, Ordering::Relaxed);
                debug!("reading write skipped, lock busy");
                false
            }
        }
    }

    /// Copy out the stored reading, or `None` if the lock was not acquired
    /// within the read timeout.
    pub async fn read(&self) -> Option<Reading> {
        match with_timeout(self.read_timeout, self.slot.lock()).await {
            Ok(slot) => Some(*slot),
            Err(_) => {
                self.missed_reads.fetch_add(1, Ordering::Relaxed);
                debug!("reading read skipped, lock busy");
                None
            }
        }
    }

    pub fn missed_writes(&self) -> u32 {
        self.missed_writes.load(Ordering::Relaxed)
    }

    pub fn missed_reads(&self) -> u32 {
        self.missed_reads.load(Ordering::Relaxed)
    }
}
