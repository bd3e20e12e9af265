//! InputChannel - per-input cyclic sample buffer.
//!
//! A fixed-capacity ring of complex samples per subband, addressed by a
//! monotonically increasing logical sample index mapped to a physical offset
//! by modulo. `history` samples of writer slack are reserved behind the live
//! window so consumers can warm up filters without racing the writer.
//!
//! Lock discipline: one `Mutex` guards all state; `data_written` wakes the
//! reader, `region_released` wakes the writer. Exactly one writer (the
//! capture worker) and one reader (the coordinator) exist per channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use contracts::{ContractError, GapRange, GapSet, PayloadSource, Sample, SampleTime, StreamId};

/// Floor used when pruning stale gap ranges.
const GAP_PRUNE_FLOOR: i64 = i64::MIN / 4;

/// Per-channel construction parameters.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Owning stream id.
    pub stream: StreamId,
    /// Subbands carried by the stream.
    pub subbands: usize,
    /// Ring capacity in samples per subband. Sized to absorb the configured
    /// maximum network delay on top of one period plus history on both flanks.
    pub capacity: usize,
    /// History samples retained behind the live window.
    pub history: usize,
    /// Live operation: bounded reader waits, overwrite-without-block.
    pub realtime: bool,
    /// Reader wait bound in realtime mode.
    pub max_wait: Duration,
}

/// Result of one append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Samples landed in the ring.
    Written {
        /// Samples written per subband.
        samples: usize,
    },
    /// The span fell entirely behind the retained region and was dropped.
    TooLate,
}

struct Inner {
    /// Backing store, subband-major: `subbands * capacity` samples.
    arena: Vec<Sample>,
    /// Next absolute sample index to be appended (max written end).
    write_cursor: Option<i64>,
    /// First absolute index ever written.
    stream_start: Option<i64>,
    /// Indices in the retained span that were never written (loss).
    gaps: GapSet,
    /// Reserved positions overwritten while a read was open (realtime only).
    invalidated: GapSet,
    /// Open read transaction.
    reservation: Option<GapRange>,
    /// Writer bound in offline mode: indices below this may be destroyed.
    reader_floor: Option<i64>,
}

/// One per physical input stream: cyclic sample storage plus gap tracking.
pub struct InputChannel {
    config: ChannelConfig,
    inner: Mutex<Inner>,
    data_written: Condvar,
    region_released: Condvar,
    stopped: AtomicBool,
    ended: AtomicBool,
}

impl InputChannel {
    /// Create a channel with zeroed storage.
    pub fn new(config: ChannelConfig) -> Result<Self, ContractError> {
        if config.capacity == 0 || config.capacity <= config.history {
            return Err(ContractError::config_validation(
                format!("channel[{}]", config.stream),
                format!(
                    "capacity {} must exceed history {}",
                    config.capacity, config.history
                ),
            ));
        }
        if config.subbands == 0 {
            return Err(ContractError::config_validation(
                format!("channel[{}]", config.stream),
                "subband count must be > 0",
            ));
        }

        let arena = vec![Sample::ZERO; config.subbands * config.capacity];
        Ok(Self {
            config,
            inner: Mutex::new(Inner {
                arena,
                write_cursor: None,
                stream_start: None,
                gaps: GapSet::new(),
                invalidated: GapSet::new(),
                reservation: None,
                reader_floor: None,
            }),
            data_written: Condvar::new(),
            region_released: Condvar::new(),
            stopped: AtomicBool::new(false),
            ended: AtomicBool::new(false),
        })
    }

    /// Owning stream id.
    pub fn stream(&self) -> &StreamId {
        &self.config.stream
    }

    /// Subbands carried.
    pub fn subbands(&self) -> usize {
        self.config.subbands
    }

    /// Largest window `begin_read` will serve.
    pub fn max_window(&self) -> usize {
        self.config.capacity - self.config.history
    }

    /// Time of the first sample ever appended, once known.
    pub fn first_timestamp(&self) -> Option<SampleTime> {
        let inner = self.inner.lock().expect("channel mutex poisoned");
        inner.stream_start.map(SampleTime::new)
    }

    /// Wake all blocked operations; used at pipeline shutdown.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.data_written.notify_all();
        self.region_released.notify_all();
    }

    /// Mark the producer as permanently gone. All unwritten positions in
    /// future windows report as gaps instead of blocking the reader.
    pub fn mark_ended(&self) {
        self.ended.store(true, Ordering::SeqCst);
        self.data_written.notify_all();
        self.region_released.notify_all();
    }

    /// Whether the producer has terminated.
    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    /// Writer-only: copy `samples_per_subband` samples per subband
    /// (subband-major) starting at absolute time `at`.
    ///
    /// Positions skipped by an out-of-order arrival are recorded as gaps;
    /// re-delivery inside the retained span rewrites in place. In offline
    /// mode the call blocks while it would destroy positions the reader has
    /// not released; in realtime mode it proceeds and marks the destroyed
    /// reader-visible positions invalid.
    pub fn append(
        &self,
        at: SampleTime,
        samples: &[Sample],
        samples_per_subband: usize,
    ) -> AppendOutcome {
        debug_assert_eq!(samples.len(), self.config.subbands * samples_per_subband);

        let capacity = self.config.capacity as i64;
        let begin = at.count();
        let end = begin + samples_per_subband as i64;

        let mut inner = self.inner.lock().expect("channel mutex poisoned");

        let cursor = inner.write_cursor.unwrap_or(begin);
        if begin < cursor - capacity {
            return AppendOutcome::TooLate;
        }

        // Writing [begin, end) destroys the lapped indices one ring
        // generation back.
        let destroyed = GapRange::new(begin - capacity, end - capacity);

        if self.config.realtime {
            if let Some(reservation) = inner.reservation {
                if let Some(overlap) = reservation.intersect(&destroyed) {
                    inner.invalidated.insert(overlap);
                }
            }
        } else {
            // Block until the destroyed span is entirely below the reader
            // floor. Shutdown wakes the wait.
            loop {
                if self.stopped.load(Ordering::SeqCst) {
                    return AppendOutcome::Written { samples: 0 };
                }
                let floor = inner.reader_floor.unwrap_or(begin);
                if destroyed.end <= floor || destroyed.is_empty() {
                    break;
                }
                inner = self
                    .region_released
                    .wait(inner)
                    .expect("channel mutex poisoned");
            }
        }

        if inner.stream_start.is_none() {
            inner.stream_start = Some(begin);
            inner.reader_floor = Some(begin);
        }

        let cursor = inner.write_cursor.unwrap_or(begin);
        if begin > cursor {
            // Skipped span: loss until (unless) the missing frames arrive.
            inner.gaps.insert(GapRange::new(cursor, begin));
        }
        inner.gaps.remove(GapRange::new(begin, end));
        // Stale ranges behind the retained span are unreachable; drop them.
        inner
            .gaps
            .remove(GapRange::new(GAP_PRUNE_FLOOR, end - capacity));

        for slot in 0..self.config.subbands {
            let src = &samples[slot * samples_per_subband..(slot + 1) * samples_per_subband];
            Self::write_ring(&mut inner.arena, &self.config, slot, begin, src);
        }

        inner.write_cursor = Some(cursor.max(end));
        drop(inner);
        self.data_written.notify_all();

        AppendOutcome::Written {
            samples: samples_per_subband,
        }
    }

    /// Reader-only: open a read transaction for `[from, from + length)`.
    ///
    /// Blocks until the span has been written, bounded by `max_wait` in
    /// realtime mode and unbounded offline. Missing positions are reported
    /// in the returned window's gap set, never as an error. The transaction
    /// stays open until the window is closed or dropped.
    pub fn begin_read(
        &self,
        from: SampleTime,
        length: usize,
    ) -> Result<ReadWindow<'_>, ContractError> {
        let max = self.max_window();
        if length > max {
            return Err(ContractError::WindowTooLarge {
                requested: length,
                max,
            });
        }

        let begin = from.count();
        let target = begin + length as i64;
        let window = GapRange::new(begin, target);

        let mut inner = self.inner.lock().expect("channel mutex poisoned");
        debug_assert!(inner.reservation.is_none(), "read transaction already open");

        let deadline = Instant::now() + self.config.max_wait;
        loop {
            if self.stopped.load(Ordering::SeqCst) || self.ended.load(Ordering::SeqCst) {
                break;
            }
            if inner.write_cursor.is_some_and(|c| c >= target) {
                break;
            }
            if self.config.realtime {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                let (guard, _) = self
                    .data_written
                    .wait_timeout(inner, deadline - now)
                    .expect("channel mutex poisoned");
                inner = guard;
            } else {
                inner = self
                    .data_written
                    .wait(inner)
                    .expect("channel mutex poisoned");
            }
        }

        let gaps = self.window_gaps(&inner, window);
        inner.reservation = Some(window);

        Ok(ReadWindow {
            channel: self,
            range: window,
            gaps,
        })
    }

    /// Gap set visible to a reader of `window`, given current channel state.
    fn window_gaps(&self, inner: &Inner, window: GapRange) -> GapSet {
        let mut gaps = inner.gaps.clip(window);

        match (inner.stream_start, inner.write_cursor) {
            (Some(start), Some(cursor)) => {
                if window.begin < start {
                    gaps.insert(GapRange::new(window.begin, start.min(window.end)));
                }
                if cursor < window.end {
                    gaps.insert(GapRange::new(cursor.max(window.begin), window.end));
                }
                // Positions evicted before the reader arrived hold samples
                // from a later ring generation.
                let retained = cursor - self.config.capacity as i64;
                if window.begin < retained {
                    gaps.insert(GapRange::new(window.begin, retained.min(window.end)));
                }
            }
            _ => {
                // Nothing ever written.
                gaps.insert(window);
            }
        }

        gaps.union(&inner.invalidated.clip(window));
        gaps
    }

    /// Close a read transaction: raise the reader floor (keeping `history`
    /// samples readable for the next window) and wake a blocked writer.
    fn release(&self, range: GapRange) {
        let mut inner = self.inner.lock().expect("channel mutex poisoned");
        inner.reservation = None;
        inner.invalidated = GapSet::new();
        let released = range.end - self.config.history as i64;
        inner.reader_floor = Some(inner.reader_floor.map_or(released, |f| f.max(released)));
        drop(inner);
        self.region_released.notify_all();
    }

    fn write_ring(
        arena: &mut [Sample],
        config: &ChannelConfig,
        slot: usize,
        from: i64,
        src: &[Sample],
    ) {
        let cap = config.capacity;
        let base = slot * cap;
        let phys = from.rem_euclid(cap as i64) as usize;
        let first = src.len().min(cap - phys);
        arena[base + phys..base + phys + first].copy_from_slice(&src[..first]);
        if first < src.len() {
            arena[base..base + src.len() - first].copy_from_slice(&src[first..]);
        }
    }

    fn read_ring(&self, inner: &Inner, slot: usize, from: i64, out: &mut [Sample]) {
        let cap = self.config.capacity;
        let base = slot * cap;
        let phys = from.rem_euclid(cap as i64) as usize;
        let out_len = out.len();
        let first = out_len.min(cap - phys);
        out[..first].copy_from_slice(&inner.arena[base + phys..base + phys + first]);
        if first < out_len {
            out[first..].copy_from_slice(&inner.arena[base..base + out_len - first]);
        }
    }

    fn locked(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("channel mutex poisoned")
    }
}

/// A transient view of one open read transaction.
///
/// Valid only while open; dropping the window closes the transaction and
/// releases the ring region back to the writer.
pub struct ReadWindow<'a> {
    channel: &'a InputChannel,
    range: GapRange,
    gaps: GapSet,
}

impl ReadWindow<'_> {
    /// First sample time of the window.
    pub fn start(&self) -> SampleTime {
        SampleTime::new(self.range.begin)
    }

    /// Window length in samples.
    pub fn len(&self) -> usize {
        self.range.len() as usize
    }

    /// Whether the window is zero-length.
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Gap set extracted when the transaction opened, in absolute indices.
    pub fn gaps(&self) -> &GapSet {
        &self.gaps
    }

    /// Gap set shifted to window-local indices `[0, len)`.
    pub fn local_gaps(&self) -> GapSet {
        self.gaps.shift(-self.range.begin)
    }

    /// Explicitly close the transaction.
    pub fn close(self) {}
}

impl PayloadSource for ReadWindow<'_> {
    fn window_len(&self) -> usize {
        self.len()
    }

    /// Copy one subband slot's samples, zeroing flagged positions.
    ///
    /// Positions invalidated by a realtime overwrite after the transaction
    /// opened are zeroed as well, so the payload never carries bytes from a
    /// later ring generation.
    fn copy_subband(&self, slot: usize, out: &mut [Sample]) {
        assert_eq!(out.len(), self.len());

        let inner = self.channel.locked();
        self.channel.read_ring(&inner, slot, self.range.begin, out);

        let mut invalid = self.gaps.clone();
        invalid.union(&inner.invalidated.clip(self.range));
        drop(inner);

        for range in invalid.ranges() {
            let lo = (range.begin - self.range.begin) as usize;
            let hi = (range.end - self.range.begin) as usize;
            out[lo..hi].fill(Sample::ZERO);
        }
    }
}

impl Drop for ReadWindow<'_> {
    fn drop(&mut self) {
        self.channel.release(self.range);
    }
}
