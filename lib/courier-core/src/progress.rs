//! Upload and download progress.
//!
//! A [`Transport`](crate::Transport) feeds raw byte counts into the
//! [`ProgressReporter`] carried by each [`PreparedRequest`](crate::PreparedRequest).
//! The reporter turns them into [`Progress`] events whose fraction is clamped
//! to `0.0..=1.0` and never decreases within a phase.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Which direction bytes are flowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// The request body is being sent.
    Upload,
    /// The response body is being received.
    Download,
}

/// A single progress notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// The phase this notification belongs to.
    pub phase: Phase,
    /// Completion fraction in `0.0..=1.0`.
    pub fraction: f32,
}

impl Progress {
    /// Returns `true` during the upload phase.
    #[must_use]
    pub const fn is_uploading(&self) -> bool {
        matches!(self.phase, Phase::Upload)
    }
}

type Sink = Arc<dyn Fn(Progress) + Send + Sync>;

/// Highest fraction reported so far, per phase.
#[derive(Debug, Default)]
struct Floors {
    upload: Option<f32>,
    download: Option<f32>,
}

impl Floors {
    fn get_mut(&mut self, phase: Phase) -> &mut Option<f32> {
        match phase {
            Phase::Upload => &mut self.upload,
            Phase::Download => &mut self.download,
        }
    }
}

/// Reports progress from a transport to the request's observer.
///
/// Cloning shares the same sink and monotonicity state. Each phase keeps its
/// own last fraction, so interleaved upload and download events stay ordered.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    sink: Option<Sink>,
    last: Arc<Mutex<Floors>>,
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("enabled", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

impl ProgressReporter {
    /// Create a reporter that forwards events to `sink`.
    pub fn new(sink: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        Self {
            sink: Some(Arc::new(sink)),
            last: Arc::default(),
        }
    }

    /// A reporter that discards every event.
    #[must_use]
    pub fn noop() -> Self {
        Self::default()
    }

    /// Returns `true` if events are forwarded anywhere.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Report `done` out of `total` bytes.
    ///
    /// An unknown or zero `total` only reports completion once `done` is
    /// known to be final, via [`ProgressReporter::complete`].
    #[allow(clippy::cast_precision_loss)]
    pub fn bytes(&self, phase: Phase, done: u64, total: Option<u64>) {
        if let Some(total) = total.filter(|total| *total > 0) {
            self.fraction(phase, done as f32 / total as f32);
        }
    }

    /// Report the end of a phase.
    pub fn complete(&self, phase: Phase) {
        self.fraction(phase, 1.0);
    }

    /// Report a completion fraction.
    ///
    /// The fraction is clamped to `0.0..=1.0`. `NaN` and values lower than
    /// the last one reported for the same phase are dropped.
    pub fn fraction(&self, phase: Phase, fraction: f32) {
        let Some(sink) = &self.sink else {
            return;
        };
        if fraction.is_nan() {
            return;
        }
        let progress = Progress {
            phase,
            fraction: fraction.clamp(0.0, 1.0),
        };

        {
            let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
            let slot = last.get_mut(phase);
            if slot.is_some_and(|previous| progress.fraction < previous) {
                return;
            }
            *slot = Some(progress.fraction);
        }

        sink(progress);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn recording() -> (ProgressReporter, Arc<Mutex<Vec<Progress>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let reporter = ProgressReporter::new(move |progress| {
            sink.lock().expect("lock").push(progress);
        });
        (reporter, events)
    }

    fn fractions(events: &Mutex<Vec<Progress>>) -> Vec<(bool, f32)> {
        events
            .lock()
            .expect("lock")
            .iter()
            .map(|p| (p.is_uploading(), p.fraction))
            .collect()
    }

    #[test]
    fn noop_reporter_is_disabled() {
        let reporter = ProgressReporter::noop();
        assert!(!reporter.is_enabled());
        reporter.complete(Phase::Upload);
    }

    #[test]
    fn bytes_are_turned_into_fractions() {
        let (reporter, events) = recording();

        reporter.bytes(Phase::Upload, 0, Some(4));
        reporter.bytes(Phase::Upload, 2, Some(4));
        reporter.bytes(Phase::Upload, 4, Some(4));

        assert_eq!(
            fractions(&events),
            vec![(true, 0.0), (true, 0.5), (true, 1.0)]
        );
    }

    #[test]
    fn unknown_total_is_silent_until_complete() {
        let (reporter, events) = recording();

        reporter.bytes(Phase::Download, 10, None);
        reporter.bytes(Phase::Download, 10, Some(0));
        reporter.complete(Phase::Download);

        assert_eq!(fractions(&events), vec![(false, 1.0)]);
    }

    #[test]
    fn fractions_never_decrease_within_a_phase() {
        let (reporter, events) = recording();

        reporter.fraction(Phase::Upload, 0.6);
        reporter.fraction(Phase::Upload, 0.3);
        reporter.fraction(Phase::Upload, 0.6);
        reporter.fraction(Phase::Download, 0.1);
        reporter.fraction(Phase::Download, 0.05);
        reporter.fraction(Phase::Download, 0.9);

        let observed = fractions(&events);
        assert_eq!(
            observed,
            vec![(true, 0.6), (true, 0.6), (false, 0.1), (false, 0.9)]
        );
    }

    #[test]
    fn interleaved_phases_keep_their_own_floor() {
        let (reporter, events) = recording();

        reporter.fraction(Phase::Upload, 0.5);
        reporter.fraction(Phase::Download, 0.1);
        reporter.fraction(Phase::Upload, 0.3);
        reporter.fraction(Phase::Download, 0.05);
        reporter.fraction(Phase::Upload, 0.7);

        assert_eq!(
            fractions(&events),
            vec![(true, 0.5), (false, 0.1), (true, 0.7)]
        );
    }

    #[test]
    fn fractions_are_clamped_and_nan_is_dropped() {
        let (reporter, events) = recording();

        reporter.fraction(Phase::Upload, -1.0);
        reporter.fraction(Phase::Upload, f32::NAN);
        reporter.fraction(Phase::Upload, 7.5);

        assert_eq!(fractions(&events), vec![(true, 0.0), (true, 1.0)]);
    }

    #[test]
    fn clones_share_state() {
        let (reporter, events) = recording();
        let clone = reporter.clone();

        reporter.fraction(Phase::Upload, 0.8);
        clone.fraction(Phase::Upload, 0.2);

        assert_eq!(fractions(&events), vec![(true, 0.8)]);
    }
}
