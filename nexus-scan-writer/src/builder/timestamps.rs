//! Records when the scan started as soon as the file is built, and when it ended,
//! and how long it took, once it finishes.
use crate::{
    error::{NexusScanError, NexusScanResult},
    file::NexusFileInterface,
    nexus::{DATETIME_FORMAT, NexusDateTime, labels, units},
    tree::{NexusDataType, NexusField, NexusGroupNode, NexusValue, PendingField},
};
use chrono::{SubsecRound, Utc};
use metrics::counter;
use nexus_scan_common::metrics::{
    failures::{FailureKind, get_label},
    names::FAILURES,
};
use std::{mem, rc::Rc};
use tracing::{debug, error};

mod fields {
    pub(super) const START_TIME: &str = "start_time";
    pub(super) const END_TIME: &str = "end_time";
    pub(super) const DURATION: &str = "duration";
}

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> NexusDateTime;
}

/// The system's wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NexusDateTime {
        Utc::now()
    }
}

/// Formats a timestamp as written to timestamp fields.
pub fn format_timestamp(time: &NexusDateTime) -> String {
    time.format(DATETIME_FORMAT).to_string()
}

enum TimestampState {
    Unstarted,
    Started {
        start: NexusDateTime,
        end_time: PendingField,
        duration: PendingField,
    },
    Finished,
}

/// Writes `start_time`, `end_time` and `duration` to the entry.
pub struct ScanTimestamps {
    clock: Rc<dyn Clock>,
    state: TimestampState,
}

impl ScanTimestamps {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            state: TimestampState::Unstarted,
        }
    }

    /// Current time, truncated to milliseconds as finer precision is not written.
    fn now(&self) -> NexusDateTime {
        self.clock.now().trunc_subsecs(3)
    }

    pub fn start_time(&self) -> Option<NexusDateTime> {
        match &self.state {
            TimestampState::Started { start, .. } => Some(*start),
            _ => None,
        }
    }

    /// Writes `start_time` now, and reserves `end_time` and `duration`.
    /// # Parameters
    /// - entry: the entry being built.
    /// - entry_path: absolute path of the entry in the tree.
    /// # Error Modes
    /// - Emits [NexusScanError::Tree] if any of the fields already exists.
    #[tracing::instrument(skip_all, level = "debug", err(level = "warn"))]
    pub fn start(&mut self, entry: &mut NexusGroupNode, entry_path: &str) -> NexusScanResult<()> {
        let start = self.now();
        entry.add_field(fields::START_TIME, NexusField::constant(format_timestamp(&start)))?;
        let end_time =
            PendingField::reserve(entry, entry_path, fields::END_TIME, NexusDataType::Str, &[])?;
        let duration = PendingField::reserve(
            entry,
            entry_path,
            fields::DURATION,
            NexusDataType::Int,
            &[(labels::UNITS, units::MILLISECONDS.into())],
        )?;
        debug!("Scan started at {start}");
        self.state = TimestampState::Started {
            start,
            end_time,
            duration,
        };
        Ok(())
    }

    /// Commits `end_time` and `duration`. Each commit is attempted regardless of the
    /// other, and a failed commit is logged rather than returned.
    /// # Error Modes
    /// - Emits [NexusScanError::TimestampsNotStarted] if [Self::start] has not been called
    ///   since the timestamps were created or last ended.
    pub fn end<I: NexusFileInterface>(&mut self, file: &mut I) -> NexusScanResult<()> {
        let (start, end_time, duration) =
            match mem::replace(&mut self.state, TimestampState::Finished) {
                TimestampState::Started {
                    start,
                    end_time,
                    duration,
                } => (start, end_time, duration),
                other => {
                    self.state = other;
                    return Err(NexusScanError::TimestampsNotStarted);
                }
            };

        let end = self.now();
        if let Err(e) = file.commit(&end_time, &NexusValue::Str(format_timestamp(&end))) {
            error!("Cannot write {}: {e}", end_time.path());
            counter!(FAILURES, &[get_label(FailureKind::FieldCommitFailed)]).increment(1);
        }

        let duration_ms = (end - start).num_milliseconds();
        if let Err(e) = file.commit(&duration, &NexusValue::Int(duration_ms)) {
            error!("Cannot write {}: {e}", duration.path());
            counter!(FAILURES, &[get_label(FailureKind::FieldCommitFailed)]).increment(1);
        }
        debug!("Scan ended at {end} after {duration_ms} ms");
        Ok(())
    }
}
