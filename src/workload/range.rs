//! Work ranges and their division into per-task sub-ranges

use super::error::{WorkloadError, WorkloadResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A contiguous span of work-item indices `[start, start + count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkRange {
    start: u64,
    count: u64,
}

impl WorkRange {
    pub const fn new(start: u64, count: u64) -> Self {
        Self { start, count }
    }

    /// Build a range from signed user input, rejecting negative values.
    pub fn from_signed(start: i64, count: i64) -> WorkloadResult<Self> {
        let start = u64::try_from(start).map_err(|_| {
            WorkloadError::invalid_partition(format!("start index {} is negative", start))
        })?;
        let count = u64::try_from(count).map_err(|_| {
            WorkloadError::invalid_partition(format!("work item count {} is negative", count))
        })?;
        Ok(Self::new(start, count))
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// One past the last index in the range.
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.count)
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Split this range into `tasks` ordered, gap-free sub-ranges.
    ///
    /// Every sub-range holds `count / tasks` items except the last one, which
    /// also absorbs the remainder (so it may exceed the others by up to
    /// `tasks - 1` items). Fails when the range is empty, when `tasks` is zero,
    /// when the range runs past `u64::MAX`, or when there are fewer items than
    /// tasks.
    pub fn partition(&self, tasks: usize) -> WorkloadResult<Vec<WorkRange>> {
        if self.count == 0 {
            return Err(WorkloadError::invalid_partition(format!(
                "work range starting at {} is empty",
                self.start
            )));
        }
        if self.start.checked_add(self.count).is_none() {
            return Err(WorkloadError::invalid_partition(format!(
                "work range of {} items starting at {} exceeds the index space",
                self.count, self.start
            )));
        }
        if tasks == 0 {
            return Err(WorkloadError::invalid_partition(
                "task count must be greater than zero",
            ));
        }

        let delta = self.count / tasks as u64;
        if delta == 0 {
            return Err(WorkloadError::invalid_partition(format!(
                "{} tasks exceed {} work items",
                tasks, self.count
            )));
        }

        let last = tasks - 1;
        let ranges = (0..tasks)
            .map(|i| {
                let start = self.start + delta * i as u64;
                let count = if i == last {
                    self.count - delta * last as u64
                } else {
                    delta
                };
                WorkRange::new(start, count)
            })
            .collect();

        Ok(ranges)
    }
}

/// Validate a signed task count coming from the command line.
pub fn task_count(tasks: i64) -> WorkloadResult<usize> {
    match usize::try_from(tasks) {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(WorkloadError::invalid_partition(format!(
            "task count must be greater than zero, got {}",
            tasks
        ))),
    }
}

impl fmt::Display for WorkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}
