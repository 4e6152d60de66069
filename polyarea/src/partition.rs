//! Splitting a fixed sample budget across workers.

use crate::error::InputError;

/// Number of samples one worker is responsible for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorkAssignment {
    pub worker_id: usize,
    pub sample_count: u64,
}

/// Splits `total` samples across `worker_count` workers.
///
/// Every worker gets `total / worker_count`; the last one also takes the
/// remainder, so the counts always add up to `total`.
///
/// # Errors
///
/// - [`InputError::InvalidWorkerCount`] if `worker_count` is zero
/// - [`InputError::TooFewSamples`] if `total < worker_count`
pub fn partition(total: u64, worker_count: usize) -> Result<Vec<WorkAssignment>, InputError> {
    if worker_count == 0 {
        return Err(InputError::InvalidWorkerCount(worker_count));
    }
    let workers = worker_count as u64;
    if total < workers {
        return Err(InputError::TooFewSamples {
            total,
            workers: worker_count,
        });
    }

    let per_worker = total / workers;
    let remainder = total % workers;

    Ok((0..worker_count)
        .map(|worker_id| {
            let sample_count = if worker_id == worker_count - 1 {
                per_worker + remainder
            } else {
                per_worker
            };
            WorkAssignment {
                worker_id,
                sample_count,
            }
        })
        .collect())
}
