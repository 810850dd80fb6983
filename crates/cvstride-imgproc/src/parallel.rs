use rayon::prelude::*;
use thiserror::Error;

use cvstride_tensor::{Status, StatusError};

/// Errors that can occur while setting up parallel execution.
#[derive(Error, Debug, PartialEq)]
pub enum ParallelError {
    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    BuildError(String),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),

    /// The stream worker thread failed to start.
    #[error("failed to spawn stream worker: {0}")]
    SpawnError(String),
}

impl From<ParallelError> for StatusError {
    fn from(err: ParallelError) -> Self {
        let status = match err {
            ParallelError::InvalidThreadCount(_) => Status::ErrorInvalidArgument,
            _ => Status::ErrorInternal,
        };
        StatusError::new(status, err.to_string())
    }
}

/// Builds a dedicated thread pool with `num_threads` workers.
pub(crate) fn build_pool(num_threads: usize, name: &str) -> Result<rayon::ThreadPool, ParallelError> {
    if num_threads == 0 {
        return Err(ParallelError::InvalidThreadCount(num_threads));
    }
    let name = name.to_owned();
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(move |i| format!("{name}-{i}"))
        .build()
        .map_err(|e| ParallelError::BuildError(e.to_string()))
}

/// Runs `f(sample, row)` for every row of every sample in parallel.
///
/// Each task gets exactly one `(sample, row)` pair, so kernels writing only to their own row
/// never race. Runs on the current rayon pool, which is the stream pool inside stream jobs.
pub(crate) fn par_iter_rows(num_samples: i32, num_rows: i32, f: impl Fn(i32, i32) + Send + Sync) {
    if num_samples <= 0 || num_rows <= 0 {
        return;
    }
    let rows = num_rows as usize;
    (0..num_samples as usize * rows)
        .into_par_iter()
        .for_each(|i| f((i / rows) as i32, (i % rows) as i32));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn test_par_iter_rows_visits_every_row_once() {
        let seen = Mutex::new(Vec::new());
        par_iter_rows(3, 5, |s, y| seen.lock().unwrap().push((s, y)));
        let mut seen = seen.into_inner().unwrap();
        seen.sort();
        let expected = (0..3)
            .flat_map(|s| (0..5).map(move |y| (s, y)))
            .collect::<Vec<_>>();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_par_iter_rows_empty() {
        let count = AtomicUsize::new(0);
        par_iter_rows(0, 5, |_, _| {
            count.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(count.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_build_pool() {
        let pool = build_pool(2, "test").unwrap();
        assert_eq!(pool.current_num_threads(), 2);
        assert_eq!(
            build_pool(0, "test").err(),
            Some(ParallelError::InvalidThreadCount(0))
        );
    }

    #[test]
    fn test_parallel_error_status() {
        let err: StatusError = ParallelError::InvalidThreadCount(0).into();
        assert_eq!(err.status(), Status::ErrorInvalidArgument);
        let err: StatusError = ParallelError::BuildError("boom".into()).into();
        assert_eq!(err.status(), Status::ErrorInternal);
    }
}
