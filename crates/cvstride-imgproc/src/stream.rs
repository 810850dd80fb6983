use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;

use cvstride_tensor::{Device, StatusError};

use crate::parallel::{build_pool, ParallelError};

/// Configuration of a [`Stream`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StreamConfig {
    /// Number of threads of the stream pool, `None` to share the global rayon pool.
    pub num_threads: Option<usize>,
    /// Name of the stream, used for the worker threads and in logs.
    pub name: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            name: "cvstride-stream".to_string(),
        }
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct State {
    enqueued: u64,
    completed: u64,
    error: Option<StatusError>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    idle: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        // jobs run outside the lock, a poisoned state is still consistent
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// An in-order queue of work for a device.
///
/// Operators validate their arguments on the calling thread and enqueue the kernel on the
/// stream, returning before it runs. Jobs execute one at a time, in enqueue order, on a
/// dedicated worker thread; each job fans its rows out over the stream's rayon pool.
///
/// Work enqueued on a stream holds the storage of the tensors it uses. Host access to those
/// tensors panics until [`Stream::synchronize`] returns.
///
/// # Example
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// use cvstride_imgproc::stream::Stream;
/// use cvstride_tensor::Device;
///
/// let stream = Stream::new(Device::gpu(0))?;
/// let counter = Arc::new(AtomicUsize::new(0));
/// for _ in 0..4 {
///     let counter = counter.clone();
///     stream.enqueue(move || {
///         counter.fetch_add(1, Ordering::SeqCst);
///     })?;
/// }
/// stream.synchronize()?;
/// assert_eq!(counter.load(Ordering::SeqCst), 4);
/// # Ok::<(), cvstride_tensor::StatusError>(())
/// ```
pub struct Stream {
    device: Device,
    name: String,
    sender: Option<mpsc::Sender<Job>>,
    worker: Option<JoinHandle<()>>,
    shared: Arc<Shared>,
}

impl Stream {
    /// Creates a stream on `device` sharing the global rayon pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread cannot be started.
    pub fn new(device: Device) -> Result<Self, StatusError> {
        Self::with_config(device, StreamConfig::default())
    }

    /// Creates a stream on `device` with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread count is zero, or if the pool or the worker thread cannot
    /// be started.
    pub fn with_config(device: Device, config: StreamConfig) -> Result<Self, StatusError> {
        let pool = config
            .num_threads
            .map(|n| build_pool(n, &config.name))
            .transpose()?;

        let shared = Arc::new(Shared::default());
        let (sender, receiver) = mpsc::channel::<Job>();

        let worker_shared = shared.clone();
        let worker_name = config.name.clone();
        let worker = std::thread::Builder::new()
            .name(config.name.clone())
            .spawn(move || {
                for job in receiver {
                    // the job and everything it captured is dropped before completion is
                    // reported, so synchronized callers regain host access to its tensors
                    let result = match &pool {
                        Some(pool) => {
                            pool.install(|| panic::catch_unwind(AssertUnwindSafe(job)))
                        }
                        None => panic::catch_unwind(AssertUnwindSafe(job)),
                    };

                    let mut state = worker_shared.lock();
                    if let Err(payload) = result {
                        let message = panic_message(payload.as_ref());
                        log::warn!("stream {worker_name}: job failed: {message}");
                        if state.error.is_none() {
                            state.error = Some(StatusError::internal(message));
                        }
                    }
                    state.completed += 1;
                    worker_shared.idle.notify_all();
                }
                log::debug!("stream {worker_name}: worker exiting");
            })
            .map_err(|e| ParallelError::SpawnError(e.to_string()))?;

        log::debug!(
            "created stream {} on {device} with {} threads",
            config.name,
            config
                .num_threads
                .map_or_else(|| "shared".to_string(), |n| n.to_string())
        );

        Ok(Self {
            device,
            name: config.name,
            sender: Some(sender),
            worker: Some(worker),
            shared,
        })
    }

    /// Returns the device of the stream.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Returns the name of the stream.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueues `job` after all previously enqueued work, without waiting for it to run.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread is gone.
    pub fn enqueue(&self, job: impl FnOnce() + Send + 'static) -> Result<(), StatusError> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| StatusError::internal("stream is shut down"))?;

        self.shared.lock().enqueued += 1;
        if sender.send(Box::new(job)).is_err() {
            let mut state = self.shared.lock();
            state.enqueued -= 1;
            return Err(StatusError::internal(format!(
                "stream {} worker is not running",
                self.name
            )));
        }
        Ok(())
    }

    /// Blocks until all previously enqueued work has completed.
    ///
    /// # Errors
    ///
    /// Returns the first failure of a job since the last synchronization, with
    /// [`cvstride_tensor::Status::ErrorInternal`].
    pub fn synchronize(&self) -> Result<(), StatusError> {
        let mut state = self.shared.lock();
        while state.completed < state.enqueued {
            state = self
                .shared
                .idle
                .wait(state)
                .unwrap_or_else(|e| e.into_inner());
        }
        match state.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Returns true if all enqueued work has completed, without blocking.
    pub fn query(&self) -> bool {
        let state = self.shared.lock();
        state.completed == state.enqueued
    }

    /// Returns the number of jobs enqueued since the stream was created.
    pub fn enqueued(&self) -> u64 {
        self.shared.lock().enqueued
    }

    /// Returns the number of jobs completed since the stream was created.
    pub fn completed(&self) -> u64 {
        self.shared.lock().completed
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("device", &self.device)
            .field("name", &self.name)
            .field("enqueued", &self.enqueued())
            .field("completed", &self.completed())
            .finish()
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        // closing the channel lets the worker drain the queue and exit
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("stream {}: worker panicked", self.name);
            }
        }
    }
}
