//! Dedicated OS-affinity worker thread (spec.md §5): every call into
//! [`CapturePrimitives`] happens on one thread for the lifetime of the
//! process, so Win32 handles and thread-owned message queues are never
//! touched cross-thread. Callers dispatch a boxed closure and `.await` its
//! reply over a oneshot channel.

use std::sync::Arc;

use super::{platform_primitives, CapturePrimitives};

type Job = Box<dyn FnOnce(&dyn CapturePrimitives) + Send + 'static>;

/// Owns the worker thread. Dropping the last handle closes the job channel,
/// which lets the thread exit its receive loop and join.
pub struct OsWorker {
    sender: flume::Sender<Job>,
    _thread: std::thread::JoinHandle<()>,
}

impl OsWorker {
    pub fn spawn() -> Self {
        Self::spawn_with(platform_primitives())
    }

    /// Spawns the worker thread against a caller-supplied primitives impl,
    /// e.g. a test double, instead of the real platform one.
    pub fn spawn_with(primitives: Arc<dyn CapturePrimitives>) -> Self {
        let (sender, receiver) = flume::unbounded::<Job>();
        let thread = std::thread::Builder::new()
            .name("capture-os-worker".into())
            .spawn(move || {
                for job in receiver.iter() {
                    job(primitives.as_ref());
                }
            })
            .expect("failed to spawn OS worker thread");
        Self { sender, _thread: thread }
    }

    pub fn handle(&self) -> OsWorkerHandle {
        OsWorkerHandle { sender: self.sender.clone() }
    }
}

/// Cheaply cloneable handle used by engine code to submit work to the
/// worker thread. The engine never talks to [`CapturePrimitives`] directly.
#[derive(Clone)]
pub struct OsWorkerHandle {
    sender: flume::Sender<Job>,
}

impl OsWorkerHandle {
    /// Runs `f` on the worker thread and returns its result.
    ///
    /// `f` receives a borrowed `&dyn CapturePrimitives` scoped to the
    /// duration of the call; any guard it constructs is dropped, and so
    /// releases its OS resource, before this function returns.
    pub async fn run<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&dyn CapturePrimitives) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        let job: Job = Box::new(move |primitives| {
            let result = f(primitives);
            let _ = reply_tx.send(result);
        });
        if self.sender.send(job).is_err() {
            panic!("OS worker thread terminated unexpectedly");
        }
        reply_rx.await.expect("OS worker dropped reply sender without responding")
    }
}
