//! A geometry worker backed by a dedicated thread.
//!
//! [`ThreadWorker`] owns a channel to a named worker thread that drives a
//! synchronous [`GeometryKernel`]. Each submitted job carries its own reply
//! sender, so responses can never be attributed to the wrong request even
//! when calls overlap.

use std::sync::mpsc;
use std::thread;

use futures::channel::oneshot;

use super::{
    CutRequest, CutResponse, ExtractionRequest, ExtractionResponse, GeometryWorker, UvRequest,
    UvResponse, WorkerError,
};

/// Synchronous geometry backend driven by the worker thread.
///
/// Kernels return `Err(reason)` to reject a request; the reason surfaces as
/// [`WorkerError::Rejected`].
pub trait GeometryKernel: Send + 'static {
    fn extract(&mut self, request: ExtractionRequest) -> Result<ExtractionResponse, String>;
    fn parameterize(&mut self, request: UvRequest) -> Result<UvResponse, String>;
    fn cut(&mut self, request: CutRequest) -> Result<CutResponse, String>;
}

enum Job {
    Extract(
        ExtractionRequest,
        oneshot::Sender<Result<ExtractionResponse, WorkerError>>,
    ),
    Parameterize(UvRequest, oneshot::Sender<Result<UvResponse, WorkerError>>),
    Cut(CutRequest, oneshot::Sender<Result<CutResponse, WorkerError>>),
}

/// Ships jobs to a worker thread and resolves each caller's future with that
/// job's reply. Dropping the last handle closes the channel and the thread
/// exits after draining its queue.
pub struct ThreadWorker {
    sender: mpsc::Sender<Job>,
}

impl ThreadWorker {
    pub fn spawn<K: GeometryKernel>(mut kernel: K) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>();
        thread::Builder::new()
            .name("carver-geometry".into())
            .spawn(move || {
                while let Ok(job) = receiver.recv() {
                    // A dropped reply sender means the caller gave up; keep
                    // serving the queue.
                    match job {
                        Job::Extract(request, reply) => {
                            let _ = reply.send(run(kernel.extract(request)));
                        }
                        Job::Parameterize(request, reply) => {
                            let _ = reply.send(run(kernel.parameterize(request)));
                        }
                        Job::Cut(request, reply) => {
                            let _ = reply.send(run(kernel.cut(request)));
                        }
                    }
                }
            })
            .expect("failed to spawn geometry worker thread");
        Self { sender }
    }

    fn submit<T>(&self, job: Job, receiver: oneshot::Receiver<Result<T, WorkerError>>) -> impl std::future::Future<Output = Result<T, WorkerError>> + Send
    where
        T: Send,
    {
        let sent = self.sender.send(job).is_ok();
        async move {
            if !sent {
                return Err(WorkerError::ChannelClosed);
            }
            receiver.await.map_err(|_| WorkerError::ChannelClosed)?
        }
    }
}

fn run<T>(result: Result<T, String>) -> Result<T, WorkerError> {
    result.map_err(|reason| WorkerError::Rejected { reason })
}

impl GeometryWorker for ThreadWorker {
    fn extract(
        &self,
        request: ExtractionRequest,
    ) -> impl std::future::Future<Output = Result<ExtractionResponse, WorkerError>> + Send {
        let (reply, receiver) = oneshot::channel();
        self.submit(Job::Extract(request, reply), receiver)
    }

    fn parameterize(
        &self,
        request: UvRequest,
    ) -> impl std::future::Future<Output = Result<UvResponse, WorkerError>> + Send {
        let (reply, receiver) = oneshot::channel();
        self.submit(Job::Parameterize(request, reply), receiver)
    }

    fn cut(
        &self,
        request: CutRequest,
    ) -> impl std::future::Future<Output = Result<CutResponse, WorkerError>> + Send {
        let (reply, receiver) = oneshot::channel();
        self.submit(Job::Cut(request, reply), receiver)
    }
}
