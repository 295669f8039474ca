//! Asynchronous image loading
//!
//! Widgets start loads through the [`ImageLoader`] trait and get their
//! completion callback on the UI thread. Loaders never call back from inside
//! `load`; completions are delivered when the host calls `pump`.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

use crate::error::{ImageError, Result};
use crate::loader::ImageData;
use crate::source::ImageSource;

/// Completion callback, invoked once on the UI thread
pub type LoadCallback = Box<dyn FnOnce(Result<ImageData>)>;

pub trait ImageLoader {
    /// Start loading `source`
    fn load(&self, source: ImageSource, on_done: LoadCallback);

    /// Deliver finished loads; returns how many callbacks ran
    fn pump(&self) -> usize;

    /// Loads started but not yet delivered
    fn pending(&self) -> usize;
}

type Completion = (u64, Result<ImageData>);

/// Decodes on a tokio runtime owned by the loader
pub struct TokioImageLoader {
    runtime: Runtime,
    tx: UnboundedSender<Completion>,
    rx: RefCell<UnboundedReceiver<Completion>>,
    callbacks: RefCell<FxHashMap<u64, LoadCallback>>,
    next_ticket: Cell<u64>,
}

impl TokioImageLoader {
    pub fn new() -> Result<Self> {
        Self::with_workers(2)
    }

    pub fn with_workers(workers: usize) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers.max(1))
            .thread_name("sus-image")
            .enable_all()
            .build()
            .map_err(|e| ImageError::Runtime(e.to_string()))?;
        let (tx, rx) = unbounded_channel();

        Ok(Self {
            runtime,
            tx,
            rx: RefCell::new(rx),
            callbacks: RefCell::new(FxHashMap::default()),
            next_ticket: Cell::new(0),
        })
    }

    /// Pump until nothing is pending or `timeout` elapses
    pub fn wait_idle(&self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut delivered = 0;
        loop {
            delivered += self.pump();
            if self.pending() == 0 || Instant::now() >= deadline {
                return delivered;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

async fn load_source(source: ImageSource) -> Result<ImageData> {
    #[cfg(feature = "network")]
    if matches!(source, ImageSource::Url(_)) {
        return ImageData::load_async(source).await;
    }

    tokio::task::spawn_blocking(move || ImageData::load(source))
        .await
        .map_err(|e| ImageError::Runtime(e.to_string()))?
}

impl ImageLoader for TokioImageLoader {
    fn load(&self, source: ImageSource, on_done: LoadCallback) {
        let ticket = self.next_ticket.get();
        self.next_ticket.set(ticket + 1);
        self.callbacks.borrow_mut().insert(ticket, on_done);

        debug!(ticket, source = %source.describe(), "image load started");
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = load_source(source).await;
            // Receiver gone means the loader was dropped
            let _ = tx.send((ticket, result));
        });
    }

    fn pump(&self) -> usize {
        let mut delivered = 0;
        loop {
            let next = self.rx.borrow_mut().try_recv();
            let Ok((ticket, result)) = next else {
                return delivered;
            };
            let callback = self.callbacks.borrow_mut().remove(&ticket);
            if let Some(callback) = callback {
                trace!(ticket, ok = result.is_ok(), "image load delivered");
                callback(result);
                delivered += 1;
            }
        }
    }

    fn pending(&self) -> usize {
        self.callbacks.borrow().len()
    }
}

/// Decodes on the calling thread inside `load` and queues the completion
/// for the next `pump`. Deterministic; suited to tests and batch tools.
#[derive(Default)]
pub struct BlockingImageLoader {
    queue: RefCell<VecDeque<(LoadCallback, Result<ImageData>)>>,
}

impl BlockingImageLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ImageLoader for BlockingImageLoader {
    fn load(&self, source: ImageSource, on_done: LoadCallback) {
        debug!(source = %source.describe(), "image load started");
        let result = ImageData::load(source);
        self.queue.borrow_mut().push_back((on_done, result));
    }

    fn pump(&self) -> usize {
        let mut delivered = 0;
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some((callback, result)) = next else {
                return delivered;
            };
            callback(result);
            delivered += 1;
        }
    }

    fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}
