use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;

use larder_cache::LruCache;
use larder_core::ProxyConfig;
use larder_observe::{Level, LogSink};
use larder_policy::RoutePolicy;

mod fetch;
pub mod signals;
mod task_queue;
mod tunnel;
mod worker;

pub use task_queue::TaskQueue;

/// Slots in the acceptor-to-worker ring.
pub const QUEUE_CAPACITY: usize = 100;

pub(crate) const IO_CHUNK_SIZE: usize = 8 * 1024;
pub(crate) const MAX_REQUEST_BYTES: usize = 8 * 1024;

/// Shared handles each worker thread receives on spawn.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub(crate) cache: Arc<LruCache>,
    pub(crate) policy: Arc<dyn RoutePolicy>,
    pub(crate) sink: Arc<dyn LogSink>,
    pub(crate) max_element_bytes: usize,
}

pub struct ProxyServer {
    config: ProxyConfig,
    queue: Arc<TaskQueue<TcpStream>>,
    context: WorkerContext,
}

impl ProxyServer {
    pub fn new(
        config: ProxyConfig,
        policy: Arc<dyn RoutePolicy>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        let cache = Arc::new(LruCache::new(
            config.cache_capacity_bytes(),
            config.max_element_bytes(),
            Arc::clone(&sink),
        ));
        let context = WorkerContext {
            cache,
            policy,
            sink,
            max_element_bytes: config.max_element_bytes(),
        };
        Self {
            config,
            queue: Arc::new(TaskQueue::new(QUEUE_CAPACITY)),
            context,
        }
    }

    pub fn bind(&self) -> io::Result<TcpListener> {
        TcpListener::bind(("0.0.0.0", self.config.port))
    }

    pub fn run(self) -> io::Result<()> {
        let listener = self.bind()?;
        self.run_with_listener(listener)
    }

    /// Spawns the worker pool, then accepts until shutdown is requested.
    /// Returns once the queue has drained and every worker has joined.
    pub fn run_with_listener(self, listener: TcpListener) -> io::Result<()> {
        let sink = Arc::clone(&self.context.sink);
        sink.log(
            Level::Info,
            &format!(
                "server starting: port={}, threads={}, cache_size={}MB",
                self.config.port, self.config.threads, self.config.cache_size_mb
            ),
        );

        let workers: Vec<thread::JoinHandle<()>> = (0..self.config.threads)
            .map(|_| {
                let queue = Arc::clone(&self.queue);
                let context = self.context.clone();
                thread::spawn(move || worker::worker_loop(&queue, &context))
            })
            .collect();

        loop {
            if signals::shutdown_requested() {
                break;
            }
            match listener.accept() {
                Ok((stream, _)) => {
                    if signals::shutdown_requested() {
                        break;
                    }
                    self.queue.push(stream);
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {
                    if signals::shutdown_requested() {
                        break;
                    }
                }
                Err(error) => {
                    sink.log(Level::Error, &format!("accept failed: {error}"));
                }
            }
        }

        sink.log(Level::Info, "shutting down server");
        self.queue.close();
        for worker in workers {
            let _ = worker.join();
        }
        sink.log(Level::Info, "server shut down cleanly");
        Ok(())
    }
}

/// Resolves `host` to its first IPv4 address via the system resolver.
pub(crate) fn resolve_ipv4(host: &str, port: u16) -> io::Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()?
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no IPv4 address for host"))
}
