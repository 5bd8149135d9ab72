//! The image request broker.
//!
//! All upstream traffic funnels through one [`ImageBroker`] instance, which
//! enforces three disciplines on top of the raw [`ImageModel`] capability:
//!
//! 1. **Deduplication** — a write-once cache keyed by the full prompt
//!    (caller prompt + style suffix). Repeat `generate` calls for a cached
//!    prompt never touch the queue.
//! 2. **Serialization with pacing** — work items run strictly FIFO, one in
//!    flight at a time, with a fixed delay between consecutive items so the
//!    dispatch rate stays under the service ceiling no matter how many
//!    callers enqueue at once.
//! 3. **Retry with backoff** — every dispatched item runs under the
//!    [`RetryExecutor`], so transient rate-limit failures are absorbed before
//!    the caller sees them.
//!
//! The queue drain is single-flight: an enqueue only spawns the drain task
//! when none is running, and concurrent enqueues collapse into the one active
//! loop. Item failures are delivered to their own caller and never abort the
//! rest of the queue.

mod retry;

pub use retry::RetryExecutor;

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tokio::time::sleep;

use crate::config::BrokerConfig;
use crate::error::{BrokerError, BrokerResult};
use crate::transport::ReqwestTransport;
use crate::types::strip_data_uri_prefix;
use crate::upstream::{GeminiImageModel, ImageModel};

/// A re-invocable unit of upstream work. Re-invocable because the retry
/// executor may need to run it more than once.
type Job = Box<dyn Fn() -> BoxFuture<'static, BrokerResult<String>> + Send + Sync>;

/// One queued unit of work plus the channel its caller is awaiting.
struct WorkItem {
    job: Job,
    done: oneshot::Sender<BrokerResult<String>>,
}

/// Queue contents and the Idle/Draining flag, guarded together so that
/// push-and-check and pop-and-clear are each atomic.
struct QueueState {
    items: VecDeque<WorkItem>,
    draining: bool,
}

struct BrokerInner {
    cache: Mutex<HashMap<String, String>>,
    queue: Mutex<QueueState>,
    upstream: Arc<dyn ImageModel>,
    retry: RetryExecutor,
    request_delay: Duration,
    style_suffix: String,
    edit_style_clause: String,
}

/// Rate-limited, deduplicating, retrying broker for image generation.
///
/// Cheap to clone; all clones share the same cache and queue. Results and
/// `edit` inputs are `data:<mime>;base64,<payload>` strings.
#[derive(Clone)]
pub struct ImageBroker {
    inner: Arc<BrokerInner>,
}

impl ImageBroker {
    /// Create a broker over an explicit upstream capability.
    pub fn new(config: &BrokerConfig, upstream: Arc<dyn ImageModel>) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                cache: Mutex::new(HashMap::new()),
                queue: Mutex::new(QueueState {
                    items: VecDeque::new(),
                    draining: false,
                }),
                upstream,
                retry: RetryExecutor::new(config.retry.clone()),
                request_delay: config.request_delay,
                style_suffix: config.style_suffix.clone(),
                edit_style_clause: config.edit_style_clause.clone(),
            }),
        }
    }

    /// Create a broker backed by the Gemini API over HTTPS.
    pub fn from_config(config: &BrokerConfig) -> BrokerResult<Self> {
        let transport = Arc::new(ReqwestTransport::new(config.timeout, config.connect_timeout)?);
        let upstream = Arc::new(GeminiImageModel::new(config, transport));
        Ok(Self::new(config, upstream))
    }

    /// Generate an image for a prompt, returning a data URI.
    ///
    /// The prompt is augmented with the configured style suffix; the
    /// augmented prompt is the cache key. A cache hit resolves immediately
    /// with no queue or network activity. Failures are never cached.
    pub async fn generate(&self, prompt: &str) -> BrokerResult<String> {
        if prompt.trim().is_empty() {
            return Err(BrokerError::InvalidPrompt {
                message: "prompt must not be empty".to_string(),
            });
        }

        let full_prompt = format!("{prompt}{}", self.inner.style_suffix);

        if let Some(hit) = self.cached(&full_prompt) {
            tracing::debug!("cache hit, skipping queue");
            return Ok(hit);
        }

        let inner = Arc::clone(&self.inner);
        let job: Job = Box::new(move || {
            let inner = Arc::clone(&inner);
            let key = full_prompt.clone();
            Box::pin(async move {
                // An identical prompt may have been queued ahead of this
                // item and already filled the cache; re-check at execution
                // time so duplicates collapse instead of re-calling upstream.
                if let Some(hit) = inner.cache.lock().unwrap().get(&key).cloned() {
                    return Ok(hit);
                }

                let image = inner.upstream.generate_image(&key).await?;
                let uri = image.to_data_uri();

                inner
                    .cache
                    .lock()
                    .unwrap()
                    .entry(key)
                    .or_insert_with(|| uri.clone());

                Ok(uri)
            })
        });

        self.enqueue(job).await
    }

    /// Edit an existing image per a free-text instruction, returning a data
    /// URI.
    ///
    /// Accepts either a data URI or bare base64; any data-URI prefix is
    /// stripped before the payload goes upstream. The instruction is
    /// augmented with the configured style-preservation clause. Edits are
    /// never cached.
    pub async fn edit(&self, image: &str, instruction: &str) -> BrokerResult<String> {
        if instruction.trim().is_empty() {
            return Err(BrokerError::InvalidPrompt {
                message: "edit instruction must not be empty".to_string(),
            });
        }

        let base64 = strip_data_uri_prefix(image).to_string();
        if base64.trim().is_empty() {
            return Err(BrokerError::InvalidImageData {
                message: "empty image payload".to_string(),
            });
        }

        let full_instruction = format!(
            "Edit this image: {instruction}. {}",
            self.inner.edit_style_clause
        );

        let inner = Arc::clone(&self.inner);
        let job: Job = Box::new(move || {
            let inner = Arc::clone(&inner);
            let base64 = base64.clone();
            let instruction = full_instruction.clone();
            Box::pin(async move {
                let image = inner.upstream.edit_image(&base64, &instruction).await?;
                Ok(image.to_data_uri())
            })
        });

        self.enqueue(job).await
    }

    /// Look up a full prompt in the cache.
    fn cached(&self, full_prompt: &str) -> Option<String> {
        self.inner.cache.lock().unwrap().get(full_prompt).cloned()
    }

    /// Append a work item and wake the drain loop if it is idle.
    async fn enqueue(&self, job: Job) -> BrokerResult<String> {
        let (done, result) = oneshot::channel();

        let start_drain = {
            let mut queue = self.inner.queue.lock().unwrap();
            queue.items.push_back(WorkItem { job, done });
            if queue.draining {
                false
            } else {
                queue.draining = true;
                true
            }
        };

        if start_drain {
            tokio::spawn(drain(Arc::clone(&self.inner)));
        }

        result.await.map_err(|_| BrokerError::Network {
            message: "work item dropped before completion".to_string(),
        })?
    }
}

impl std::fmt::Debug for ImageBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queued = self.inner.queue.lock().unwrap().items.len();
        let cached = self.inner.cache.lock().unwrap().len();
        f.debug_struct("ImageBroker")
            .field("queued", &queued)
            .field("cached", &cached)
            .finish()
    }
}

/// The single-flight drain loop.
///
/// Pops items strictly FIFO, runs each under the retry executor, delivers the
/// outcome to its caller, and sleeps the pacing delay before the next item
/// (never after the last). Exactly one drain task exists at a time; the flag
/// is cleared under the same lock acquisition that observes the empty queue,
/// so an enqueue racing with shutdown either lands in front of this loop or
/// spawns the next one.
async fn drain(inner: Arc<BrokerInner>) {
    tracing::debug!("drain loop started");

    loop {
        let item = {
            let mut queue = inner.queue.lock().unwrap();
            match queue.items.pop_front() {
                Some(item) => item,
                None => {
                    queue.draining = false;
                    break;
                }
            }
        };

        let result = inner.retry.execute(|| (item.job)()).await;

        if item.done.send(result).is_err() {
            tracing::debug!("caller went away before its result was ready");
        }

        let more_queued = !inner.queue.lock().unwrap().items.is_empty();
        if more_queued {
            sleep(inner.request_delay).await;
        }
    }

    tracing::debug!("drain loop idle");
}
