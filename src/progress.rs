use std::{
    convert::Infallible,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use rocket::{
    futures::{Stream, StreamExt},
    request::{FromRequest, Outcome},
    Request,
};

const UNSET: u64 = u64::MAX;

#[derive(Debug)]
struct ProgressState {
    content_length: u64,
    received:       AtomicU64,
    percentage:     AtomicU64,
}

/// Tracks how much of a request body has been received.
///
/// Clones share the same state, so the progress can be polled while the body is being read. As a request guard, every guard of the same request gets the same instance.
#[derive(Debug, Clone)]
pub struct UploadProgress {
    state: Arc<ProgressState>,
}

impl UploadProgress {
    /// Create an `UploadProgress` instance for a body of `content_length` bytes. Zero disables tracking.
    #[inline]
    pub fn new(content_length: u64) -> UploadProgress {
        UploadProgress {
            state: Arc::new(ProgressState {
                content_length,
                received: AtomicU64::new(0),
                percentage: AtomicU64::new(UNSET),
            }),
        }
    }

    /// Create an `UploadProgress` instance from the value of a `Content-Length` header. A missing or invalid value disables tracking.
    #[inline]
    pub fn from_content_length(header: Option<&str>) -> UploadProgress {
        UploadProgress::new(header.and_then(|v| v.trim().parse().ok()).unwrap_or(0))
    }

    /// Whether the total length is known.
    #[inline]
    pub fn is_monitored(&self) -> bool {
        self.state.content_length > 0
    }

    #[inline]
    pub fn content_length(&self) -> u64 {
        self.state.content_length
    }

    /// The number of bytes observed so far. Always 0 when tracking is disabled.
    #[inline]
    pub fn received(&self) -> u64 {
        self.state.received.load(Ordering::Relaxed)
    }

    /// The rounded percentage of the received bytes. `None` before the first chunk or when tracking is disabled.
    #[inline]
    pub fn percentage(&self) -> Option<u64> {
        match self.state.percentage.load(Ordering::Relaxed) {
            UNSET => None,
            n => Some(n),
        }
    }

    /// Record a received chunk.
    pub fn observe(&self, chunk_len: usize) {
        let total = self.state.content_length;

        if total == 0 {
            return;
        }

        let received =
            self.state.received.fetch_add(chunk_len as u64, Ordering::Relaxed) + chunk_len as u64;

        let percentage = (received as u128 * 100 + total as u128 / 2) / total as u128;

        self.state.percentage.store(percentage.min((UNSET - 1) as u128) as u64, Ordering::Relaxed);
    }
}

/// Wrap a stream of body chunks so that every chunk is recorded by `progress`. Errors pass through without being recorded.
pub fn add_progress_monitoring<S, B, E>(
    stream: S,
    progress: &UploadProgress,
) -> impl Stream<Item = Result<B, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>, {
    let progress = progress.clone();

    stream.inspect(move |chunk| {
        if let Ok(bytes) = chunk {
            progress.observe(bytes.as_ref().len());
        }
    })
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for UploadProgress {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let progress = request.local_cache(|| {
            UploadProgress::from_content_length(request.headers().get_one("Content-Length"))
        });

        Outcome::Success(progress.clone())
    }
}
