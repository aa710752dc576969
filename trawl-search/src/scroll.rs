//! Streaming every match of a search through a scroll cursor.
//!
//! [`ScrollStream::start`] sends the first search itself, then hands the
//! cursor to a background worker. The worker pushes records one at a time
//! through a single-slot channel, fetches the next page when the current one
//! is delivered, and releases the cursor when it stops for any reason.

use crate::{
    body::SearchBody,
    error::{Result, SearchError},
    response::Hit,
    transport::SearchTransport,
};
use futures::{FutureExt, Stream};
use serde_json::{Value, json};
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use trawl_log::{debug, warn};

/// Default cursor time-to-live.
pub const DEFAULT_TTL: &str = "5m";

/// Default page size.
pub const DEFAULT_PAGE_SIZE: u64 = 1000;

/// Options for a scroll.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollOptions {
    /// How long the cluster keeps the cursor alive between pages.
    pub ttl: String,
    /// Records per page.
    pub size: u64,
    /// Keep the body's sort. When false, the sort is replaced by `_doc`
    /// order, which is the cheapest order for the cluster to serve.
    pub preserve_order: bool,
    /// Indices to scroll over; all indices when empty.
    pub indices: Vec<String>,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL.to_string(),
            size: DEFAULT_PAGE_SIZE,
            preserve_order: false,
            indices: Vec::new(),
        }
    }
}

impl ScrollOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cursor time-to-live, e.g. `"1m"`.
    pub fn with_ttl(mut self, ttl: impl Into<String>) -> Self {
        self.ttl = ttl.into();
        self
    }

    /// Set the page size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Keep the sort given in the body.
    pub fn preserve_order(mut self, preserve: bool) -> Self {
        self.preserve_order = preserve;
        self
    }

    /// Add an index.
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.indices.push(index.into());
        self
    }
}

/// Lifecycle of a scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollState {
    /// First search in flight.
    Initializing,
    /// The worker is delivering records.
    Streaming,
    /// The worker is releasing the cursor.
    Draining,
    /// Finished normally or cancelled.
    Closed,
    /// Finished with an error.
    Failed,
}

impl ScrollState {
    /// Whether the state is final.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScrollState::Closed | ScrollState::Failed)
    }
}

/// What the worker passes to the consumer.
#[derive(Debug)]
enum Handoff {
    Record(Hit),
    Failed(SearchError),
    End,
}

#[derive(Debug, Clone)]
enum Terminal {
    Closed,
    Failed(SearchError),
}

/// Why the worker stopped streaming.
enum Exit {
    Exhausted,
    Cancelled,
    ConsumerGone,
}

/// Forward-only sequence of scroll records.
///
/// Pull with [`pull`](Self::pull) or consume as a [`Stream`]. Dropping the
/// stream cancels the worker, which still releases the cursor.
///
/// ```rust,no_run
/// use trawl_search::{OpenSearchClient, Query, ScrollOptions, SearchBody, SearchConfig};
///
/// # async fn run() -> trawl_search::Result<()> {
/// let client = OpenSearchClient::new(SearchConfig::new("http://localhost:9200"))?;
/// let body = SearchBody::new().query(Query::term("status", "active"));
/// let mut stream = client.scan(body, ScrollOptions::new().index("users")).await?;
/// while let Some(hit) = stream.pull().await? {
///     println!("{}", hit.id);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ScrollStream {
    rx: mpsc::Receiver<Handoff>,
    state: watch::Receiver<ScrollState>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
    terminal: Option<Terminal>,
}

impl ScrollStream {
    /// Send the first search and start streaming.
    ///
    /// Errors from validating the body or from the first request are
    /// returned here. An empty first page yields a stream that is already
    /// closed.
    pub async fn start<T>(transport: T, body: SearchBody, options: ScrollOptions) -> Result<Self>
    where
        T: SearchTransport + 'static,
    {
        let mut body = body.size(options.size);
        if !options.preserve_order {
            body = body.set_sort(vec![json!({"_doc": "asc"})]);
        }
        let document = body.build()?;

        let (state_tx, state_rx) = watch::channel(ScrollState::Initializing);
        debug!("Starting scroll on {:?} (ttl {})", options.indices, options.ttl);

        let first = transport
            .search(&options.indices, Value::Object(document), Some(&options.ttl))
            .await?;
        let hits = first.hits.hits;

        let cursor = match first.scroll_id {
            Some(cursor) if !hits.is_empty() => cursor,
            cursor => {
                debug!("Scroll returned no records");
                if let Some(cursor) = cursor {
                    release(&transport, &cursor).await;
                }
                set_state(&state_tx, ScrollState::Closed);
                return Ok(Self::closed(state_rx));
            }
        };

        let (tx, rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let worker = Worker {
            transport,
            ttl: options.ttl,
            cursor,
            cancel: cancel.clone(),
            state: state_tx,
        };
        let handle = tokio::spawn(worker.run(hits, tx));

        Ok(Self {
            rx,
            state: state_rx,
            cancel,
            worker: Some(handle),
            terminal: None,
        })
    }

    fn closed(state: watch::Receiver<ScrollState>) -> Self {
        let (_, rx) = mpsc::channel(1);
        Self {
            rx,
            state,
            cancel: CancellationToken::new(),
            worker: None,
            terminal: Some(Terminal::Closed),
        }
    }

    /// Next record, `None` at the end, or the error that ended the scroll.
    ///
    /// Once the scroll has ended, every later pull returns the same outcome.
    pub async fn pull(&mut self) -> Result<Option<Hit>> {
        match &self.terminal {
            Some(Terminal::Closed) => return Ok(None),
            Some(Terminal::Failed(e)) => return Err(e.clone()),
            None => {}
        }
        let handoff = self.rx.recv().await;
        self.accept(handoff)
    }

    fn accept(&mut self, handoff: Option<Handoff>) -> Result<Option<Hit>> {
        match handoff {
            Some(Handoff::Record(hit)) => Ok(Some(hit)),
            Some(Handoff::End) => {
                self.terminal = Some(Terminal::Closed);
                Ok(None)
            }
            Some(Handoff::Failed(e)) => {
                self.terminal = Some(Terminal::Failed(e.clone()));
                Err(e)
            }
            None if self.cancel.is_cancelled() => {
                self.terminal = Some(Terminal::Closed);
                Ok(None)
            }
            None => {
                let e = SearchError::Interrupted("scroll worker stopped without a result".to_string());
                self.terminal = Some(Terminal::Failed(e.clone()));
                Err(e)
            }
        }
    }

    /// Stop the scroll. Later pulls return `None`.
    ///
    /// The worker releases the cursor in the background; use
    /// [`close`](Self::close) to wait for that.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        if self.terminal.is_none() {
            self.terminal = Some(Terminal::Closed);
        }
    }

    /// Cancel and wait for the worker to release the cursor.
    pub async fn close(mut self) {
        self.cancel();
        if let Some(handle) = self.worker.take() {
            if let Err(e) = handle.await {
                warn!("Scroll worker ended abnormally: {}", e);
            }
        }
    }

    /// Drain the remaining records.
    pub async fn collect_all(mut self) -> Result<Vec<Hit>> {
        let mut hits = Vec::new();
        while let Some(hit) = self.pull().await? {
            hits.push(hit);
        }
        Ok(hits)
    }

    /// Current worker state.
    pub fn state(&self) -> ScrollState {
        *self.state.borrow()
    }

    /// Whether the consumer has seen the end of the scroll.
    pub fn is_finished(&self) -> bool {
        self.terminal.is_some()
    }
}

impl Stream for ScrollStream {
    type Item = Result<Hit>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.terminal.is_some() {
            return Poll::Ready(None);
        }
        let handoff = ready!(this.rx.poll_recv(cx));
        Poll::Ready(this.accept(handoff).transpose())
    }
}

impl Drop for ScrollStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Worker<T> {
    transport: T,
    ttl: String,
    cursor: String,
    cancel: CancellationToken,
    state: watch::Sender<ScrollState>,
}

impl<T: SearchTransport> Worker<T> {
    async fn run(mut self, first: Vec<Hit>, tx: mpsc::Sender<Handoff>) {
        set_state(&self.state, ScrollState::Streaming);

        let outcome = AssertUnwindSafe(self.stream(first, &tx))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(SearchError::Interrupted("scroll worker panicked".to_string())));

        set_state(&self.state, ScrollState::Draining);
        release(&self.transport, &self.cursor).await;

        let handoff = match outcome {
            Ok(Exit::Exhausted) => Handoff::End,
            Ok(Exit::Cancelled) | Ok(Exit::ConsumerGone) => {
                set_state(&self.state, ScrollState::Closed);
                return;
            }
            Err(e) => {
                warn!("Scroll failed: {}", e);
                Handoff::Failed(e)
            }
        };

        let terminal = match handoff {
            Handoff::Failed(_) => ScrollState::Failed,
            _ => ScrollState::Closed,
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {}
            _ = tx.send(handoff) => {}
        }
        set_state(&self.state, terminal);
    }

    async fn stream(&mut self, first: Vec<Hit>, tx: &mpsc::Sender<Handoff>) -> Result<Exit> {
        let mut page = first;

        loop {
            for hit in page {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Ok(Exit::Cancelled),
                    sent = tx.send(Handoff::Record(hit)) => {
                        if sent.is_err() {
                            return Ok(Exit::ConsumerGone);
                        }
                    }
                }
            }

            if self.cancel.is_cancelled() {
                return Ok(Exit::Cancelled);
            }

            let response = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(Exit::Cancelled),
                response = self.transport.scroll(&self.ttl, &self.cursor) => response?,
            };

            let Some(cursor) = response.scroll_id else {
                return Ok(Exit::Exhausted);
            };
            if response.hits.hits.is_empty() {
                return Ok(Exit::Exhausted);
            }
            self.cursor = cursor;
            page = response.hits.hits;
            debug!("Scroll page with {} records", page.len());
        }
    }
}

fn set_state(state: &watch::Sender<ScrollState>, next: ScrollState) {
    debug!("Scroll state: {:?}", next);
    state.send_replace(next);
}

async fn release<T: SearchTransport + ?Sized>(transport: &T, cursor: &str) {
    match transport.clear_scroll(&[cursor.to_string()]).await {
        Ok(response) => debug!("Released scroll cursor (freed {})", response.num_freed),
        Err(e) => warn!("Failed to release scroll cursor: {}", e),
    }
}
