//! Lazy iteration over offset/limit endpoints
//!
//! [`Paged`] fetches one page at a time through a [`PageFetcher`] and hands
//! out items in server order. The sequence is single-pass: it ends when the
//! reported total is reached, when a short page arrives, or at the first
//! error.

use std::collections::VecDeque;
use std::fmt;

use async_trait::async_trait;
use futures::stream::{self, Stream};

use crate::error::Result;

/// One page of results
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total item count, when the endpoint reports it
    pub total: Option<u64>,
}

/// Fetches the page starting at `offset`
#[async_trait]
pub trait PageFetcher<T>: Send {
    async fn fetch(&mut self, offset: u64, limit: u32) -> Result<Page<T>>;
}

/// Single-pass sequence of items across pages
pub struct Paged<T> {
    fetcher: Box<dyn PageFetcher<T>>,
    buffer: VecDeque<T>,
    offset: u64,
    limit: u32,
    total: Option<u64>,
    done: bool,
}

impl<T> fmt::Debug for Paged<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Paged")
            .field("offset", &self.offset)
            .field("limit", &self.limit)
            .field("total", &self.total)
            .field("buffered", &self.buffer.len())
            .field("done", &self.done)
            .finish()
    }
}

impl<T: Send + 'static> Paged<T> {
    pub fn new(fetcher: impl PageFetcher<T> + 'static, limit: u32) -> Self {
        Self {
            fetcher: Box::new(fetcher),
            buffer: VecDeque::new(),
            offset: 0,
            limit: limit.max(1),
            total: None,
            done: false,
        }
    }

    /// Page size requested from the server
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Total reported by the first page
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Next item, fetching a new page when the buffer runs dry
    pub async fn next(&mut self) -> Option<Result<T>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }
            if let Some(total) = self.total {
                if self.offset >= total {
                    self.done = true;
                    return None;
                }
            }

            match self.fetcher.fetch(self.offset, self.limit).await {
                Ok(page) => {
                    if self.total.is_none() {
                        self.total = page.total;
                    }
                    if page.items.len() < self.limit as usize {
                        self.done = true;
                    }
                    self.offset += self.limit as u64;
                    self.buffer.extend(page.items);
                }
                Err(e) => {
                    self.done = true;
                    self.buffer.clear();
                    return Some(Err(e));
                }
            }
        }
    }

    /// Drain the sequence into a vector, stopping at the first error
    pub async fn collect_all(mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item?);
        }
        Ok(items)
    }

    /// Expose the sequence as a [`Stream`]
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> + Send {
        stream::unfold(self, |mut paged| async move {
            let item = paged.next().await?;
            Some((item, paged))
        })
    }
}
