//! Scripted mock channel for tests and dry runs.
//!
//! Replies are queued FIFO per query text; commands and queries are logged
//! so tests can assert on exact bus traffic (attempt counts, solenoid
//! sequencing). An unscripted query is a transport error, which exercises
//! the same retry paths a flaky instrument would.

use crate::channel::Channel;
use crate::error::{BenchError, BenchResult};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

#[derive(Default)]
pub struct MockChannel {
    replies: Mutex<HashMap<String, VecDeque<String>>>,
    commands: Mutex<Vec<String>>,
    queries: Mutex<Vec<String>>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one reply for the given query text.
    pub async fn push_reply(&self, query: &str, reply: &str) {
        self.replies
            .lock()
            .await
            .entry(query.to_string())
            .or_default()
            .push_back(reply.to_string());
    }

    /// Queues the same reply `count` times.
    pub async fn push_replies(&self, query: &str, reply: &str, count: usize) {
        for _ in 0..count {
            self.push_reply(query, reply).await;
        }
    }

    /// Everything written with `command`, in order.
    pub async fn commands(&self) -> Vec<String> {
        self.commands.lock().await.clone()
    }

    /// Everything queried, in order.
    pub async fn queries(&self) -> Vec<String> {
        self.queries.lock().await.clone()
    }

    /// How many times `text` was queried.
    pub async fn query_count(&self, text: &str) -> usize {
        self.queries.lock().await.iter().filter(|q| *q == text).count()
    }
}

#[async_trait]
impl Channel for MockChannel {
    async fn command(&self, text: &str) -> BenchResult<()> {
        self.commands.lock().await.push(text.to_string());
        Ok(())
    }

    async fn query(&self, text: &str) -> BenchResult<String> {
        self.queries.lock().await.push(text.to_string());
        self.replies
            .lock()
            .await
            .get_mut(text)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| BenchError::Transport(format!("no scripted reply for '{text}'")))
    }

    async fn clear(&self) -> BenchResult<()> {
        Ok(())
    }
}
