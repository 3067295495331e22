// ABOUTME: FanOutTask and FanOutBatch - independent operations bound to targets.
// ABOUTME: A batch is submitted as a unit; each task gets its own worker.

use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;

/// One operation bound to one target identifier.
pub struct FanOutTask<T> {
    pub(crate) target: String,
    pub(crate) future: BoxFuture<'static, anyhow::Result<T>>,
}

impl<T> FanOutTask<T> {
    pub fn new<F>(target: impl Into<String>, future: F) -> Self
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            target: target.into(),
            future: future.boxed(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl<T> std::fmt::Debug for FanOutTask<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanOutTask")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Tasks submitted together.
///
/// Tasks in one batch must act on disjoint devices; nothing here locks.
#[derive(Debug)]
pub struct FanOutBatch<T> {
    pub(crate) tasks: Vec<FanOutTask<T>>,
}

impl<T> Default for FanOutBatch<T> {
    fn default() -> Self {
        Self { tasks: Vec::new() }
    }
}

impl<T> FanOutBatch<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// One task per target, built by `op`.
    pub fn for_targets<I, K, F, Fut>(targets: I, mut op: F) -> Self
    where
        I: IntoIterator<Item = K>,
        K: ToString,
        F: FnMut(K) -> Fut,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let mut batch = Self::new();
        for target in targets {
            let name = target.to_string();
            batch.push(name, op(target));
        }
        batch
    }

    pub fn push<F>(&mut self, target: impl Into<String>, future: F) -> &mut Self
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        self.tasks.push(FanOutTask::new(target, future));
        self
    }

    /// Builder-style [`FanOutBatch::push`].
    pub fn task<F>(mut self, target: impl Into<String>, future: F) -> Self
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        self.push(target, future);
        self
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn targets(&self) -> Vec<&str> {
        self.tasks.iter().map(FanOutTask::target).collect()
    }
}

impl<T> FromIterator<FanOutTask<T>> for FanOutBatch<T> {
    fn from_iter<I: IntoIterator<Item = FanOutTask<T>>>(iter: I) -> Self {
        Self {
            tasks: iter.into_iter().collect(),
        }
    }
}
