// ABOUTME: FanOutReport - per-target outcomes of a drained batch.
// ABOUTME: Outcomes stay in submission order and are looked up by target.

use crate::error::TaskError;

/// Outcome of one task.
#[derive(Debug)]
pub struct FanOutOutcome<T> {
    pub target: String,
    pub result: Result<T, TaskError>,
}

/// Every outcome of a batch, in submission order.
#[derive(Debug)]
pub struct FanOutReport<T> {
    outcomes: Vec<FanOutOutcome<T>>,
}

impl<T> Default for FanOutReport<T> {
    fn default() -> Self {
        Self {
            outcomes: Vec::new(),
        }
    }
}

impl<T> FanOutReport<T> {
    pub(crate) fn new(outcomes: Vec<FanOutOutcome<T>>) -> Self {
        Self { outcomes }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Outcome for `target`. With duplicate targets the first one wins.
    pub fn get(&self, target: &str) -> Option<&Result<T, TaskError>> {
        self.outcomes
            .iter()
            .find(|o| o.target == target)
            .map(|o| &o.result)
    }

    pub fn outcomes(&self) -> &[FanOutOutcome<T>] {
        &self.outcomes
    }

    pub fn successes(&self) -> impl Iterator<Item = (&str, &T)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|v| (o.target.as_str(), v)))
    }

    pub fn failures(&self) -> impl Iterator<Item = &TaskError> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }

    pub fn is_all_ok(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// All values, or the first error in submission order.
    pub fn into_values(self) -> Result<Vec<(String, T)>, TaskError> {
        self.outcomes
            .into_iter()
            .map(|o| o.result.map(|v| (o.target, v)))
            .collect()
    }
}

impl<T> IntoIterator for FanOutReport<T> {
    type Item = FanOutOutcome<T>;
    type IntoIter = std::vec::IntoIter<FanOutOutcome<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.into_iter()
    }
}
