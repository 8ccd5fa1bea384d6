//! Worker farm shape: how many concurrent worker loops to run per role
//! (§4.9, `SWFWorker.start(farm)`).

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct Farm {
    workers: HashMap<String, usize>,
}

impl Farm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, name: impl Into<String>, count: usize) -> Self {
        self.workers.insert(name.into(), count.max(1));
        self
    }

    pub fn roles(&self) -> impl Iterator<Item = (&str, usize)> {
        self.workers.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
