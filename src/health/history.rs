use std::collections::{HashMap, VecDeque};

pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Bounded score series per check id, oldest first.
///
/// Not synchronised on its own: the engine owns it inside its run state and
/// only appends while holding the run gate.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    window: usize,
    series: HashMap<String, VecDeque<u8>>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_WINDOW)
    }
}

impl HistoryStore {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            series: HashMap::new(),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn append(&mut self, check_id: &str, score: u8) {
        let series = self
            .series
            .entry(check_id.to_string())
            .or_insert_with(|| VecDeque::with_capacity(self.window));
        series.push_back(score);

        while series.len() > self.window {
            series.pop_front();
        }
    }

    pub fn latest(&self, check_id: &str) -> Option<u8> {
        self.series.get(check_id).and_then(|s| s.back().copied())
    }

    pub fn series(&self, check_id: &str) -> Option<Vec<u8>> {
        self.series
            .get(check_id)
            .map(|s| s.iter().copied().collect())
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
