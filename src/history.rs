use std::collections::VecDeque;

use crate::models::MetricDataPoint;

pub const HISTORY_CAPACITY: usize = 60;

/// Rolling window of response-time samples. Oldest samples are evicted first.
#[derive(Clone, Debug)]
pub struct HistoryBuffer {
    points: VecDeque<MetricDataPoint>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, point: MetricDataPoint) {
        self.points.push_back(point);
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }

    pub fn reset(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Option<&MetricDataPoint> {
        self.points.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricDataPoint> {
        self.points.iter()
    }

    pub fn to_vec(&self) -> Vec<MetricDataPoint> {
        self.points.iter().copied().collect()
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}
