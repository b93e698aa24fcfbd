use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::models::{Bottleneck, Severity};

/// Fixed, ordered set of threshold advisories. Immutable once built.
#[derive(Clone, Debug)]
pub struct BottleneckCatalog {
    entries: Vec<Bottleneck>,
}

impl BottleneckCatalog {
    pub fn new(entries: Vec<Bottleneck>) -> Result<Self> {
        validate_entries(&entries)?;
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[Bottleneck] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records with `users >= triggers_at`, in catalog order.
    pub fn evaluate(&self, users: u32) -> Vec<Bottleneck> {
        self.entries
            .iter()
            .filter(|entry| entry.is_active(users))
            .cloned()
            .collect()
    }

    /// Lowest threshold that `users` has not reached yet.
    pub fn next_threshold(&self, users: u32) -> Option<u32> {
        self.entries
            .iter()
            .filter(|entry| !entry.is_active(users))
            .map(|entry| entry.triggers_at)
            .min()
    }

    pub fn sorted_by_threshold(&self) -> Vec<&Bottleneck> {
        let mut sorted: Vec<&Bottleneck> = self.entries.iter().collect();
        sorted.sort_by_key(|entry| entry.triggers_at);
        sorted
    }
}

impl Default for BottleneckCatalog {
    fn default() -> Self {
        Self {
            entries: default_entries(),
        }
    }
}

fn validate_entries(entries: &[Bottleneck]) -> Result<()> {
    if entries.is_empty() {
        return Err(Error::EmptyCatalog);
    }
    let mut ids = HashSet::new();
    for entry in entries {
        if entry.id.trim().is_empty() {
            return Err(Error::EmptyBottleneckId);
        }
        if entry.triggers_at == 0 {
            return Err(Error::InvalidTrigger(entry.id.clone()));
        }
        if !ids.insert(entry.id.as_str()) {
            return Err(Error::DuplicateBottleneckId(entry.id.clone()));
        }
    }
    Ok(())
}

fn entry(
    id: &str,
    name: &str,
    severity: Severity,
    triggers_at: u32,
    description: &str,
    solution: &str,
) -> Bottleneck {
    Bottleneck {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        severity,
        triggers_at,
        solution: solution.to_string(),
    }
}

fn default_entries() -> Vec<Bottleneck> {
    vec![
        entry(
            "db-connections",
            "DB Connection Pool",
            Severity::Medium,
            500,
            "The database accepts a limited number of concurrent connections. Past the limit, requests queue up waiting for one.",
            "Pool connections and add read replicas to spread the load.",
        ),
        entry(
            "memory-leak",
            "Memory Growth",
            Severity::High,
            1000,
            "Local state accumulates in memory. With many users, memory runs out.",
            "Move to a stateless architecture with external sessions (Redis) or JWTs.",
        ),
        entry(
            "single-thread",
            "Single Thread Blocking",
            Severity::High,
            2000,
            "Synchronous operations block the main thread and slow down every request.",
            "Push long-running work onto message queues (RabbitMQ, SQS) handled by async workers.",
        ),
        entry(
            "no-cache",
            "Missing Cache",
            Severity::Medium,
            800,
            "Every request hits the database. Under heavy traffic the database becomes the bottleneck.",
            "Add multi-level caching: CDN for assets, Redis for data, browser cache.",
        ),
        entry(
            "monolith",
            "Monolithic Architecture",
            Severity::Low,
            3000,
            "A single service handles everything. A spike in one feature affects the whole system.",
            "Consider microservices to isolate load and scale components independently.",
        ),
    ]
}
