//! Corpus-wide statistics built in a single pass over parsed sessions.

use crate::classifier::classify;
use crate::logging::append_run_log;
use crate::types::{ProblemCategory, SessionRecord};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryBucket {
    pub category: ProblemCategory,
    pub records: Vec<SessionRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceCount {
    pub namespace: String,
    pub incidents: usize,
}

/// Categories and namespaces are kept in first-seen order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateStatistics {
    categories: Vec<CategoryBucket>,
    namespaces: Vec<NamespaceCount>,
    key_learnings: Vec<String>,
    #[serde(skip)]
    category_index: HashMap<ProblemCategory, usize>,
    #[serde(skip)]
    namespace_index: HashMap<String, usize>,
}

impl AggregateStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, record: &SessionRecord) {
        let category = classify(record);
        let slot = *self.category_index.entry(category).or_insert_with(|| {
            self.categories.push(CategoryBucket {
                category,
                records: Vec::new(),
            });
            self.categories.len() - 1
        });
        self.categories[slot].records.push(record.clone());

        for namespace in &record.namespaces {
            let slot = *self
                .namespace_index
                .entry(namespace.clone())
                .or_insert_with(|| {
                    self.namespaces.push(NamespaceCount {
                        namespace: namespace.clone(),
                        incidents: 0,
                    });
                    self.namespaces.len() - 1
                });
            self.namespaces[slot].incidents += 1;
        }

        self.key_learnings
            .extend(record.key_learnings.iter().cloned());
    }

    pub fn categories(&self) -> &[CategoryBucket] {
        &self.categories
    }

    pub fn records_in(&self, category: ProblemCategory) -> &[SessionRecord] {
        self.category_index
            .get(&category)
            .map(|slot| self.categories[*slot].records.as_slice())
            .unwrap_or(&[])
    }

    pub fn namespaces(&self) -> &[NamespaceCount] {
        &self.namespaces
    }

    pub fn namespace_incidents(&self, namespace: &str) -> usize {
        self.namespace_index
            .get(namespace)
            .map(|slot| self.namespaces[*slot].incidents)
            .unwrap_or(0)
    }

    pub fn key_learnings(&self) -> &[String] {
        &self.key_learnings
    }

    pub fn total_records(&self) -> usize {
        self.categories.iter().map(|bucket| bucket.records.len()).sum()
    }
}

pub fn aggregate(records: &[SessionRecord]) -> AggregateStatistics {
    let mut stats = AggregateStatistics::new();
    for record in records {
        stats.ingest(record);
    }
    append_run_log(
        "info",
        "aggregator.completed",
        json!({
            "records": records.len(),
            "categories": stats.categories.len(),
            "namespaces": stats.namespaces.len(),
            "key_learnings": stats.key_learnings.len(),
        }),
    );
    stats
}
