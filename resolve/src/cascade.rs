use std::{sync::Arc, time::Duration};

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    client::{HttpMatchService, MatchService, NameResult, ServiceError},
    config::ResolverConfig,
    name::{clean_scientific_name, extract_genus},
    record::{MatchLevel, ResolutionRecord},
};

/// Ranks accepted for a genus-stage hit. A genus-only query must not yield
/// a more specific match than the query itself expresses.
pub const GENUS_ACCEPT_RANKS: [&str; 6] =
    ["genus", "family", "order", "class", "phylum", "kingdom"];

/// Progress counters for one cascade stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    /// Stage name: "original", "cleaned", or "genus".
    pub stage: &'static str,
    /// Distinct query strings sent to the service during the stage.
    pub queried: usize,
    /// Input names holding an identifier once the stage finished.
    pub matched: usize,
    /// Input names still without an identifier.
    pub remaining: usize,
}

/// Resolution map plus per-stage counters.
#[derive(Debug)]
pub struct ResolutionOutcome {
    /// One record per distinct input name.
    pub records: IndexMap<String, ResolutionRecord>,
    /// Counters per executed stage, in stage order.
    pub stages: Vec<StageReport>,
}

/// Drives the three-stage resolution cascade over a set of names.
pub struct Resolver {
    config: ResolverConfig,
    service: Arc<dyn MatchService>,
}

impl Resolver {
    /// Creates a resolver over an explicit service implementation.
    #[must_use]
    pub fn new(config: ResolverConfig, service: Arc<dyn MatchService>) -> Self {
        Self { config, service }
    }

    /// Creates a resolver backed by the live HTTP endpoint from the config.
    pub fn from_config(config: ResolverConfig) -> Result<Self, ServiceError> {
        let service = HttpMatchService::new(&config.endpoint, config.timeout())?;
        Ok(Self::new(config, Arc::new(service)))
    }

    /// Resolves every distinct name, producing exactly one record per name.
    ///
    /// Service failures degrade to zero candidates for the affected batch;
    /// they never abort the cascade. Once a record carries an identifier no
    /// later stage replaces it.
    pub async fn resolve_names(&self, names: &[String]) -> ResolutionOutcome {
        let distinct: IndexSet<String> = names
            .iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        let mut records: IndexMap<String, ResolutionRecord> = IndexMap::new();
        let mut stages = Vec::new();

        if distinct.is_empty() {
            return ResolutionOutcome { records, stages };
        }

        stages.push(self.stage_original(&distinct, &mut records).await);

        let failed = unresolved_names(&distinct, &records);
        if !failed.is_empty() {
            stages.push(self.stage_cleaned(&failed, &mut records).await);
        }

        let failed = unresolved_names(&distinct, &records);
        if !failed.is_empty() {
            stages.push(self.stage_genus(&failed, &mut records).await);
        }

        finalize(&distinct, &mut records);
        ResolutionOutcome { records, stages }
    }

    /// Stage 1: every distinct name, in batches, queried verbatim.
    async fn stage_original(
        &self,
        distinct: &IndexSet<String>,
        records: &mut IndexMap<String, ResolutionRecord>,
    ) -> StageReport {
        let names: Vec<String> = distinct.iter().cloned().collect();
        for batch in names.chunks(self.config.batch_size.max(1)) {
            let results = self.submit(batch, "original").await;
            for item in results {
                if let Some(candidate) = item.matches.first() {
                    merge(
                        records,
                        &item.name,
                        ResolutionRecord::from_candidate(
                            candidate,
                            &item.name,
                            MatchLevel::SpeciesOriginal,
                        ),
                    );
                } else if !records.contains_key(&item.name) {
                    records.insert(
                        item.name.clone(),
                        ResolutionRecord::placeholder(&item.name, MatchLevel::NoMatchInitial),
                    );
                }
            }
            sleep(self.pause()).await;
        }
        self.report("original", names.len(), distinct, records)
    }

    /// Stage 2: cleaned forms of still-unresolved names, deduplicated.
    ///
    /// Names whose cleaned form equals the original are not re-queried.
    async fn stage_cleaned(
        &self,
        failed: &[String],
        records: &mut IndexMap<String, ResolutionRecord>,
    ) -> StageReport {
        let mut sources: IndexMap<String, Vec<String>> = IndexMap::new();
        for name in failed {
            if let Some(cleaned) = clean_scientific_name(name) {
                if cleaned != *name {
                    sources.entry(cleaned).or_default().push(name.clone());
                }
            }
        }
        if sources.is_empty() {
            debug!("no names changed by cleaning; skipping cleaned stage");
        }
        let queries: Vec<String> = sources.keys().cloned().collect();
        for batch in queries.chunks(self.config.batch_size.max(1)) {
            let results = self.submit(batch, "cleaned").await;
            for item in results {
                let Some(targets) = sources.get(&item.name) else {
                    continue;
                };
                let Some(candidate) = item.matches.first() else {
                    continue;
                };
                for target in targets {
                    merge(
                        records,
                        target,
                        ResolutionRecord::from_candidate(
                            candidate,
                            &item.name,
                            MatchLevel::SpeciesCleaned,
                        ),
                    );
                }
            }
            sleep(self.pause()).await;
        }
        let distinct: IndexSet<String> = failed.iter().cloned().collect();
        self.report("cleaned", queries.len(), &distinct, records)
    }

    /// Stage 3: genus-only queries, deduplicated, rank-gated.
    async fn stage_genus(
        &self,
        failed: &[String],
        records: &mut IndexMap<String, ResolutionRecord>,
    ) -> StageReport {
        let mut sources: IndexMap<String, Vec<String>> = IndexMap::new();
        for name in failed {
            if let Some(genus) = extract_genus(name) {
                sources.entry(genus).or_default().push(name.clone());
            }
        }
        if sources.is_empty() {
            debug!("no genera extractable from remaining failures");
        }
        let queries: Vec<String> = sources.keys().cloned().collect();
        for batch in queries.chunks(self.config.batch_size.max(1)) {
            let results = self.submit(batch, "genus").await;
            for item in results {
                let Some(targets) = sources.get(&item.name) else {
                    continue;
                };
                for target in targets {
                    let unresolved = records
                        .get(target)
                        .map_or(true, ResolutionRecord::is_unresolved);
                    if !unresolved {
                        continue;
                    }
                    match item.matches.first() {
                        Some(candidate) if genus_rank_accepted(&candidate.taxon.rank) => {
                            merge(
                                records,
                                target,
                                ResolutionRecord::from_candidate(
                                    candidate,
                                    &item.name,
                                    MatchLevel::Genus,
                                ),
                            );
                        }
                        Some(_) => {
                            // Species-level hit on a genus query: a false
                            // positive, left for the final sweep.
                        }
                        None => mark_genus_failed(records, target),
                    }
                }
            }
            sleep(self.pause()).await;
        }
        let distinct: IndexSet<String> = failed.iter().cloned().collect();
        self.report("genus", queries.len(), &distinct, records)
    }

    /// Issues one batch. Every failure mode collapses to zero candidates
    /// for each submitted name.
    async fn submit(&self, batch: &[String], stage: &str) -> Vec<NameResult> {
        if batch.is_empty() {
            return Vec::new();
        }
        info!(stage, names = batch.len(), "querying match service");
        match self.service.resolve_batch(batch).await {
            Ok(response) => response.results,
            Err(err) => {
                warn!(stage, error = %err, "match service call failed; batch treated as unmatched");
                batch
                    .iter()
                    .map(|name| NameResult {
                        name: name.clone(),
                        matches: Vec::new(),
                    })
                    .collect()
            }
        }
    }

    fn report(
        &self,
        stage: &'static str,
        queried: usize,
        scope: &IndexSet<String>,
        records: &IndexMap<String, ResolutionRecord>,
    ) -> StageReport {
        let remaining = unresolved_names(scope, records).len();
        let report = StageReport {
            stage,
            queried,
            matched: scope.len() - remaining,
            remaining,
        };
        info!(
            stage = report.stage,
            queried = report.queried,
            matched = report.matched,
            remaining = report.remaining,
            "stage complete"
        );
        report
    }

    const fn pause(&self) -> Duration {
        self.config.pause()
    }
}

/// Writes a record only when the name has none yet or the existing record
/// lacks an identifier. First successful stage wins.
fn merge(records: &mut IndexMap<String, ResolutionRecord>, name: &str, record: ResolutionRecord) {
    match records.get_mut(name) {
        Some(existing) if existing.is_unresolved() => *existing = record,
        Some(_) => {}
        None => {
            records.insert(name.to_string(), record);
        }
    }
}

fn mark_genus_failed(records: &mut IndexMap<String, ResolutionRecord>, name: &str) {
    match records.get_mut(name) {
        Some(record) => record.match_level = MatchLevel::NoMatchFinalGenusFailed,
        None => {
            records.insert(
                name.to_string(),
                ResolutionRecord::placeholder(name, MatchLevel::NoMatchFinalGenusFailed),
            );
        }
    }
}

fn unresolved_names(
    scope: &IndexSet<String>,
    records: &IndexMap<String, ResolutionRecord>,
) -> Vec<String> {
    scope
        .iter()
        .filter(|name| {
            records
                .get(*name)
                .map_or(true, ResolutionRecord::is_unresolved)
        })
        .cloned()
        .collect()
}

/// Settles terminal levels: still-unresolved names become `No Match Final`
/// unless the genus stage already stamped them, and names missing from the
/// map entirely are flagged as processing errors.
fn finalize(distinct: &IndexSet<String>, records: &mut IndexMap<String, ResolutionRecord>) {
    for name in distinct {
        match records.get_mut(name) {
            Some(record) if record.is_unresolved() => {
                if !matches!(
                    record.match_level,
                    MatchLevel::NoMatchFinalGenusFailed | MatchLevel::Genus
                ) {
                    record.match_level = MatchLevel::NoMatchFinal;
                }
            }
            Some(_) => {}
            None => {
                records.insert(
                    name.clone(),
                    ResolutionRecord::placeholder(name, MatchLevel::ProcessingError),
                );
            }
        }
    }
}

fn genus_rank_accepted(rank: &Option<String>) -> bool {
    rank.as_deref()
        .map(str::to_lowercase)
        .is_some_and(|rank| GENUS_ACCEPT_RANKS.contains(&rank.as_str()))
}
