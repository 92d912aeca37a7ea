//! Size and request budget enforcement
//!
//! Runs after materialization. Undersized extractions are folded back into
//! the pages using them; pages loading too many chunks inline their least
//! valuable extractions, and whatever inlining leaves below threshold is
//! folded back too. Required code is never dropped, at worst it is
//! duplicated or the budget is exceeded with a warning.

use tracing::{debug, warn};

use super::chunk::{ChunkGraph, ChunkIdx};
use super::{BudgetCause, EntryIdx, SplitContext, SplitOptions, SplitWarning};

pub struct SizeThresholdSplitter<'a> {
    ctx: &'a SplitContext<'a>,
    options: &'a SplitOptions,
}

impl<'a> SizeThresholdSplitter<'a> {
    pub fn new(ctx: &'a SplitContext<'a>, options: &'a SplitOptions) -> Self {
        Self { ctx, options }
    }

    pub fn apply(&self, chunks: &mut ChunkGraph) -> Vec<SplitWarning> {
        self.dissolve_undersized(chunks);
        let causes = self.enforce_request_budgets(chunks);
        // inlining drops pages and members from shared chunks
        self.dissolve_undersized(chunks);
        self.budget_warnings(chunks, &causes)
    }

    /// Fold back every non-enforced extraction below its `min_size` or
    /// required by fewer than `min_chunks` pages
    fn dissolve_undersized(&self, chunks: &mut ChunkGraph) {
        let graph = self.ctx.graph;
        let undersized: Vec<ChunkIdx> = chunks
            .chunks()
            .filter(|(_, chunk)| !chunk.is_entry() && !chunk.enforce && !chunk.is_empty())
            .filter(|(_, chunk)| {
                chunk.size(graph) < chunk.policy.min_size
                    || chunk.required_by.len() < chunk.policy.min_chunks
            })
            .map(|(idx, _)| idx)
            .collect();

        for idx in undersized {
            debug!(
                "Dissolving chunk {} ({} bytes, {} modules)",
                idx,
                chunks.chunk(idx).size(graph),
                chunks.chunk(idx).len()
            );
            chunks.dissolve(idx, &self.ctx.references);
        }
    }

    /// Trim each entry's extracted chunks down to its request budget.
    ///
    /// Returns, per entry, why trimming stopped short of the budget.
    fn enforce_request_budgets(&self, chunks: &mut ChunkGraph) -> Vec<Option<BudgetCause>> {
        let graph = self.ctx.graph;
        let references = &self.ctx.references;
        let mut duplicated = 0u64;
        let mut causes = vec![None; self.ctx.entries.len()];

        for (e, entry) in self.ctx.entries.iter().enumerate() {
            let budget = self.budget_for(chunks, e);
            if chunks.requests(e) <= budget {
                continue;
            }

            let required: Vec<ChunkIdx> = chunks
                .chunk(chunks.entry_chunk(e))
                .dependencies
                .iter()
                .copied()
                .collect();
            let (enforced, candidates): (Vec<ChunkIdx>, Vec<ChunkIdx>) =
                required.into_iter().partition(|&c| chunks.chunk(c).enforce);

            let mut ranked: Vec<(ChunkIdx, u64)> = candidates
                .into_iter()
                .map(|c| {
                    let chunk = chunks.chunk(c);
                    let sharers = chunk.required_by.len().saturating_sub(1) as u64;
                    (c, chunk.size(graph) * sharers)
                })
                .collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

            let keep = budget.saturating_sub(1 + enforced.len());
            let mut cause = (budget < 1 + enforced.len()).then_some(BudgetCause::Enforced);

            for &(chunk, _) in ranked.iter().skip(keep) {
                let cost = chunks.inline_cost(e, chunk, references, graph);
                if let Some(limit) = self.options.max_duplicate_size {
                    if duplicated + cost > limit {
                        debug!(
                            "Keeping chunk {} shared for '{}': {} more bytes would pass the duplication limit",
                            chunk, entry.name, cost
                        );
                        cause.get_or_insert(BudgetCause::DuplicationLimit);
                        continue;
                    }
                }
                debug!("Inlining chunk {} into '{}' ({} bytes duplicated)", chunk, entry.name, cost);
                duplicated += cost;
                chunks.inline(e, chunk, references);
            }

            causes[e] = cause;
        }

        causes
    }

    /// Warn for every entry still loading more chunks than its budget
    fn budget_warnings(&self, chunks: &ChunkGraph, causes: &[Option<BudgetCause>]) -> Vec<SplitWarning> {
        let mut warnings = Vec::new();
        for (e, entry) in self.ctx.entries.iter().enumerate() {
            let budget = self.budget_for(chunks, e);
            let requests = chunks.requests(e);
            if requests <= budget {
                continue;
            }

            let warning = SplitWarning::BudgetExceeded {
                entry: entry.name.clone(),
                requests,
                budget,
                cause: causes[e].unwrap_or(BudgetCause::Enforced),
            };
            warn!("{}", warning);
            warnings.push(warning);
        }
        warnings
    }

    /// Tightest request budget among the defaults and the non-enforced
    /// chunks the entry loads
    fn budget_for(&self, chunks: &ChunkGraph, entry: EntryIdx) -> usize {
        let loading = self.ctx.entries[entry].loading;
        chunks
            .chunk(chunks.entry_chunk(entry))
            .dependencies
            .iter()
            .map(|&c| chunks.chunk(c))
            .filter(|chunk| !chunk.enforce)
            .map(|chunk| chunk.policy.max_requests(loading))
            .fold(self.options.defaults.max_requests(loading), usize::min)
            .max(1)
    }
}
