//! Discovery to job plan.
//!
//! ```text
//! discover ──► group ──► scan outputs ──► diff ──► restrict ──► JobPlan
//! ```
//!
//! Everything here is a read of the filesystem; nothing is converted.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::codec::CreateOptions;
use crate::error::DiscoveryError;
use crate::plan::{
    canonical_id, canonical_ids, restrict_to_pending, DiffResult, ExistingOutputs, JobPlan,
};
use crate::tile::{RowGroups, TargetPathResolver, TileDiscoverer, TileIdParser};

/// Inputs of a planning pass.
pub struct Planner<'a> {
    pub discoverer: &'a dyn TileDiscoverer,
    pub parser: &'a TileIdParser,
    pub resolver: &'a dyn TargetPathResolver,
    pub options: CreateOptions,
}

/// Whether and how existing outputs are taken into account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResumeMode {
    /// Skip tiles whose output already exists
    pub enabled: bool,

    /// Only count outputs that validate as COGs
    pub verify: bool,
}

/// Everything a planning pass found out.
#[derive(Debug, Clone, Default)]
pub struct PlanReport {
    /// Row groups of all discovered tiles
    pub groups: RowGroups,

    /// Outputs already present (empty when resume is off)
    pub existing: ExistingOutputs,

    /// Input/output comparison (all pending when resume is off)
    pub diff: DiffResult,

    /// Jobs to dispatch
    pub plan: JobPlan,
}

impl<'a> Planner<'a> {
    /// Discover and group tiles under `input_root`.
    pub fn group(&self, input_root: &Path) -> Result<RowGroups, DiscoveryError> {
        let discovered = self.discoverer.discover(input_root)?;
        let groups = RowGroups::build(&discovered, self.parser);
        info!(
            rows = groups.row_count(),
            tiles = groups.tile_count(),
            malformed = groups.malformed().len(),
            skipped = groups.out_of_row().len(),
            "Discovered tiles"
        );
        Ok(groups)
    }

    /// Build the job plan for converting `input_root` into `output_root`.
    pub fn plan(
        &self,
        input_root: &Path,
        output_root: &Path,
        resume: ResumeMode,
    ) -> Result<PlanReport, DiscoveryError> {
        let groups = self.group(input_root)?;
        let suffix = self.resolver.suffix();

        let inputs = canonical_ids(
            groups.iter().flat_map(|(_, tiles)| tiles),
            suffix,
            self.parser,
        );

        let existing = if resume.enabled {
            ExistingOutputs::scan(output_root, suffix, self.resolver.extension(), resume.verify)?
        } else {
            ExistingOutputs::default()
        };
        let outputs = existing.ids(suffix, self.parser);
        let diff = DiffResult::compute(&inputs, &outputs);

        let pending = if resume.enabled {
            restrict_to_pending(&groups, &diff.pending, suffix, self.parser)
        } else {
            groups.clone()
        };
        let plan = JobPlan::build(
            &pending,
            output_root,
            self.resolver,
            self.parser,
            &self.options,
        );

        info!(
            existing = existing.paths.len(),
            pending = plan.job_count(),
            rows = plan.row_count(),
            "Planned conversion"
        );
        Ok(PlanReport {
            groups,
            existing,
            diff,
            plan,
        })
    }

    /// Outputs under `output_root` whose source tile is not under
    /// `input_root`, sorted.
    pub fn orphans(
        &self,
        input_root: &Path,
        output_root: &Path,
    ) -> Result<Vec<PathBuf>, DiscoveryError> {
        let groups = self.group(input_root)?;
        let suffix = self.resolver.suffix();
        let inputs: BTreeSet<String> = canonical_ids(
            groups.iter().flat_map(|(_, tiles)| tiles),
            suffix,
            self.parser,
        );

        let existing =
            ExistingOutputs::scan(output_root, suffix, self.resolver.extension(), false)?;
        let outputs = existing.ids(suffix, self.parser);
        let orphaned = DiffResult::compute(&inputs, &outputs).orphaned;

        let mut paths: Vec<PathBuf> = existing
            .paths
            .into_iter()
            .filter(|path| orphaned.contains(&canonical_id(path, suffix, self.parser)))
            .collect();
        paths.sort();
        debug!(orphans = paths.len(), "Compared outputs against inputs");
        Ok(paths)
    }
}

/// Validate every output under `output_root`.
pub fn verify_outputs(
    output_root: &Path,
    resolver: &dyn TargetPathResolver,
    min_overviews: usize,
) -> Result<ExistingOutputs, DiscoveryError> {
    ExistingOutputs::scan_with(
        output_root,
        resolver.suffix(),
        resolver.extension(),
        Some(min_overviews),
    )
}
