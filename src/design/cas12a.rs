//! Cas12a arrays: two guides expressed from one transcript, separated by the
//! Cas12a direct repeat.

use std::slice;

use log::{info, warn};
use rand::Rng;

use crate::design::CALIBRATION_REUSE_MARGIN;
use crate::enumerate::{cartesian, positional};
use crate::errors::Result;
use crate::gene_pairs::GenePair;
use crate::guide::{validate_sequence, GuideLibrary, GuideRecord};
use crate::output::OutputHeader;
use crate::pool::{ControlPoolAllocator, PoolId};
use crate::processor::{ControlPairing, Expansion, LibraryDesign};

/// AsCas12a direct repeat placed between the two spacers.
pub const ASCAS12A_DIRECT_REPEAT: &str = "TAATTTCTACTATCGTAGAT";

pub const CAS12A_HEADER: OutputHeader = OutputHeader {
    combination: "sgRNA combinations",
    genes: "Gene combinations",
};

#[derive(Debug, Clone)]
pub struct Cas12aConfig {
    /// No-site and intergenic controls each guide of a gene is paired with
    pub controls_per_gene: usize,
    /// Controls drawn from each pool for the control-by-control pass
    pub control_pairs: usize,
    pub direct_repeat: String,
}

impl Default for Cas12aConfig {
    fn default() -> Self {
        Self {
            controls_per_gene: 5,
            control_pairs: 100,
            direct_repeat: ASCAS12A_DIRECT_REPEAT.to_string(),
        }
    }
}

pub struct Cas12aDesign<R: Rng> {
    guides: GuideLibrary,
    allocator: ControlPoolAllocator<R>,
    no_site: PoolId,
    intergenic: PoolId,
    config: Cas12aConfig,
}

impl<R: Rng> Cas12aDesign<R> {
    pub fn new(
        guides: GuideLibrary,
        no_site: Vec<GuideRecord>,
        intergenic: Vec<GuideRecord>,
        config: Cas12aConfig,
        rng: R,
    ) -> Result<Self> {
        validate_sequence(&config.direct_repeat, "direct repeat")?;
        if guides.is_empty() {
            warn!("No Cas12a guides loaded; only control pairs will be written");
        }
        info!(
            "Cas12a design: {} guides over {} genes, {} no-site and {} intergenic controls",
            guides.len(),
            guides.gene_count(),
            no_site.len(),
            intergenic.len()
        );

        let mut allocator = ControlPoolAllocator::new(rng);
        let no_site = allocator.register("no-site", no_site);
        let intergenic = allocator.register("intergenic", intergenic);
        Ok(Self {
            guides,
            allocator,
            no_site,
            intergenic,
            config,
        })
    }

    /// Pair every guide of `gene` with a fresh draw of no-site and intergenic
    /// controls, once per run.
    fn expand_controls(&mut self, gene: &str, ctx: &mut Expansion<'_>) -> Result<()> {
        let key = ControlPairing::control_second(gene);
        if ctx.is_seen(&key) {
            return Ok(());
        }

        let guides = ctx.guides(&self.guides, gene, "Cas12a");
        if !guides.is_empty() {
            let n = self.config.controls_per_gene;
            let no_site = self.allocator.sample(self.no_site, n)?;
            let intergenic = self.allocator.sample(self.intergenic, n)?;

            for guide in guides {
                ctx.emit(cartesian(slice::from_ref(guide), &no_site))?;
                ctx.emit(cartesian(slice::from_ref(guide), &intergenic))?;
            }
        }

        ctx.mark_seen(key);
        Ok(())
    }

    /// Split one draw in half and pair the halves positionally.
    fn calibrate_pool(&mut self, pool: PoolId, ctx: &mut Expansion<'_>) -> Result<()> {
        let n = self.config.control_pairs;
        let drawn = self.allocator.sample_reserving(pool, n, CALIBRATION_REUSE_MARGIN)?;
        let (first, second) = drawn.split_at(n / 2);
        ctx.emit(positional(first, second))?;
        Ok(())
    }
}

impl<R: Rng> LibraryDesign for Cas12aDesign<R> {
    fn header(&self) -> OutputHeader {
        CAS12A_HEADER
    }

    fn joiner(&self) -> Option<&str> {
        Some(&self.config.direct_repeat)
    }

    fn expand_gene_pair(&mut self, pair: &GenePair, ctx: &mut Expansion<'_>) -> Result<()> {
        let first = ctx.guides(&self.guides, &pair.first, "Cas12a");
        let second = ctx.guides(&self.guides, &pair.second, "Cas12a");
        ctx.emit(cartesian(first, second))?;

        self.expand_controls(&pair.first, ctx)?;
        self.expand_controls(&pair.second, ctx)?;
        Ok(())
    }

    fn expand_essential(&mut self, gene: &str, ctx: &mut Expansion<'_>) -> Result<()> {
        self.expand_controls(gene, ctx)
    }

    fn calibrate(&mut self, ctx: &mut Expansion<'_>) -> Result<()> {
        self.calibrate_pool(self.no_site, ctx)?;
        self.calibrate_pool(self.intergenic, ctx)?;
        Ok(())
    }
}
