//! Dual-nuclease constructs: an SpCas9 guide in the first position and an
//! SaCas9 guide in the second, joined directly.

use log::{info, warn};
use rand::Rng;

use crate::design::CALIBRATION_REUSE_MARGIN;
use crate::enumerate::{blockwise, cartesian, positional};
use crate::errors::Result;
use crate::gene_pairs::GenePair;
use crate::guide::{GuideLibrary, GuideRecord};
use crate::output::OutputHeader;
use crate::pool::{ControlPoolAllocator, PoolId};
use crate::processor::{ControlPairing, Expansion, LibraryDesign};

pub const DUAL_HEADER: OutputHeader = OutputHeader {
    combination: "sgRNA Combination",
    genes: "Gene pair",
};

#[derive(Debug, Clone)]
pub struct DualConfig {
    /// Controls paired with each guide in the guide x control expansion
    pub controls_per_guide: usize,
    /// Controls drawn per nuclease for the control-by-control pass
    pub control_pairs: usize,
}

impl Default for DualConfig {
    fn default() -> Self {
        Self {
            controls_per_guide: 1,
            control_pairs: 100,
        }
    }
}

pub struct DualNucleaseDesign<R: Rng> {
    sp_guides: GuideLibrary,
    sa_guides: GuideLibrary,
    allocator: ControlPoolAllocator<R>,
    sp_controls: PoolId,
    sa_controls: PoolId,
    config: DualConfig,
}

impl<R: Rng> DualNucleaseDesign<R> {
    pub fn new(
        sp_guides: GuideLibrary,
        sa_guides: GuideLibrary,
        sp_controls: Vec<GuideRecord>,
        sa_controls: Vec<GuideRecord>,
        config: DualConfig,
        rng: R,
    ) -> Self {
        info!(
            "Dual design: {} SpCas9 and {} SaCas9 guides, {} and {} controls",
            sp_guides.len(),
            sa_guides.len(),
            sp_controls.len(),
            sa_controls.len()
        );

        if sp_guides.is_empty() || sa_guides.is_empty() {
            warn!("A guide table is empty; only control pairs will be written for its genes");
        }

        let mut allocator = ControlPoolAllocator::new(rng);
        let sp_controls = allocator.register("SpCas9 controls", sp_controls);
        let sa_controls = allocator.register("SaCas9 controls", sa_controls);
        Self {
            sp_guides,
            sa_guides,
            allocator,
            sp_controls,
            sa_controls,
            config,
        }
    }

    /// `first` in SpCas9 against `second` in SaCas9, plus the control pairs
    /// for both sides that have not been generated yet.
    fn expand_orientation(
        &mut self,
        first: &str,
        second: &str,
        ctx: &mut Expansion<'_>,
    ) -> Result<()> {
        let sp = ctx.guides(&self.sp_guides, first, "SpCas9");
        let sa = ctx.guides(&self.sa_guides, second, "SaCas9");
        ctx.emit(cartesian(sp, sa))?;

        self.controls_before(second, ctx)?;
        self.controls_after(first, ctx)?;
        Ok(())
    }

    /// SpCas9 controls in front of the SaCas9 guides of `gene`.
    fn controls_before(&mut self, gene: &str, ctx: &mut Expansion<'_>) -> Result<()> {
        let key = ControlPairing::control_first(gene);
        if ctx.is_seen(&key) {
            return Ok(());
        }
        let guides = ctx.guides(&self.sa_guides, gene, "SaCas9");
        let k = self.config.controls_per_guide;
        let controls = self.allocator.sample(self.sp_controls, guides.len() * k)?;
        ctx.emit(blockwise(guides, &controls, k, false))?;
        ctx.mark_seen(key);
        Ok(())
    }

    /// SpCas9 guides of `gene` in front of SaCas9 controls.
    fn controls_after(&mut self, gene: &str, ctx: &mut Expansion<'_>) -> Result<()> {
        let key = ControlPairing::control_second(gene);
        if ctx.is_seen(&key) {
            return Ok(());
        }
        let guides = ctx.guides(&self.sp_guides, gene, "SpCas9");
        let k = self.config.controls_per_guide;
        let controls = self.allocator.sample(self.sa_controls, guides.len() * k)?;
        ctx.emit(blockwise(guides, &controls, k, true))?;
        ctx.mark_seen(key);
        Ok(())
    }
}

impl<R: Rng> LibraryDesign for DualNucleaseDesign<R> {
    fn header(&self) -> OutputHeader {
        DUAL_HEADER
    }

    fn expand_gene_pair(&mut self, pair: &GenePair, ctx: &mut Expansion<'_>) -> Result<()> {
        self.expand_orientation(&pair.first, &pair.second, ctx)?;
        // The swapped orientation of a self pair is the same set of constructs
        if !pair.is_self_pair() {
            self.expand_orientation(&pair.second, &pair.first, ctx)?;
        }
        Ok(())
    }

    fn expand_essential(&mut self, gene: &str, ctx: &mut Expansion<'_>) -> Result<()> {
        self.controls_after(gene, ctx)?;
        self.controls_before(gene, ctx)?;
        Ok(())
    }

    fn calibrate(&mut self, ctx: &mut Expansion<'_>) -> Result<()> {
        let n = self.config.control_pairs;
        let sp = self
            .allocator
            .sample_reserving(self.sp_controls, n, CALIBRATION_REUSE_MARGIN)?;
        let sa = self
            .allocator
            .sample_reserving(self.sa_controls, n, CALIBRATION_REUSE_MARGIN)?;
        ctx.emit(positional(&sp, &sa))?;
        Ok(())
    }
}
