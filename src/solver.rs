use tracing::{debug, info, warn};

use crate::error::PlannerError;
use crate::guillotine::{GuillotineBin, ScoredPlacement, better_score};
use crate::types::{
    CuttingParameters, CuttingPlan, DemandPart, Rect, RejectReason, RejectedPart, Solution,
};

/// Upper bound on the pieces of one run, all quantities added up.
pub const MAX_PIECES: u64 = 100_000;

/// One unit of a demand line, ready to be packed.
#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    part: &'a DemandPart,
    cut: Rect,
    allow_rotate: bool,
}

/// Candidates sharing a raw material: same thickness and color.
#[derive(Debug)]
struct Group<'a> {
    thickness: f64,
    color: &'a str,
    candidates: Vec<Candidate<'a>>,
}

/// Guillotine best-fit-decreasing planner.
pub struct Solver {
    params: CuttingParameters,
}

/// Packs `parts` onto as few stock panels as the heuristic finds.
pub fn optimize(
    parts: &[DemandPart],
    params: &CuttingParameters,
) -> Result<Solution, PlannerError> {
    Solver::new(params.clone())?.solve(parts)
}

impl Solver {
    pub fn new(params: CuttingParameters) -> Result<Self, PlannerError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn solve(&self, parts: &[DemandPart]) -> Result<Solution, PlannerError> {
        let pieces: u64 = parts.iter().map(|p| p.quantity as u64).sum();
        if pieces > MAX_PIECES {
            return Err(PlannerError::TooManyPieces {
                count: pieces,
                limit: MAX_PIECES,
            });
        }

        let (groups, mut rejected) = self.expand_demands(parts);

        let mut plans = Vec::new();
        for group in groups {
            let (group_plans, leftovers) = self.pack_group(group);
            plans.extend(group_plans);
            rejected.extend(leftovers.into_iter().map(|c| RejectedPart {
                part: DemandPart {
                    quantity: 1,
                    ..c.part.clone()
                },
                reason: RejectReason::OutOfGauge,
            }));
        }

        let solution = Solution {
            plans,
            rejected,
            stock: self.params.stock(),
        };
        info!(
            panels = solution.plan_count(),
            placed = solution.placed_units(),
            rejected = solution.rejected_units(),
            waste_percent = solution.total_waste_percent(),
            "cutting plan computed"
        );
        Ok(solution)
    }

    /// Rotation is forbidden only for grained parts under grain enforcement.
    fn allows_rotation(&self, part: &DemandPart) -> bool {
        !part.grain || !self.params.grain_enforced
    }

    fn fits_stock(&self, cut: Rect, allow_rotate: bool) -> bool {
        let usable = self.params.usable();
        cut.fits_in(&usable) || (allow_rotate && cut.rotated().fits_in(&usable))
    }

    /// Splits demand lines into unit candidates grouped by material, sorted by
    /// decreasing area. Lines that can never be cut are returned as rejected.
    fn expand_demands<'a>(&self, parts: &'a [DemandPart]) -> (Vec<Group<'a>>, Vec<RejectedPart>) {
        let mut groups: Vec<Group<'a>> = Vec::new();
        let mut rejected = Vec::new();

        for part in parts {
            if part.quantity == 0 {
                debug!(reference = %part.reference, "skipping zero-quantity line");
                continue;
            }
            if part.is_degenerate() {
                warn!(
                    reference = %part.reference,
                    length = part.length,
                    width = part.width,
                    thickness = part.thickness,
                    "degenerate part dimensions"
                );
                rejected.push(RejectedPart {
                    part: part.clone(),
                    reason: RejectReason::Degenerate,
                });
                continue;
            }

            let cut = self.params.cut_size(part.length, part.width);
            let allow_rotate = self.allows_rotation(part);
            if !self.fits_stock(cut, allow_rotate) {
                warn!(
                    reference = %part.reference,
                    cut = %cut,
                    usable = %self.params.usable(),
                    "part out of gauge"
                );
                rejected.push(RejectedPart {
                    part: part.clone(),
                    reason: RejectReason::OutOfGauge,
                });
                continue;
            }

            let idx = match groups
                .iter()
                .position(|g| g.thickness == part.thickness && g.color == part.color)
            {
                Some(idx) => idx,
                None => {
                    groups.push(Group {
                        thickness: part.thickness,
                        color: &part.color,
                        candidates: Vec::new(),
                    });
                    groups.len() - 1
                }
            };
            let candidate = Candidate {
                part,
                cut,
                allow_rotate,
            };
            groups[idx]
                .candidates
                .extend(std::iter::repeat_n(candidate, part.quantity as usize));
        }

        for group in &mut groups {
            group.candidates.sort_by(|a, b| {
                b.cut
                    .area()
                    .total_cmp(&a.cut.area())
                    .then_with(|| b.cut.long_side().total_cmp(&a.cut.long_side()))
                    .then_with(|| b.cut.short_side().total_cmp(&a.cut.short_side()))
            });
        }

        (groups, rejected)
    }

    /// Best-fit across every open panel of the group; a new panel is opened
    /// only when no free rectangle accepts the piece.
    fn pack_group<'a>(&self, group: Group<'a>) -> (Vec<CuttingPlan>, Vec<Candidate<'a>>) {
        let strategy = self.params.fit_strategy;
        let mut bins: Vec<GuillotineBin> = Vec::new();
        let mut leftovers = Vec::new();

        debug!(
            thickness = group.thickness,
            color = group.color,
            pieces = group.candidates.len(),
            "packing group"
        );

        for candidate in group.candidates {
            let mut best: Option<(usize, ScoredPlacement)> = None;
            for (bi, bin) in bins.iter().enumerate() {
                if let Some(scored) = bin.find_best(candidate.cut, candidate.allow_rotate, strategy)
                    && best.is_none_or(|(_, b)| better_score(scored.score, b.score))
                {
                    best = Some((bi, scored));
                }
            }

            if let Some((bi, scored)) = best {
                bins[bi].place(
                    scored,
                    candidate.cut,
                    &candidate.part.name,
                    &candidate.part.reference,
                );
                continue;
            }

            // Open new panel
            let mut bin = GuillotineBin::new(&self.params);
            match bin.find_best(candidate.cut, candidate.allow_rotate, strategy) {
                Some(scored) => {
                    bin.place(
                        scored,
                        candidate.cut,
                        &candidate.part.name,
                        &candidate.part.reference,
                    );
                    bins.push(bin);
                    debug!(
                        color = group.color,
                        thickness = group.thickness,
                        panel = bins.len(),
                        "opened panel"
                    );
                }
                None => {
                    warn!(
                        reference = %candidate.part.reference,
                        cut = %candidate.cut,
                        "piece does not fit a fresh panel"
                    );
                    leftovers.push(candidate);
                }
            }
        }

        let stock = self.params.stock();
        let plans = bins
            .into_iter()
            .map(|bin| bin.into_plan(group.thickness, group.color, stock))
            .collect();
        (plans, leftovers)
    }
}
