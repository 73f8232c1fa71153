use crate::types::{CuttingParameters, CuttingPlan, EPSILON, FitStrategy, Placement, Rect};

/// Free region of a panel, panel-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeRect {
    pub x: f64,
    pub y: f64,
    pub rect: Rect,
}

/// One open stock panel. The free rectangles never overlap each other nor any
/// placement widened by the kerf on its far edges.
#[derive(Debug, Clone)]
pub struct GuillotineBin {
    kerf: f64,
    min_offcut: f64,
    pub free_rects: Vec<FreeRect>,
    pub placements: Vec<Placement>,
}

#[derive(Debug, Clone, Copy)]
pub struct ScoredPlacement {
    pub free_idx: usize,
    pub rotated: bool,
    pub score: (f64, f64),
}

/// Strict lexicographic comparison with tolerance, so equal scores keep the
/// earlier candidate.
pub fn better_score(a: (f64, f64), b: (f64, f64)) -> bool {
    if a.0 < b.0 - EPSILON {
        return true;
    }
    if a.0 > b.0 + EPSILON {
        return false;
    }
    a.1 < b.1 - EPSILON
}

impl GuillotineBin {
    /// A fresh panel whose only free area starts after the squaring strip.
    pub fn new(params: &CuttingParameters) -> Self {
        Self {
            kerf: params.kerf,
            min_offcut: params.min_offcut,
            free_rects: vec![FreeRect {
                x: params.squaring_cut,
                y: 0.0,
                rect: params.usable(),
            }],
            placements: Vec::new(),
        }
    }

    pub fn find_best(
        &self,
        piece: Rect,
        allow_rotate: bool,
        strategy: FitStrategy,
    ) -> Option<ScoredPlacement> {
        let mut best: Option<ScoredPlacement> = None;
        let try_rotate = allow_rotate && (piece.length - piece.width).abs() > EPSILON;

        for (idx, free) in self.free_rects.iter().enumerate() {
            let orientations: &[bool] = if try_rotate { &[false, true] } else { &[false] };
            for &rotated in orientations {
                let placed = if rotated { piece.rotated() } else { piece };
                if !placed.fits_in(&free.rect) {
                    continue;
                }
                let score = Self::score(placed, free.rect, strategy);
                if best.is_none_or(|b| better_score(score, b.score)) {
                    best = Some(ScoredPlacement {
                        free_idx: idx,
                        rotated,
                        score,
                    });
                }
            }
        }

        best
    }

    fn score(piece: Rect, free: Rect, strategy: FitStrategy) -> (f64, f64) {
        let slack_l = (free.length - piece.length).max(0.0);
        let slack_w = (free.width - piece.width).max(0.0);
        let short = slack_l.min(slack_w);
        let long = slack_l.max(slack_w);
        match strategy {
            FitStrategy::BestShortSideFit => (short, 0.0),
            FitStrategy::BestLongSideFit => (long, short),
            FitStrategy::BestAreaFit => ((free.area() - piece.area()).max(0.0), short),
        }
    }

    /// Places `piece` (gross size, requested orientation) where `scored` says.
    pub fn place(
        &mut self,
        scored: ScoredPlacement,
        piece: Rect,
        name: &str,
        reference: &str,
    ) -> &Placement {
        let free = self.free_rects[scored.free_idx];
        let placed = if scored.rotated {
            piece.rotated()
        } else {
            piece
        };

        self.free_rects.swap_remove(scored.free_idx);
        self.split(free, placed);
        self.placements.push(Placement {
            name: name.to_string(),
            reference: reference.to_string(),
            x: free.x,
            y: free.y,
            cut: piece,
            rotated: scored.rotated,
        });

        &self.placements[self.placements.len() - 1]
    }

    /// Guillotine split of `free` around a piece sitting in its corner. Both
    /// candidate cut orders are built and the one leaving the largest single
    /// offcut wins; horizontal-first on ties.
    fn split(&mut self, free: FreeRect, placed: Rect) {
        let right_l = free.rect.length - placed.length - self.kerf;
        let top_w = free.rect.width - placed.width - self.kerf;
        let right_x = free.x + placed.length + self.kerf;
        let top_y = free.y + placed.width + self.kerf;

        // Horizontal first: right strip as tall as the piece, top strip full length.
        let horizontal = [
            FreeRect {
                x: right_x,
                y: free.y,
                rect: Rect::new(right_l, placed.width),
            },
            FreeRect {
                x: free.x,
                y: top_y,
                rect: Rect::new(free.rect.length, top_w),
            },
        ];
        // Vertical first: right strip full height, top strip as long as the piece.
        let vertical = [
            FreeRect {
                x: right_x,
                y: free.y,
                rect: Rect::new(right_l, free.rect.width),
            },
            FreeRect {
                x: free.x,
                y: top_y,
                rect: Rect::new(placed.length, top_w),
            },
        ];

        let largest = |option: &[FreeRect; 2]| {
            option
                .iter()
                .filter(|f| self.is_usable(f))
                .map(|f| f.rect.area())
                .fold(0.0, f64::max)
        };
        let chosen = if largest(&horizontal) >= largest(&vertical) - EPSILON {
            horizontal
        } else {
            vertical
        };

        for f in chosen {
            if self.is_usable(&f) {
                self.free_rects.push(f);
            }
        }
    }

    fn is_usable(&self, free: &FreeRect) -> bool {
        let min = self.min_offcut.max(EPSILON);
        free.rect.length > min && free.rect.width > min
    }

    pub fn into_plan(self, thickness: f64, color: &str, stock: Rect) -> CuttingPlan {
        CuttingPlan {
            thickness,
            color: color.to_string(),
            stock,
            placements: self.placements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(length: f64, width: f64, kerf: f64) -> CuttingParameters {
        CuttingParameters {
            stock_length: length,
            stock_width: width,
            kerf,
            edge_allowance: 0.0,
            squaring_cut: 0.0,
            grain_enforced: true,
            min_offcut: 0.0,
            fit_strategy: FitStrategy::BestShortSideFit,
        }
    }

    fn place_best(bin: &mut GuillotineBin, piece: Rect, allow_rotate: bool) -> Placement {
        let scored = bin
            .find_best(piece, allow_rotate, FitStrategy::BestShortSideFit)
            .unwrap();
        bin.place(scored, piece, "piece", "P").clone()
    }

    #[test]
    fn test_place_single_piece() {
        let mut bin = GuillotineBin::new(&params(100.0, 100.0, 0.0));
        let p = place_best(&mut bin, Rect::new(50.0, 30.0), false);
        assert_eq!(p.x, 0.0);
        assert_eq!(p.y, 0.0);
        assert_eq!(p.cut, Rect::new(50.0, 30.0));
        assert!(!p.rotated);
        assert!(!bin.free_rects.is_empty());
    }

    #[test]
    fn test_piece_too_large() {
        let bin = GuillotineBin::new(&params(100.0, 100.0, 0.0));
        let piece = Rect::new(200.0, 50.0);
        assert!(
            bin.find_best(piece, false, FitStrategy::BestShortSideFit)
                .is_none()
        );
    }

    #[test]
    fn test_rotation_fit() {
        let bin = GuillotineBin::new(&params(100.0, 50.0, 0.0));
        let piece = Rect::new(50.0, 100.0);
        // Doesn't fit without rotation
        assert!(
            bin.find_best(piece, false, FitStrategy::BestShortSideFit)
                .is_none()
        );
        // Fits with rotation
        let scored = bin
            .find_best(piece, true, FitStrategy::BestShortSideFit)
            .unwrap();
        assert!(scored.rotated);
    }

    #[test]
    fn test_square_piece_never_reported_rotated() {
        let bin = GuillotineBin::new(&params(100.0, 100.0, 0.0));
        let scored = bin
            .find_best(Rect::new(40.0, 40.0), true, FitStrategy::BestShortSideFit)
            .unwrap();
        assert!(!scored.rotated);
    }

    #[test]
    fn test_prefers_unrotated_on_equal_score() {
        // 60x40 in 100x100 scores the same both ways.
        let bin = GuillotineBin::new(&params(100.0, 100.0, 0.0));
        let scored = bin
            .find_best(Rect::new(60.0, 40.0), true, FitStrategy::BestShortSideFit)
            .unwrap();
        assert!(!scored.rotated);
    }

    #[test]
    fn test_kerf() {
        let mut bin = GuillotineBin::new(&params(100.0, 100.0, 5.0));
        place_best(&mut bin, Rect::new(50.0, 100.0), false);
        // Remaining length should be 100 - 50 - 5 = 45
        assert_eq!(bin.free_rects.len(), 1);
        assert_eq!(bin.free_rects[0].x, 55.0);
        assert_eq!(bin.free_rects[0].rect, Rect::new(45.0, 100.0));
    }

    #[test]
    fn test_fill_exact() {
        let mut bin = GuillotineBin::new(&params(100.0, 100.0, 3.0));
        place_best(&mut bin, Rect::new(100.0, 100.0), false);
        assert!(bin.free_rects.is_empty());
    }

    #[test]
    fn test_squaring_strip_moves_origin() {
        let p = CuttingParameters {
            squaring_cut: 10.0,
            ..params(100.0, 80.0, 0.0)
        };
        let mut bin = GuillotineBin::new(&p);
        assert_eq!(bin.free_rects[0].x, 10.0);
        assert_eq!(bin.free_rects[0].rect, Rect::new(90.0, 80.0));
        assert!(
            bin.find_best(Rect::new(95.0, 10.0), false, FitStrategy::BestShortSideFit)
                .is_none()
        );
        let placed = place_best(&mut bin, Rect::new(90.0, 10.0), false);
        assert_eq!(placed.x, 10.0);
    }

    #[test]
    fn test_split_keeps_largest_offcut() {
        // 30x80 in 100x100: vertical first leaves a 70x100 strip, horizontal
        // first only 100x20 and 70x80.
        let mut bin = GuillotineBin::new(&params(100.0, 100.0, 0.0));
        place_best(&mut bin, Rect::new(30.0, 80.0), false);
        let mut rects: Vec<(f64, f64, Rect)> =
            bin.free_rects.iter().map(|f| (f.x, f.y, f.rect)).collect();
        rects.sort_by(|a, b| a.0.total_cmp(&b.0));
        assert_eq!(
            rects,
            vec![
                (0.0, 80.0, Rect::new(30.0, 20.0)),
                (30.0, 0.0, Rect::new(70.0, 100.0)),
            ]
        );
    }

    #[test]
    fn test_small_offcuts_pruned() {
        let p = CuttingParameters {
            min_offcut: 10.0,
            ..params(100.0, 100.0, 0.0)
        };
        let mut bin = GuillotineBin::new(&p);
        place_best(&mut bin, Rect::new(92.0, 50.0), false);
        assert!(bin.free_rects.iter().all(|f| f.rect.short_side() > 10.0));
        assert_eq!(bin.free_rects.len(), 1);
        assert_eq!(bin.free_rects[0].rect, Rect::new(100.0, 50.0));
    }

    #[test]
    fn test_best_short_side_picks_snug_rect() {
        let mut bin = GuillotineBin::new(&params(100.0, 100.0, 0.0));
        place_best(&mut bin, Rect::new(30.0, 80.0), false);
        // A 28x18 piece fits snugly in the 30x20 offcut.
        let p = place_best(&mut bin, Rect::new(28.0, 18.0), false);
        assert_eq!((p.x, p.y), (0.0, 80.0));
    }

    #[test]
    fn test_equal_short_slack_keeps_first_rect() {
        let mut bin = GuillotineBin::new(&params(100.0, 100.0, 0.0));
        bin.free_rects = vec![
            FreeRect {
                x: 0.0,
                y: 0.0,
                rect: Rect::new(50.0, 100.0),
            },
            FreeRect {
                x: 50.0,
                y: 0.0,
                rect: Rect::new(50.0, 60.0),
            },
        ];
        let scored = bin
            .find_best(Rect::new(45.0, 20.0), false, FitStrategy::BestShortSideFit)
            .unwrap();
        assert_eq!(scored.free_idx, 0);
        assert_eq!(scored.score, (5.0, 0.0));
    }

    #[test]
    fn test_free_rects_stay_disjoint_and_in_bounds() {
        let p = CuttingParameters {
            squaring_cut: 10.0,
            ..params(500.0, 300.0, 4.0)
        };
        let mut bin = GuillotineBin::new(&p);
        for piece in [
            Rect::new(200.0, 120.0),
            Rect::new(150.0, 90.0),
            Rect::new(80.0, 60.0),
            Rect::new(60.0, 50.0),
            Rect::new(45.0, 30.0),
            Rect::new(30.0, 25.0),
        ] {
            place_best(&mut bin, piece, true);
        }
        assert!(!bin.free_rects.is_empty());

        for f in &bin.free_rects {
            assert!(
                f.x >= p.squaring_cut - EPSILON
                    && f.y >= -EPSILON
                    && f.x + f.rect.length <= p.stock_length + EPSILON
                    && f.y + f.rect.width <= p.stock_width + EPSILON,
                "free rect {:?} leaves the usable area",
                f
            );
            for pl in &bin.placements {
                let fp = pl.footprint();
                let overlaps = f.x < pl.x + fp.length + p.kerf - EPSILON
                    && pl.x < f.x + f.rect.length - EPSILON
                    && f.y < pl.y + fp.width + p.kerf - EPSILON
                    && pl.y < f.y + f.rect.width - EPSILON;
                assert!(!overlaps, "free rect {:?} overlaps {:?}", f, pl);
            }
        }

        for i in 0..bin.free_rects.len() {
            for j in (i + 1)..bin.free_rects.len() {
                let a = &bin.free_rects[i];
                let b = &bin.free_rects[j];
                let overlaps = a.x < b.x + b.rect.length - EPSILON
                    && b.x < a.x + a.rect.length - EPSILON
                    && a.y < b.y + b.rect.width - EPSILON
                    && b.y < a.y + a.rect.width - EPSILON;
                assert!(!overlaps, "free rects {:?} and {:?} overlap", a, b);
            }
        }
    }

    #[test]
    fn test_better_score_tolerance() {
        assert!(better_score((1.0, 5.0), (2.0, 0.0)));
        assert!(better_score((1.0, 1.0), (1.0, 2.0)));
        assert!(!better_score((1.0, 2.0), (1.0 + 1e-9, 2.0)));
    }
}
