use serde::{Deserialize, Deserializer, Serialize};

use crate::error::PlannerError;

/// Tolerance used for every "fits" comparison, in millimetres.
pub const EPSILON: f64 = 1e-6;

// Standard raw panel, mm
pub const STOCK_LENGTH: f64 = 2800.0;
pub const STOCK_WIDTH: f64 = 2070.0;

/// Axis-aligned size in millimetres. `length` runs along x, `width` along y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub length: f64,
    pub width: f64,
}

impl Rect {
    pub fn new(length: f64, width: f64) -> Self {
        Self { length, width }
    }

    pub fn area(&self) -> f64 {
        self.length * self.width
    }

    pub fn rotated(&self) -> Self {
        Self {
            length: self.width,
            width: self.length,
        }
    }

    pub fn fits_in(&self, other: &Rect) -> bool {
        self.length <= other.length + EPSILON && self.width <= other.width + EPSILON
    }

    pub fn long_side(&self) -> f64 {
        self.length.max(self.width)
    }

    pub fn short_side(&self) -> f64 {
        self.length.min(self.width)
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.length, self.width)
    }
}

/// How a free rectangle is scored against a piece. Lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(clippy::enum_variant_names)]
pub enum FitStrategy {
    /// Smallest leftover side only; ties keep the earlier free rectangle.
    #[default]
    BestShortSideFit,
    BestLongSideFit,
    BestAreaFit,
}

impl std::str::FromStr for FitStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short-side" => Ok(FitStrategy::BestShortSideFit),
            "long-side" => Ok(FitStrategy::BestLongSideFit),
            "area" => Ok(FitStrategy::BestAreaFit),
            _ => Err(format!(
                "invalid fit strategy '{}', expected: short-side, long-side, or area",
                s
            )),
        }
    }
}

/// Workshop settings for one optimisation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CuttingParameters {
    pub stock_length: f64,
    pub stock_width: f64,
    pub kerf: f64,
    /// Per side.
    pub edge_allowance: f64,
    /// Taken off the leading length edge of every fresh panel.
    pub squaring_cut: f64,
    pub grain_enforced: bool,
    pub min_offcut: f64,
    pub fit_strategy: FitStrategy,
}

impl Default for CuttingParameters {
    fn default() -> Self {
        Self {
            stock_length: STOCK_LENGTH,
            stock_width: STOCK_WIDTH,
            kerf: 4.0,
            edge_allowance: 2.0,
            squaring_cut: 10.0,
            grain_enforced: true,
            min_offcut: 10.0,
            fit_strategy: FitStrategy::default(),
        }
    }
}

impl CuttingParameters {
    pub fn stock(&self) -> Rect {
        Rect::new(self.stock_length, self.stock_width)
    }

    /// Area left on a fresh panel once the squaring strip is gone.
    pub fn usable(&self) -> Rect {
        Rect::new(self.stock_length - self.squaring_cut, self.stock_width)
    }

    /// Gross dimensions of a requested piece.
    pub fn cut_size(&self, length: f64, width: f64) -> Rect {
        Rect::new(
            length + 2.0 * self.edge_allowance,
            width + 2.0 * self.edge_allowance,
        )
    }

    pub fn validate(&self) -> Result<(), PlannerError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.stock_length) || !positive(self.stock_width) {
            return Err(PlannerError::InvalidStock {
                length: self.stock_length,
                width: self.stock_width,
            });
        }
        for (name, value) in [
            ("kerf", self.kerf),
            ("edge_allowance", self.edge_allowance),
            ("squaring_cut", self.squaring_cut),
            ("min_offcut", self.min_offcut),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PlannerError::InvalidParameter { name, value });
            }
        }
        if self.squaring_cut >= self.stock_length {
            return Err(PlannerError::NoUsableArea {
                squaring: self.squaring_cut,
                length: self.stock_length,
            });
        }
        Ok(())
    }
}

/// A line of the parts list: `quantity` identical pieces to cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandPart {
    pub name: String,
    pub reference: String,
    pub length: f64,
    pub width: f64,
    pub thickness: f64,
    pub color: String,
    #[serde(
        default = "default_quantity",
        deserialize_with = "deserialize_u32_from_number"
    )]
    pub quantity: u32,
    /// Directional grain or decor; such a piece only rotates when the
    /// parameters do not enforce grain.
    #[serde(default = "default_true")]
    pub grain: bool,
}

fn default_quantity() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl DemandPart {
    pub fn new(
        name: impl Into<String>,
        reference: impl Into<String>,
        length: f64,
        width: f64,
        thickness: f64,
        color: impl Into<String>,
        quantity: u32,
    ) -> Self {
        Self {
            name: name.into(),
            reference: reference.into(),
            length,
            width,
            thickness,
            color: color.into(),
            quantity,
            grain: true,
        }
    }

    pub fn without_grain(self) -> Self {
        Self {
            grain: false,
            ..self
        }
    }

    pub fn is_degenerate(&self) -> bool {
        [self.length, self.width, self.thickness]
            .iter()
            .any(|v| !v.is_finite() || *v <= 0.0)
    }
}

/// Accepts any integral JSON number, so `2` and `2.0` both work.
pub fn deserialize_u32_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(serde::de::Error::custom(format!(
            "expected a non-negative integer, got {}",
            value
        )));
    }
    Ok(value as u32)
}

/// One piece positioned on a panel. `x`/`y` are panel-local, `cut` holds the
/// gross dimensions in the requested orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub name: String,
    pub reference: String,
    pub x: f64,
    pub y: f64,
    pub cut: Rect,
    pub rotated: bool,
}

impl Placement {
    pub fn footprint(&self) -> Rect {
        if self.rotated {
            self.cut.rotated()
        } else {
            self.cut
        }
    }
}

/// One consumed raw panel. Every placement shares its thickness and color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuttingPlan {
    pub thickness: f64,
    pub color: String,
    pub stock: Rect,
    pub placements: Vec<Placement>,
}

impl CuttingPlan {
    pub fn stock_area(&self) -> f64 {
        self.stock.area()
    }

    pub fn used_area(&self) -> f64 {
        self.placements.iter().map(|p| p.cut.area()).sum()
    }

    pub fn stock_area_m2(&self) -> f64 {
        self.stock_area() / 1e6
    }

    pub fn used_area_m2(&self) -> f64 {
        self.used_area() / 1e6
    }

    pub fn waste_percent(&self) -> f64 {
        let stock_area = self.stock_area();
        if stock_area <= 0.0 {
            return 100.0;
        }
        (100.0 * (1.0 - self.used_area() / stock_area)).clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Too large for the usable panel area in every allowed orientation.
    OutOfGauge,
    /// Non-positive or non-finite dimension.
    Degenerate,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::OutOfGauge => write!(f, "out of gauge"),
            RejectReason::Degenerate => write!(f, "degenerate"),
        }
    }
}

/// A demand line that could not be cut, with its raw requested dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedPart {
    pub part: DemandPart,
    pub reason: RejectReason,
}

/// Raw panels to order for one material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelCount {
    pub thickness: f64,
    pub color: String,
    pub quantity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub plans: Vec<CuttingPlan>,
    pub rejected: Vec<RejectedPart>,
    pub stock: Rect,
}

impl Solution {
    pub fn plan_count(&self) -> usize {
        self.plans.len()
    }

    pub fn placed_units(&self) -> usize {
        self.plans.iter().map(|p| p.placements.len()).sum()
    }

    pub fn rejected_units(&self) -> u64 {
        self.rejected.iter().map(|r| r.part.quantity as u64).sum()
    }

    pub fn total_stock_area_m2(&self) -> f64 {
        self.plans.iter().map(|p| p.stock_area_m2()).sum()
    }

    pub fn total_parts_area_m2(&self) -> f64 {
        self.plans.iter().map(|p| p.used_area_m2()).sum()
    }

    pub fn total_waste_percent(&self) -> f64 {
        let total = self.total_stock_area_m2();
        if total <= 0.0 {
            return 0.0;
        }
        (100.0 * (1.0 - self.total_parts_area_m2() / total)).clamp(0.0, 100.0)
    }

    /// Panel count per (thickness, color), sorted by thickness then color.
    pub fn panel_counts(&self) -> Vec<PanelCount> {
        let mut counts: Vec<PanelCount> = Vec::new();
        for plan in &self.plans {
            match counts
                .iter_mut()
                .find(|c| c.thickness == plan.thickness && c.color == plan.color)
            {
                Some(c) => c.quantity += 1,
                None => counts.push(PanelCount {
                    thickness: plan.thickness,
                    color: plan.color.clone(),
                    quantity: 1,
                }),
            }
        }
        counts.sort_by(|a, b| {
            a.thickness
                .total_cmp(&b.thickness)
                .then_with(|| a.color.cmp(&b.color))
        });
        counts
    }
}
