//! Bounded local search for a block-aligned resolution.
//!
//! The continuous optimum `(ar * h, h)` with `h = sqrt(area / ar)` is found
//! first, then heights are stepped by whole blocks around it. Each step is
//! aligned on both axes, and a second width is taken from the aligned height,
//! so an aligned shape fed back as its own ratio competes as an exact match. A
//! candidate whose aspect ratio is within `rel_ar_tol` of the request (exact
//! by default) wins outright, closest area first; otherwise the weighted
//! area/ratio score decides.

use std::cmp::Ordering;

use tracing::debug;

use super::align::align;
use super::Resolution;
use crate::consts::{
    DEFAULT_AR_WEIGHT, DEFAULT_MP_WEIGHT, DEFAULT_REL_AR_TOL, DEFAULT_SEARCH_RANGE,
    FALLBACK_MAX_AR, FALLBACK_MIN_AR, PIXELS_PER_MEGAPIXEL,
};
use crate::error::{OptiError, Result};

/// Tuning for [`find_resolution`].
#[derive(Clone, Debug, PartialEq)]
pub struct SearchParams {
    /// Block-steps examined on each side of the ideal height.
    pub search_range: u32,
    /// Relative aspect-ratio error accepted by the exact-match pass.
    pub rel_ar_tol: f64,
    /// Preferred lower bound on the candidate's `w / h`.
    pub min_ar: f64,
    /// Preferred upper bound on the candidate's `w / h`.
    pub max_ar: f64,
    pub mp_weight: f64,
    pub ar_weight: f64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            search_range: DEFAULT_SEARCH_RANGE,
            rel_ar_tol: DEFAULT_REL_AR_TOL,
            min_ar: FALLBACK_MIN_AR,
            max_ar: FALLBACK_MAX_AR,
            mp_weight: DEFAULT_MP_WEIGHT,
            ar_weight: DEFAULT_AR_WEIGHT,
        }
    }
}

impl SearchParams {
    pub fn with_search_range(mut self, search_range: u32) -> Self {
        self.search_range = search_range;
        self
    }

    pub fn with_bounds(mut self, min_ar: f64, max_ar: f64) -> Self {
        self.min_ar = min_ar;
        self.max_ar = max_ar;
        self
    }

    pub fn with_rel_ar_tol(mut self, rel_ar_tol: f64) -> Self {
        self.rel_ar_tol = rel_ar_tol;
        self
    }
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    resolution: Resolution,
    /// Absolute distance from the target area, in pixels.
    area_err: f64,
    /// `|(w / h) / ar - 1|`.
    ar_err: f64,
    in_bounds: bool,
}

/// Find the block-aligned `(width, height)` closest to `ar` and `target_mp`.
///
/// Candidates whose `w / h` falls outside `[min_ar, max_ar]` are dropped
/// unless every candidate does.
///
/// Returns [`OptiError::NoResolutionFound`] when the target area is below
/// one block squared or when `ar`/`target_mp` are not positive finite values.
pub fn find_resolution(
    ar: f64,
    target_mp: f64,
    block: u32,
    params: &SearchParams,
) -> Result<Resolution> {
    let not_found = || OptiError::NoResolutionFound {
        ar,
        target_mp,
        block,
    };

    let target_px = target_mp * PIXELS_PER_MEGAPIXEL;
    let block_f = block as f64;
    if block == 0
        || !ar.is_finite()
        || ar <= 0.0
        || !target_px.is_finite()
        || target_px < block_f * block_f
    {
        return Err(not_found());
    }

    let candidates = collect_candidates(ar, target_px, block, params);
    if candidates.is_empty() {
        return Err(not_found());
    }

    let exact = candidates
        .iter()
        .filter(|c| c.ar_err <= params.rel_ar_tol)
        .min_by(|a, b| {
            a.area_err
                .total_cmp(&b.area_err)
                .then_with(|| a.ar_err.total_cmp(&b.ar_err))
                .then_with(|| b.resolution.area().cmp(&a.resolution.area()))
        });
    if let Some(best) = exact {
        debug!(
            resolution = %best.resolution,
            candidates = candidates.len(),
            "Exact aspect-ratio match selected"
        );
        return Ok(best.resolution);
    }

    let score = |c: &Candidate| {
        params.mp_weight * (c.area_err / target_px) + params.ar_weight * c.ar_err
    };
    let best = candidates
        .iter()
        .min_by(|a, b| match score(a).total_cmp(&score(b)) {
            Ordering::Equal => b.resolution.area().cmp(&a.resolution.area()),
            other => other,
        })
        .ok_or_else(not_found)?;

    debug!(
        resolution = %best.resolution,
        score = score(best),
        candidates = candidates.len(),
        "Weighted fallback selected"
    );
    Ok(best.resolution)
}

fn collect_candidates(
    ar: f64,
    target_px: f64,
    block: u32,
    params: &SearchParams,
) -> Vec<Candidate> {
    let raw_h = (target_px / ar).sqrt();
    let range = params.search_range as i64;

    let mut candidates = Vec::new();
    for delta in -range..=range {
        let h_try = raw_h + delta as f64 * block as f64;
        let h = align(h_try, block);
        let w = align(ar * h_try, block);
        // Width from the aligned height keeps a shape's own ratio reachable.
        let w_on_h = align(ar * h as f64, block);

        candidates.push(candidate(w, h, ar, target_px, params));
        if w_on_h != w {
            candidates.push(candidate(w_on_h, h, ar, target_px, params));
        }
    }

    // Out-of-range shapes only survive when nothing else does.
    if candidates.iter().any(|c| c.in_bounds) {
        candidates.retain(|c| c.in_bounds);
    } else if !candidates.is_empty() {
        debug!(
            ar,
            min_ar = params.min_ar,
            max_ar = params.max_ar,
            "No candidate within aspect-ratio bounds, keeping all"
        );
    }
    candidates
}

fn candidate(w: u32, h: u32, ar: f64, target_px: f64, params: &SearchParams) -> Candidate {
    let resolution = Resolution::new(w, h);
    let actual_ar = resolution.aspect_ratio();
    Candidate {
        resolution,
        area_err: (resolution.area() as f64 - target_px).abs(),
        ar_err: (actual_ar / ar - 1.0).abs(),
        in_bounds: (params.min_ar..=params.max_ar).contains(&actual_ar),
    }
}
