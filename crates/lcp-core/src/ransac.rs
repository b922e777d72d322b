//! Model-agnostic random sample consensus.
//!
//! A model type plugs in through [`Estimator`]; [`ransac`] seeds its own
//! [`StdRng`] from [`RansacOptions::seed`] while [`ransac_with_rng`] draws
//! from a caller-owned random source. A run that finds no acceptable
//! consensus returns a [`RansacResult`] with `success == false`.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct RansacOptions {
    /// Upper bound on the number of minimal samples drawn.
    pub max_iters: usize,
    /// Largest residual still counted as an inlier.
    pub thresh: f64,
    /// Consensus sets smaller than this are never accepted.
    pub min_inliers: usize,
    /// Probability in `[0, 1]` of having drawn one all-inlier sample, used to
    /// stop early. `0.0` always draws `max_iters` samples.
    pub confidence: f64,
    /// Seed of the generator created by [`ransac`].
    pub seed: u64,
    /// Re-estimate each candidate on its consensus set and rescore it.
    pub refit_on_inliers: bool,
}

impl Default for RansacOptions {
    fn default() -> Self {
        Self {
            max_iters: 1000,
            thresh: 0.02,
            min_inliers: 3,
            confidence: 0.99,
            seed: 1_234_567,
            refit_on_inliers: false,
        }
    }
}

/// Best consensus found by a run.
#[derive(Debug, Clone)]
pub struct RansacResult<M> {
    /// Some sample reached `min_inliers`.
    pub success: bool,
    /// Winning model, `Some` exactly when `success`.
    pub model: Option<M>,
    /// Ascending indices into the input slice.
    pub inliers: Vec<usize>,
    /// RMS residual of the inliers.
    pub inlier_rms: f64,
    /// Sample number (1-based) that produced the model.
    pub iters: usize,
}

impl<M> Default for RansacResult<M> {
    fn default() -> Self {
        Self {
            success: false,
            model: None,
            inliers: Vec::new(),
            inlier_rms: f64::INFINITY,
            iters: 0,
        }
    }
}

/// A model that can be hypothesised from a minimal sample and scored per
/// datum.
pub trait Estimator {
    type Datum;
    type Model;

    /// Size of a minimal sample.
    const MIN_SAMPLES: usize;

    /// Hypothesis from `MIN_SAMPLES` indices, `None` when the sample does not
    /// determine a model.
    fn fit(data: &[Self::Datum], sample_indices: &[usize]) -> Option<Self::Model>;

    /// Non-negative distance of `datum` from `model`, compared to
    /// [`RansacOptions::thresh`].
    fn residual(model: &Self::Model, datum: &Self::Datum) -> f64;

    /// Cheap rejection of a sample before [`fit`](Self::fit).
    fn is_degenerate(_data: &[Self::Datum], _sample_indices: &[usize]) -> bool {
        false
    }

    /// Estimate on a whole consensus set. `None` keeps the sampled model.
    fn refit(_data: &[Self::Datum], _inliers: &[usize]) -> Option<Self::Model> {
        None
    }
}

/// Inliers of one hypothesis and their residual statistics.
struct Consensus {
    inliers: Vec<usize>,
    sum_sq: f64,
}

impl Consensus {
    fn collect<E: Estimator>(model: &E::Model, data: &[E::Datum], thresh: f64) -> Self {
        let mut inliers = Vec::new();
        let mut sum_sq = 0.0;
        for (i, datum) in data.iter().enumerate() {
            let r = E::residual(model, datum);
            if r <= thresh {
                inliers.push(i);
                sum_sq += r * r;
            }
        }
        Self { inliers, sum_sq }
    }

    fn len(&self) -> usize {
        self.inliers.len()
    }

    fn rms(&self) -> f64 {
        match self.inliers.len() {
            0 => f64::INFINITY,
            n => (self.sum_sq / n as f64).sqrt(),
        }
    }

    /// More inliers wins; equal counts fall back to the lower RMS.
    fn beats<M>(&self, best: &RansacResult<M>) -> bool {
        !best.success
            || self.len() > best.inliers.len()
            || (self.len() == best.inliers.len() && self.rms() < best.inlier_rms)
    }
}

/// Samples needed to draw one all-inlier minimal set with probability
/// `confidence` at the given inlier ratio, clamped to `[drawn, max_iters]`.
fn required_samples(
    confidence: f64,
    inlier_ratio: f64,
    sample_size: usize,
    drawn: usize,
    max_iters: usize,
) -> usize {
    if confidence <= 0.0 || inlier_ratio <= 0.0 {
        return max_iters;
    }
    let all_inlier = inlier_ratio.powi(sample_size as i32);
    let log_miss = (1.0 - all_inlier).max(1e-12).ln();
    if log_miss >= 0.0 {
        return max_iters;
    }
    let needed = ((1.0 - confidence).ln() / log_miss).ceil();
    (needed as usize).clamp(drawn, max_iters)
}

/// Run RANSAC with a [`StdRng`] seeded from `opts.seed`.
pub fn ransac<E: Estimator>(data: &[E::Datum], opts: &RansacOptions) -> RansacResult<E::Model> {
    let mut rng = StdRng::seed_from_u64(opts.seed);
    ransac_with_rng::<E, _>(data, opts, &mut rng)
}

/// Run RANSAC drawing minimal samples from `rng`; `opts.seed` is unused.
///
/// Every sample consumes the random source the same way whatever the
/// residuals are. With `confidence == 0.0` and `refit_on_inliers == false`
/// the candidate sequence is therefore fixed by `rng` and `data`, and a
/// smaller `thresh` never yields a larger consensus set.
pub fn ransac_with_rng<E, R>(
    data: &[E::Datum],
    opts: &RansacOptions,
    rng: &mut R,
) -> RansacResult<E::Model>
where
    E: Estimator,
    R: Rng + ?Sized,
{
    let mut best = RansacResult::default();
    if data.len() < E::MIN_SAMPLES {
        return best;
    }

    let mut budget = opts.max_iters;
    let mut drawn = 0;
    while drawn < budget {
        drawn += 1;
        let sample = index::sample(rng, data.len(), E::MIN_SAMPLES).into_vec();
        if E::is_degenerate(data, &sample) {
            continue;
        }
        let Some(mut model) = E::fit(data, &sample) else {
            continue;
        };

        let mut consensus = Consensus::collect::<E>(&model, data, opts.thresh);
        if consensus.len() < opts.min_inliers {
            continue;
        }
        if opts.refit_on_inliers {
            if let Some(refined) = E::refit(data, &consensus.inliers) {
                consensus = Consensus::collect::<E>(&refined, data, opts.thresh);
                model = refined;
            }
        }

        let ratio = consensus.len() as f64 / data.len() as f64;
        if consensus.beats(&best) {
            best.inlier_rms = consensus.rms();
            best.inliers = consensus.inliers;
            best.model = Some(model);
            best.success = true;
            best.iters = drawn;
        }
        budget = required_samples(opts.confidence, ratio, E::MIN_SAMPLES, drawn, opts.max_iters);
    }
    best
}
