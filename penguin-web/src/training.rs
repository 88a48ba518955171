//! Model training
//!
//! Produces the `LinearPipeline` artifact and `metrics.json` from the seed
//! dataset:
//!
//! 1. Clean the seed and keep labelled rows
//! 2. Stratified train/test split
//! 3. Grid search over the inverse regularisation strength `C` with
//!    stratified k-fold cross validation scored by accuracy
//! 4. Refit the best `C` on the whole training split
//! 5. Evaluate on the held-out split and write both files
//!
//! The fit is full-batch gradient descent on the L2 penalised multinomial
//! log-loss.

use anyhow::Context;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;
use tracing::{debug, info};

use penguin_common::config::DataPaths;
use penguin_common::metrics::{ClassScores, ClassificationReport};
use penguin_common::{Error, Observation, Result, Species};

use crate::history::load_labelled;
use crate::pipeline::{round_to, softmax_in_place, FeatureEncoder, LinearModel, LinearPipeline};

/// Stop once no gradient component exceeds this
const GRADIENT_TOLERANCE: f64 = 1e-6;

/// Training hyper-parameters
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    /// Seed for splitting and fold assignment
    pub seed: u64,
    pub test_fraction: f64,
    pub folds: usize,
    /// Candidate inverse regularisation strengths
    pub c_grid: Vec<f64>,
    pub max_iterations: usize,
    pub learning_rate: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_fraction: 0.2,
            folds: 5,
            c_grid: vec![0.1, 1.0, 10.0],
            max_iterations: 1000,
            learning_rate: 0.5,
        }
    }
}

/// Everything a training run produced
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub pipeline: LinearPipeline,
    pub report: ClassificationReport,
    pub best_c: f64,
    pub train_size: usize,
    pub test_size: usize,
}

// ========================================
// Splitting
// ========================================

fn indices_by_class(labels: &[Species]) -> BTreeMap<Species, Vec<usize>> {
    let mut groups: BTreeMap<Species, Vec<usize>> = BTreeMap::new();
    for (i, label) in labels.iter().enumerate() {
        groups.entry(*label).or_default().push(i);
    }
    groups
}

/// Split indices into (train, test) keeping class proportions
pub fn stratified_split(
    labels: &[Species],
    test_fraction: f64,
    rng: &mut StdRng,
) -> (Vec<usize>, Vec<usize>) {
    let mut train = Vec::new();
    let mut test = Vec::new();

    for (_, mut members) in indices_by_class(labels) {
        members.shuffle(rng);
        let n_test = ((members.len() as f64) * test_fraction).round() as usize;
        let n_test = n_test.min(members.len().saturating_sub(1));
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

/// Assign indices to `k` folds, dealing each class round-robin
pub fn stratified_folds(labels: &[Species], k: usize, rng: &mut StdRng) -> Vec<Vec<usize>> {
    let k = k.max(1);
    let mut folds = vec![Vec::new(); k];
    let mut next = 0;

    for (_, mut members) in indices_by_class(labels) {
        members.shuffle(rng);
        for index in members {
            folds[next % k].push(index);
            next += 1;
        }
    }

    for fold in &mut folds {
        fold.sort_unstable();
    }
    folds
}

// ========================================
// Fitting
// ========================================

/// Fit encoder and logistic-regression weights on labelled observations
pub fn fit(observations: &[&Observation], c: f64, config: &TrainingConfig) -> Result<LinearPipeline> {
    let labels = labels_of(observations)?;
    let classes: Vec<Species> = Species::ALL
        .into_iter()
        .filter(|s| labels.contains(s))
        .collect();
    if classes.len() < 2 {
        return Err(Error::InvalidInput(format!(
            "Training needs at least two species, found {}",
            classes.len()
        )));
    }
    if c <= 0.0 {
        return Err(Error::InvalidInput(format!("C must be positive, got {}", c)));
    }

    let encoder = FeatureEncoder::fit(observations);
    let x = encoder.encode_all(observations);
    let mut y = Array2::<f64>::zeros((labels.len(), classes.len()));
    for (mut row, label) in y.rows_mut().into_iter().zip(&labels) {
        if let Some(k) = classes.iter().position(|class| class == label) {
            row[k] = 1.0;
        }
    }

    let n = x.nrows() as f64;
    let mut weights = Array2::<f64>::zeros((classes.len(), encoder.width()));
    let mut intercepts = Array1::<f64>::zeros(classes.len());

    let mut iterations = 0;
    for _ in 0..config.max_iterations {
        iterations += 1;

        let mut proba = x.dot(&weights.t()) + &intercepts;
        for row in proba.rows_mut() {
            softmax_in_place(row);
        }
        let residual = proba - &y;

        let grad_w = residual.t().dot(&x) / n + &weights / (c * n);
        let grad_b = residual.sum_axis(Axis(0)) / n;
        let largest = grad_w
            .iter()
            .chain(grad_b.iter())
            .fold(0.0_f64, |m, g| m.max(g.abs()));

        weights.scaled_add(-config.learning_rate, &grad_w);
        intercepts.scaled_add(-config.learning_rate, &grad_b);

        if largest < GRADIENT_TOLERANCE {
            break;
        }
    }
    debug!(c, iterations, samples = x.nrows(), "Fitted logistic regression");

    Ok(LinearPipeline {
        encoder,
        model: LinearModel {
            classes,
            coefficients: weights,
            intercepts,
        },
    })
}

fn labels_of(observations: &[&Observation]) -> Result<Vec<Species>> {
    observations
        .iter()
        .map(|o| {
            o.species
                .ok_or_else(|| Error::InvalidInput("Training rows must be labelled".to_string()))
        })
        .collect()
}

/// Fraction of observations the pipeline labels correctly
pub fn accuracy(pipeline: &LinearPipeline, observations: &[&Observation]) -> f64 {
    if observations.is_empty() {
        return 0.0;
    }
    let correct = observations
        .iter()
        .filter(|o| o.species == Some(pipeline.predict(o).0))
        .count();
    correct as f64 / observations.len() as f64
}

/// Mean k-fold accuracy for one value of `C`
pub fn cross_validate(
    observations: &[&Observation],
    c: f64,
    config: &TrainingConfig,
) -> Result<f64> {
    let labels = labels_of(observations)?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let folds = stratified_folds(&labels, config.folds, &mut rng);

    let mut scores = Vec::with_capacity(folds.len());
    for (f, held_out) in folds.iter().enumerate() {
        if held_out.is_empty() {
            continue;
        }
        let train: Vec<&Observation> = folds
            .iter()
            .enumerate()
            .filter(|(g, _)| *g != f)
            .flat_map(|(_, fold)| fold.iter().map(|&i| observations[i]))
            .collect();
        let validation: Vec<&Observation> = held_out.iter().map(|&i| observations[i]).collect();

        let pipeline = fit(&train, c, config)?;
        scores.push(accuracy(&pipeline, &validation));
    }

    if scores.is_empty() {
        return Err(Error::InvalidInput("No cross-validation folds".to_string()));
    }
    Ok(scores.iter().sum::<f64>() / scores.len() as f64)
}

// ========================================
// Evaluation
// ========================================

/// Per-class and averaged scores on a labelled evaluation set
pub fn evaluate(
    pipeline: &LinearPipeline,
    observations: &[&Observation],
    cross_val_accuracy: f64,
) -> ClassificationReport {
    let pairs: Vec<(Species, Species)> = observations
        .iter()
        .filter_map(|o| o.species.map(|truth| (truth, pipeline.predict(o).0)))
        .collect();
    let total = pairs.len();

    let mut per_class = BTreeMap::new();
    let mut class_scores = Vec::new();
    for species in &pipeline.model.classes {
        let tp = pairs.iter().filter(|(t, p)| t == species && p == species).count();
        let predicted = pairs.iter().filter(|(_, p)| p == species).count();
        let support = pairs.iter().filter(|(t, _)| t == species).count();

        let precision = ratio(tp, predicted);
        let recall = ratio(tp, support);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        let scores = ClassScores {
            precision,
            recall,
            f1_score,
            support,
        };
        class_scores.push(scores);
        per_class.insert(species.to_string(), rounded(scores));
    }

    let n_classes = class_scores.len().max(1) as f64;
    let macro_avg = ClassScores {
        precision: class_scores.iter().map(|s| s.precision).sum::<f64>() / n_classes,
        recall: class_scores.iter().map(|s| s.recall).sum::<f64>() / n_classes,
        f1_score: class_scores.iter().map(|s| s.f1_score).sum::<f64>() / n_classes,
        support: total,
    };
    let weight = |f: fn(&ClassScores) -> f64| {
        if total == 0 {
            return 0.0;
        }
        class_scores
            .iter()
            .map(|s| f(s) * s.support as f64)
            .sum::<f64>()
            / total as f64
    };
    let weighted_avg = ClassScores {
        precision: weight(|s| s.precision),
        recall: weight(|s| s.recall),
        f1_score: weight(|s| s.f1_score),
        support: total,
    };

    let correct = pairs.iter().filter(|(t, p)| t == p).count();
    ClassificationReport {
        per_class,
        accuracy: round_to(ratio(correct, total), 4),
        macro_avg: rounded(macro_avg),
        weighted_avg: rounded(weighted_avg),
        cross_val_accuracy: round_to(cross_val_accuracy, 4),
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn rounded(s: ClassScores) -> ClassScores {
    ClassScores {
        precision: round_to(s.precision, 4),
        recall: round_to(s.recall, 4),
        f1_score: round_to(s.f1_score, 4),
        support: s.support,
    }
}

// ========================================
// Entry points
// ========================================

/// Split, grid-search, refit and evaluate
pub fn train(observations: &[Observation], config: &TrainingConfig) -> Result<TrainingOutcome> {
    let labelled: Vec<&Observation> = observations.iter().filter(|o| o.species.is_some()).collect();
    let labels = labels_of(&labelled)?;
    if labelled.len() < config.folds.max(2) {
        return Err(Error::InvalidInput(format!(
            "Training needs at least {} labelled rows, found {}",
            config.folds.max(2),
            labelled.len()
        )));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let (train_idx, test_idx) = stratified_split(&labels, config.test_fraction, &mut rng);
    let train_set: Vec<&Observation> = train_idx.iter().map(|&i| labelled[i]).collect();
    let test_set: Vec<&Observation> = test_idx.iter().map(|&i| labelled[i]).collect();
    info!(train = train_set.len(), test = test_set.len(), "Split dataset");

    let mut best: Option<(f64, f64)> = None;
    for &c in &config.c_grid {
        let score = cross_validate(&train_set, c, config)?;
        info!(c, cv_accuracy = score, "Cross-validated candidate");
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((c, score));
        }
    }
    let (best_c, cv_score) =
        best.ok_or_else(|| Error::InvalidInput("Empty C grid".to_string()))?;

    let pipeline = fit(&train_set, best_c, config)?;
    let report = evaluate(&pipeline, &test_set, cv_score);
    info!(
        best_c,
        accuracy = report.accuracy,
        cross_val_accuracy = report.cross_val_accuracy,
        "Training complete"
    );

    Ok(TrainingOutcome {
        pipeline,
        report,
        best_c,
        train_size: train_set.len(),
        test_size: test_set.len(),
    })
}

/// Train from the seed under `paths` and write the artifact and metrics
pub fn run_training(paths: &DataPaths, config: &TrainingConfig) -> anyhow::Result<TrainingOutcome> {
    let observations = load_labelled(&paths.seed)
        .with_context(|| format!("Failed to load seed dataset {}", paths.seed.display()))?;
    info!(rows = observations.len(), "Loaded seed dataset");

    let outcome = train(&observations, config).context("Training failed")?;

    outcome
        .pipeline
        .save(&paths.model)
        .with_context(|| format!("Failed to write model {}", paths.model.display()))?;
    info!("Model saved to {}", paths.model.display());

    if let Some(parent) = paths.metrics.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&paths.metrics, serde_json::to_string_pretty(&outcome.report)?)
        .with_context(|| format!("Failed to write metrics {}", paths.metrics.display()))?;
    info!("Metrics saved to {}", paths.metrics.display());

    Ok(outcome)
}
