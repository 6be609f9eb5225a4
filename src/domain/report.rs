// ============================================================
// Layer 3: Classification Report
// ============================================================
// Per-class precision / recall / F1 / support from (true,
// predicted) pairs, plus accuracy and macro / weighted averages.
// Built from a standard multi-class confusion tally:
//
//   precision_c = tp_c / (tp_c + fp_c)
//   recall_c    = tp_c / (tp_c + fn_c)
//   f1_c        = 2 * p * r / (p + r)
//
// A zero denominator yields 0.0 rather than NaN.

use std::fmt;

use anyhow::{bail, Result};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassScores {
    pub label:     String,
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
    pub support:   usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classes:      Vec<ClassScores>,
    pub accuracy:     f64,
    pub macro_avg:    ClassScores,
    pub weighted_avg: ClassScores,
}

impl ClassificationReport {
    /// Tally `truth` against `predicted`. `labels[c]` names class
    /// `c`; classes beyond `labels` are named by index.
    pub fn from_pairs(truth: &[usize], predicted: &[usize], labels: &[String]) -> Result<Self> {
        if truth.len() != predicted.len() {
            bail!(
                "cannot pair {} true labels with {} predictions",
                truth.len(),
                predicted.len()
            );
        }
        if truth.is_empty() {
            bail!("classification report needs at least one sample");
        }

        let num_classes = truth
            .iter()
            .chain(predicted)
            .copied()
            .max()
            .map_or(0, |m| m + 1)
            .max(labels.len());

        let mut tp = vec![0usize; num_classes];
        let mut fp = vec![0usize; num_classes];
        let mut fn_ = vec![0usize; num_classes];
        for (&t, &p) in truth.iter().zip(predicted) {
            if t == p {
                tp[t] += 1;
            } else {
                fp[p]  += 1;
                fn_[t] += 1;
            }
        }

        let classes: Vec<ClassScores> = (0..num_classes)
            .map(|c| {
                let precision = ratio(tp[c], tp[c] + fp[c]);
                let recall    = ratio(tp[c], tp[c] + fn_[c]);
                ClassScores {
                    label: labels.get(c).cloned().unwrap_or_else(|| format!("class_{c}")),
                    precision,
                    recall,
                    f1: f1(precision, recall),
                    support: tp[c] + fn_[c],
                }
            })
            .collect();

        let total   = truth.len();
        let correct = tp.iter().sum::<usize>();
        let k       = num_classes as f64;

        let macro_avg = ClassScores {
            label:     "macro avg".to_string(),
            precision: classes.iter().map(|s| s.precision).sum::<f64>() / k,
            recall:    classes.iter().map(|s| s.recall).sum::<f64>() / k,
            f1:        classes.iter().map(|s| s.f1).sum::<f64>() / k,
            support:   total,
        };

        let weighted = |score: fn(&ClassScores) -> f64| {
            classes.iter().map(|s| score(s) * s.support as f64).sum::<f64>() / total as f64
        };
        let weighted_avg = ClassScores {
            label:     "weighted avg".to_string(),
            precision: weighted(|s| s.precision),
            recall:    weighted(|s| s.recall),
            f1:        weighted(|s| s.f1),
            support:   total,
        };

        Ok(Self {
            classes,
            accuracy: correct as f64 / total as f64,
            macro_avg,
            weighted_avg,
        })
    }

    pub fn total_support(&self) -> usize {
        self.macro_avg.support
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|s| s.label.len())
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(12);

        writeln!(f, "{:>width$} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for s in &self.classes {
            write_row(f, s, width)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.total_support()
        )?;
        write_row(f, &self.macro_avg, width)?;
        write_row(f, &self.weighted_avg, width)
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, s: &ClassScores, width: usize) -> fmt::Result {
    writeln!(
        f,
        "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
        s.label, s.precision, s.recall, s.f1, s.support
    )
}
