// Offensiveness decision rule.
//
// A text is offensive when any tracked label scores strictly above the
// threshold. Labels the classifier didn't emit count as 0.0, so a model
// that returns none of the tracked labels never flags anything.

use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::classifier::{Classifier, LabelScores};

/// Labels that can make a text offensive on their own.
pub const TRACKED_LABELS: [&str; 3] = ["toxicity", "obscene", "insult"];

/// A tracked label must score strictly above this to flag the text.
pub const OFFENSIVE_THRESHOLD: f64 = 0.6;

/// Outcome of checking one text.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub offensive: bool,
    /// Full classifier output the verdict was computed from.
    pub scores: LabelScores,
}

/// Why a check couldn't produce a verdict. Neither variant may be reported
/// to the caller as "not offensive".
#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("classification timed out after {0:?}")]
    Timeout(Duration),
    #[error("classification failed: {0:#}")]
    Classifier(#[source] anyhow::Error),
}

/// Apply the decision rule to a set of scores.
pub fn is_offensive(scores: &LabelScores) -> bool {
    TRACKED_LABELS
        .iter()
        .any(|label| scores.get_or_zero(label) > OFFENSIVE_THRESHOLD)
}

/// Classify `text` and apply the decision rule, giving up after `timeout`.
///
/// The timeout bounds how long the caller waits. For the ONNX backend the
/// blocking inference thread still runs to completion in the background.
pub async fn check(
    classifier: &dyn Classifier,
    text: &str,
    timeout: Duration,
) -> Result<Verdict, ModerationError> {
    let scores = match tokio::time::timeout(timeout, classifier.classify(text)).await {
        Ok(Ok(scores)) => scores,
        Ok(Err(e)) => return Err(ModerationError::Classifier(e)),
        Err(_) => return Err(ModerationError::Timeout(timeout)),
    };

    if !TRACKED_LABELS.iter().any(|label| scores.get(label).is_some()) {
        warn!(
            backend = classifier.name(),
            labels = scores.len(),
            "Classifier returned none of the tracked labels; treating as not offensive"
        );
    }

    Ok(Verdict {
        offensive: is_offensive(&scores),
        scores,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, f64)]) -> LabelScores {
        LabelScores::from_pairs(pairs.iter().map(|&(l, s)| (l, s))).unwrap()
    }

    #[test]
    fn test_each_tracked_label_can_flag_alone() {
        for label in TRACKED_LABELS {
            assert!(is_offensive(&scores(&[(label, 0.61)])), "{label} should flag");
        }
    }

    #[test]
    fn test_untracked_labels_never_flag() {
        let s = scores(&[("threat", 0.99), ("severe_toxicity", 0.99), ("identity_attack", 1.0)]);
        assert!(!is_offensive(&s));
    }

    #[test]
    fn test_threshold_is_strict() {
        assert!(!is_offensive(&scores(&[("insult", OFFENSIVE_THRESHOLD)])));
        assert!(is_offensive(&scores(&[("insult", OFFENSIVE_THRESHOLD + 1e-9)])));
    }

    #[test]
    fn test_empty_scores_not_offensive() {
        assert!(!is_offensive(&LabelScores::default()));
    }
}
