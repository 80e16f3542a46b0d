// Unit tests for the offensiveness decision rule and the timeout-bounded check.
//
// The classifier is always a fake here: fixed scores, a forced error, or a
// deliberately slow response.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use feedback_guard::classifier::{Classifier, LabelScores};
use feedback_guard::moderation::{check, is_offensive, ModerationError, OFFENSIVE_THRESHOLD};

fn scores(pairs: &[(&str, f64)]) -> LabelScores {
    LabelScores::from_pairs(pairs.iter().map(|&(label, score)| (label, score))).unwrap()
}

struct FixedClassifier(LabelScores);

#[async_trait]
impl Classifier for FixedClassifier {
    async fn classify(&self, _text: &str) -> Result<LabelScores> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

struct FailingClassifier;

#[async_trait]
impl Classifier for FailingClassifier {
    async fn classify(&self, _text: &str) -> Result<LabelScores> {
        anyhow::bail!("model exploded")
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

struct SlowClassifier;

#[async_trait]
impl Classifier for SlowClassifier {
    async fn classify(&self, _text: &str) -> Result<LabelScores> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(LabelScores::default())
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

// ============================================================
// Decision rule — documented scenarios
// ============================================================

#[test]
fn high_toxicity_is_offensive() {
    assert!(is_offensive(&scores(&[
        ("toxicity", 0.9),
        ("obscene", 0.1),
        ("insult", 0.1),
    ])));
}

#[test]
fn all_tracked_at_threshold_is_not_offensive() {
    assert!(!is_offensive(&scores(&[
        ("toxicity", 0.6),
        ("obscene", 0.6),
        ("insult", 0.6),
    ])));
}

#[test]
fn low_toxicity_with_other_labels_absent_is_not_offensive() {
    assert!(!is_offensive(&scores(&[("toxicity", 0.2)])));
}

#[test]
fn obscene_alone_is_offensive() {
    assert!(is_offensive(&scores(&[("obscene", 0.99)])));
}

#[test]
fn insult_alone_is_offensive() {
    assert!(is_offensive(&scores(&[("insult", 0.75), ("toxicity", 0.3)])));
}

#[test]
fn no_tracked_labels_is_not_offensive() {
    assert!(!is_offensive(&scores(&[("threat", 0.95), ("sexual_explicit", 0.9)])));
}

// ============================================================
// Decision rule — monotonicity
// ============================================================

#[test]
fn raising_one_tracked_score_only_flips_false_to_true() {
    let labels = ["toxicity", "obscene", "insult"];
    let steps: Vec<f64> = (0..=20).map(|i| i as f64 * 0.05).collect();

    for label in labels {
        let mut previous = false;
        for &value in &steps {
            let mut pairs: Vec<(&str, f64)> = labels
                .iter()
                .filter(|&&l| l != label)
                .map(|&l| (l, 0.3))
                .collect();
            pairs.push((label, value));

            let offensive = is_offensive(&scores(&pairs));
            assert!(
                !(previous && !offensive),
                "{label}={value} flipped offensive back to false"
            );
            assert_eq!(offensive, value > OFFENSIVE_THRESHOLD, "{label}={value}");
            previous = offensive;
        }
    }
}

// ============================================================
// check() — classifier outcomes
// ============================================================

#[tokio::test]
async fn check_returns_verdict_and_scores() {
    let classifier = FixedClassifier(scores(&[("toxicity", 0.9), ("threat", 0.1)]));
    let verdict = check(&classifier, "anything", Duration::from_secs(1))
        .await
        .unwrap();

    assert!(verdict.offensive);
    assert_eq!(verdict.scores.get("threat"), Some(0.1));
}

#[tokio::test]
async fn check_surfaces_classifier_error() {
    let err = check(&FailingClassifier, "anything", Duration::from_secs(1))
        .await
        .unwrap_err();

    assert!(matches!(err, ModerationError::Classifier(_)));
    assert!(err.to_string().contains("model exploded"), "got: {err}");
}

#[tokio::test(start_paused = true)]
async fn check_times_out_slow_classifier() {
    let err = check(&SlowClassifier, "anything", Duration::from_secs(2))
        .await
        .unwrap_err();

    assert!(matches!(err, ModerationError::Timeout(d) if d == Duration::from_secs(2)));
}

#[tokio::test]
async fn empty_classifier_output_is_not_offensive() {
    let classifier = FixedClassifier(LabelScores::default());
    let verdict = check(&classifier, "", Duration::from_secs(1)).await.unwrap();
    assert!(!verdict.offensive);
}
