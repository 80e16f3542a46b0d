// Classifier trait — the seam between the endpoint and the model.
//
// The default implementation runs a local ONNX model (Detoxify
// unbiased-toxic-roberta). Google's Perspective API is available as an
// alternative. Tests substitute their own fakes.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

/// Scores for every label a classifier emitted, keyed by label name.
///
/// Scores are opaque confidence values (conventionally 0.0 to 1.0). The only
/// thing enforced is that each one is finite, so that a broken model can't
/// slip a NaN past the threshold comparison and read as "not offensive".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelScores {
    scores: BTreeMap<String, f64>,
}

impl LabelScores {
    /// Build a score map from (label, score) pairs, rejecting non-finite scores.
    ///
    /// If a label appears twice the last score wins.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut scores = BTreeMap::new();
        for (label, score) in pairs {
            let label = label.into();
            if !score.is_finite() {
                anyhow::bail!("Classifier returned non-finite score {score} for label '{label}'");
            }
            scores.insert(label, score);
        }
        Ok(Self { scores })
    }

    /// Score for `label`, if the classifier emitted one.
    pub fn get(&self, label: &str) -> Option<f64> {
        self.scores.get(label).copied()
    }

    /// Score for `label`, treating an absent label as 0.0.
    pub fn get_or_zero(&self, label: &str) -> f64 {
        self.get(label).unwrap_or(0.0)
    }

    /// Number of labels scored.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// True when the classifier emitted no labels at all.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Iterate labels and scores in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.scores.iter().map(|(label, score)| (label.as_str(), *score))
    }
}

/// Trait for classifying text. Implementations must return scores for every
/// label they support, not just the top-scoring one.
///
/// Async because inference is offloaded to a blocking thread (ONNX) or made
/// over HTTP (Perspective).
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify a single text.
    async fn classify(&self, text: &str) -> Result<LabelScores>;

    /// Short name of the backend, for logs.
    fn name(&self) -> &'static str;
}
