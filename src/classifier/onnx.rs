// Local ONNX toxicity classifier using Detoxify's unbiased-toxic-roberta model.
//
// Runs entirely on the local CPU: no API calls, no network dependency once
// the model files are downloaded.
//
// Model: protectai/unbiased-toxic-roberta-onnx (quantized, ~126MB)
// Output: 7 toxicity categories with continuous 0-1 scores via sigmoid.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationParams};
use tokio::sync::oneshot;
use tracing::debug;

use super::download::{MODEL_FILE, TOKENIZER_FILE};
use super::traits::{Classifier, LabelScores};
use crate::output::truncate_chars;

/// Labels output by unbiased-toxic-roberta, in the order the model returns them.
pub const LABEL_ORDER: [&str; 7] = [
    "toxicity",
    "severe_toxicity",
    "obscene",
    "identity_attack",
    "insult",
    "threat",
    "sexual_explicit",
];

/// RoBERTa pad token id.
const PAD_TOKEN_ID: i64 = 1;

/// RoBERTa's position limit, special tokens included.
const MAX_SEQUENCE_LEN: usize = 512;

/// Local ONNX-based classifier. Holds the model session and tokenizer
/// behind Arc so inference can be offloaded to spawn_blocking.
pub struct OnnxClassifier {
    // ort::Session::run takes &mut self and isn't re-entrant, so every
    // request takes this lock for the duration of one forward pass.
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
}

impl OnnxClassifier {
    /// Load the ONNX model and tokenizer from the given directory.
    ///
    /// Expects `model_quantized.onnx` and `tokenizer.json` to exist in `model_dir`.
    /// Run `feedback-guard download-model` first if they don't.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join(MODEL_FILE);
        let tokenizer_path = model_dir.join(TOKENIZER_FILE);

        if !model_path.exists() {
            anyhow::bail!(
                "Model file not found: {}\nRun `feedback-guard download-model` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Tokenizer file not found: {}\nRun `feedback-guard download-model` to download it.",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        configure_truncation(&mut tokenizer)?;

        debug!("Loaded ONNX toxicity model from {}", model_dir.display());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
        })
    }
}

#[async_trait]
impl Classifier for OnnxClassifier {
    /// Tokenize, run one forward pass, apply sigmoid to the logits and
    /// return a score for every label the model emits.
    ///
    /// Tokenization and inference are CPU-bound, so they run on
    /// spawn_blocking to keep the async runtime responsive. If this future
    /// is dropped (timeout) before the session lock is reached, the queued
    /// inference is skipped.
    async fn classify(&self, text: &str) -> Result<LabelScores> {
        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let text = text.to_string();

        // `_waiting` lives as long as this future; dropping it closes `caller`.
        let (caller, _waiting) = oneshot::channel::<()>();

        tokio::task::spawn_blocking(move || {
            if caller.is_closed() {
                anyhow::bail!("Caller stopped waiting; skipped tokenization");
            }

            let encoding = tokenizer
                .encode(text.as_str(), true)
                .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

            let mut input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
            let mut attention_mask: Vec<i64> = encoding
                .get_attention_mask()
                .iter()
                .map(|&m| m as i64)
                .collect();

            // Empty input can tokenize to zero tokens if the tokenizer has no
            // special tokens configured; the model needs at least one.
            if input_ids.is_empty() {
                input_ids.push(PAD_TOKEN_ID);
                attention_mask.push(0);
            }

            let shape = [1_i64, input_ids.len() as i64];

            let input_ids_tensor = Tensor::from_array((shape, input_ids))
                .context("Failed to create input_ids tensor")?;
            let attention_mask_tensor = Tensor::from_array((shape, attention_mask))
                .context("Failed to create attention_mask tensor")?;

            let logits = run_if_awaited(&session, &caller, |session| {
                let outputs = session
                    .run(ort::inputs! {
                        "input_ids" => input_ids_tensor,
                        "attention_mask" => attention_mask_tensor
                    })
                    .context("ONNX inference failed")?;

                // Output shape: [1, 7] — raw logits (pre-sigmoid)
                let (_out_shape, data) = outputs[0]
                    .try_extract_tensor::<f32>()
                    .context("Failed to extract output tensor")?;

                Ok(data.to_vec())
            })?;

            let scores = logits_to_scores(&logits)?;

            debug!(
                toxicity = scores.get_or_zero("toxicity"),
                obscene = scores.get_or_zero("obscene"),
                insult = scores.get_or_zero("insult"),
                text_preview = %truncate_chars(&text, 50),
                "ONNX classified text"
            );

            Ok(scores)
        })
        .await
        .context("spawn_blocking panicked")?
    }

    fn name(&self) -> &'static str {
        "onnx"
    }
}

/// Take the session lock and run `f`, unless the request that queued this
/// work has stopped waiting. Checked after the lock is acquired, since that
/// wait is where queued work piles up behind a slow forward pass.
fn run_if_awaited<T, R>(
    lock: &Mutex<T>,
    caller: &oneshot::Sender<()>,
    f: impl FnOnce(&mut T) -> Result<R>,
) -> Result<R> {
    let mut guard = lock
        .lock()
        .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

    if caller.is_closed() {
        debug!("Caller stopped waiting; skipped inference");
        anyhow::bail!("Caller stopped waiting; skipped inference");
    }

    f(&mut guard)
}

/// Cap encodings at the model's position limit so long feedback is scored on
/// its first MAX_SEQUENCE_LEN tokens instead of failing inference.
fn configure_truncation(tokenizer: &mut Tokenizer) -> Result<()> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: MAX_SEQUENCE_LEN,
            ..Default::default()
        }))
        .map_err(|e| anyhow::anyhow!("Failed to configure tokenizer truncation: {}", e))?;
    Ok(())
}

/// Sigmoid activation: maps any real number to (0, 1).
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Pair one row of raw logits with LABEL_ORDER and convert to probabilities.
///
/// A row of the wrong width means the loaded model isn't the one this
/// label table describes, so it is an error rather than a silent misread.
fn logits_to_scores(logits: &[f32]) -> Result<LabelScores> {
    if logits.len() != LABEL_ORDER.len() {
        anyhow::bail!(
            "Model returned {} outputs, expected {} ({})",
            logits.len(),
            LABEL_ORDER.len(),
            LABEL_ORDER.join(", ")
        );
    }

    LabelScores::from_pairs(
        LABEL_ORDER
            .iter()
            .zip(logits)
            .map(|(&label, &logit)| (label, sigmoid(logit as f64))),
    )
}
