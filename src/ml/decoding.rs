// ============================================================
// Layer 5 — Autoregressive Decoding
// ============================================================
// Both strategies encode the context once and then call the
// decoder repeatedly on the growing prefix:
//
//   step 0:  [<pad>]                    → t1
//   step 1:  [<pad> t1]                 → t2
//   step 2:  [<pad> t1 t2]              → t3 ...
//
// Greedy keeps the arg-max token at every step. Beam search
// keeps the `num_beams` best prefixes by summed log-probability;
// hypotheses that emit </s> are set aside and finally ranked by
// score / length^length_penalty.
//
// There is no key/value cache: each step re-runs the decoder on
// the whole prefix. Outputs are capped at the target position
// table size, so the cost stays bounded.

use anyhow::Result;
use burn::{prelude::*, tensor::activation::log_softmax};
use serde::{Deserialize, Serialize};

use crate::ml::model::QaModel;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecodingSettings {
    /// Upper bound on generated tokens (excluding the start token)
    pub max_output_len: usize,

    /// 1 = greedy
    pub num_beams: usize,

    /// Exponent applied to the hypothesis length when ranking finished beams
    pub length_penalty: f32,
}

impl Default for DecodingSettings {
    fn default() -> Self {
        Self { max_output_len: 128, num_beams: 1, length_penalty: 1.0 }
    }
}

impl DecodingSettings {
    pub fn greedy(max_output_len: usize) -> Self {
        Self { max_output_len, ..Self::default() }
    }

    /// Steps that fit in the model's target position table
    fn step_limit(&self, max_target_len: usize) -> usize {
        self.max_output_len.min(max_target_len)
    }
}

fn ids_tensor<B: Backend>(rows: &[Vec<u32>], device: &B::Device) -> Tensor<B, 2, Int> {
    let width = rows[0].len();
    let flat: Vec<i64> = rows.iter().flat_map(|r| r.iter().map(|&x| x as i64)).collect();
    let data = TensorData::new(flat, [rows.len(), width]).convert::<B::IntElem>();
    Tensor::from_data(data, device)
}

/// Logits of the last decoder position: [batch, len, vocab] → [batch, vocab]
fn last_position<B: Backend>(logits: Tensor<B, 3>) -> Tensor<B, 2> {
    let [batch, len, vocab] = logits.dims();
    logits.slice([0..batch, len - 1..len, 0..vocab]).reshape([batch, vocab])
}

fn read_ids<B: Backend>(tensor: Tensor<B, 2, Int>) -> Result<Vec<u32>> {
    let values = tensor
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| anyhow::anyhow!("Cannot read token ids: {e:?}"))?;
    Ok(values.into_iter().map(|x| x as u32).collect())
}

fn read_floats<B: Backend>(tensor: Tensor<B, 2>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("Cannot read log-probabilities: {e:?}"))
}

/// Drop the start token and everything from </s> on.
fn finish(sequence: &[u32], eos: u32) -> Vec<u32> {
    sequence.iter().skip(1).copied().take_while(|&t| t != eos).collect()
}

// ─── Greedy ───────────────────────────────────────────────────────────────────
pub fn greedy_decode<B: Backend>(
    model:          &QaModel<B>,
    input_ids:      Tensor<B, 2, Int>,
    attention_mask: Tensor<B, 2, Int>,
    settings:       &DecodingSettings,
) -> Result<Vec<Vec<u32>>> {
    let [batch_size, _] = input_ids.dims();
    let device = input_ids.device();
    let start  = model.pad_token_id as u32;
    let eos    = model.eos_token_id as u32;

    let (memory, memory_mask) = model.encode(input_ids, attention_mask);

    let mut sequences = vec![vec![start]; batch_size];
    let mut finished  = vec![false; batch_size];

    for _ in 0..settings.step_limit(model.max_target_len()) {
        let logits = model.decode(ids_tensor::<B>(&sequences, &device), memory.clone(), memory_mask.clone());
        let next   = read_ids(last_position(logits).argmax(1))?;

        for (i, seq) in sequences.iter_mut().enumerate() {
            // Finished rows are fed padding so the batch stays rectangular
            let token = if finished[i] { start } else { next[i] };
            seq.push(token);
            finished[i] |= token == eos;
        }

        if finished.iter().all(|&f| f) {
            break;
        }
    }

    Ok(sequences.iter().map(|s| finish(s, eos)).collect())
}

// ─── Beam search ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
struct Hypothesis {
    tokens: Vec<u32>,
    score:  f32,
}

impl Hypothesis {
    fn normalised(&self, length_penalty: f32) -> f32 {
        let generated = (self.tokens.len() - 1).max(1) as f32;
        self.score / generated.powf(length_penalty)
    }
}

pub fn beam_search<B: Backend>(
    model:          &QaModel<B>,
    input_ids:      Tensor<B, 2, Int>,
    attention_mask: Tensor<B, 2, Int>,
    settings:       &DecodingSettings,
) -> Result<Vec<Vec<u32>>> {
    let [batch_size, src_len] = input_ids.dims();

    (0..batch_size)
        .map(|row| {
            beam_search_row(
                model,
                input_ids.clone().slice([row..row + 1, 0..src_len]),
                attention_mask.clone().slice([row..row + 1, 0..src_len]),
                settings,
            )
        })
        .collect()
}

fn beam_search_row<B: Backend>(
    model:          &QaModel<B>,
    input_ids:      Tensor<B, 2, Int>,
    attention_mask: Tensor<B, 2, Int>,
    settings:       &DecodingSettings,
) -> Result<Vec<u32>> {
    let device = input_ids.device();
    let beams  = settings.num_beams.max(1);
    let start  = model.pad_token_id as u32;
    let eos    = model.eos_token_id as u32;

    let (memory, memory_mask) = model.encode(input_ids, attention_mask);

    let mut live = vec![Hypothesis { tokens: vec![start], score: 0.0 }];
    let mut done: Vec<Hypothesis> = Vec::new();
    let mut hit_limit = true;

    for _ in 0..settings.step_limit(model.max_target_len()) {
        let n = live.len();
        let rows: Vec<Vec<u32>> = live.iter().map(|h| h.tokens.clone()).collect();

        let logits = model.decode(
            ids_tensor::<B>(&rows, &device),
            Tensor::cat(vec![memory.clone(); n], 0),
            Tensor::cat(vec![memory_mask.clone(); n], 0),
        );
        let log_probs = read_floats(log_softmax(last_position(logits), 1))?;
        let vocab = log_probs.len() / n;

        let mut candidates: Vec<(f32, usize, u32)> = Vec::with_capacity(n * vocab);
        for (h, hyp) in live.iter().enumerate() {
            let row = &log_probs[h * vocab..(h + 1) * vocab];
            candidates.extend(row.iter().enumerate().map(|(t, &lp)| (hyp.score + lp, h, t as u32)));
        }
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut next = Vec::with_capacity(beams);
        for (score, h, token) in candidates {
            let mut tokens = live[h].tokens.clone();
            tokens.push(token);

            if token == eos {
                done.push(Hypothesis { tokens, score });
            } else {
                next.push(Hypothesis { tokens, score });
            }
            if next.len() == beams {
                break;
            }
        }

        live = next;
        if done.len() >= beams || live.is_empty() {
            hit_limit = false;
            break;
        }
    }

    Ok(pick_best(done, live, hit_limit, settings.length_penalty)
        .map(|h| finish(&h.tokens, eos))
        .unwrap_or_default())
}

/// Highest length-normalised hypothesis. Unfinished ones only compete
/// when decoding ran out of steps, or when nothing finished at all.
fn pick_best(
    mut done:       Vec<Hypothesis>,
    live:           Vec<Hypothesis>,
    hit_limit:      bool,
    length_penalty: f32,
) -> Option<Hypothesis> {
    if hit_limit || done.is_empty() {
        done.extend(live);
    }
    done.into_iter()
        .max_by(|a, b| a.normalised(length_penalty).total_cmp(&b.normalised(length_penalty)))
}
