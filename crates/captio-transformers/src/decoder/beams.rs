use anyhow::{anyhow, bail, Result};
use ndarray::{Array2, ArrayViewMut1};

use crate::common::{get_top_k_from_log_probs, log_softmax_1d, DecodingStrategy, GenerationConfig};
use crate::decoder::traits::GeneratedSequence;

/// Scores next-token candidates for a set of partial hypotheses.
///
/// Implemented by a decoder for a single conditioning vector; the beam search
/// owns the hypotheses and asks the stepper for logits once per step.
pub trait BeamStepper {
    fn start_token_id(&self) -> u32;

    fn eos_token_id(&self) -> u32;

    /// Returns logits `[histories.len(), vocab]`.
    ///
    /// `histories` are the live hypotheses, best-ranked first, each holding
    /// `step + 1` tokens including the start token.
    fn step(&mut self, histories: &[&[u32]], step: usize) -> Result<Array2<f32>>;
}

#[derive(Clone, Debug)]
pub struct BeamHypothesis {
    pub tokens: Vec<u32>,
    pub score: f32,
}

impl BeamHypothesis {
    pub fn normalized_score(&self, length_penalty: f32, prompt_len: f32) -> f32 {
        let len = (self.tokens.len() as f32) - prompt_len;
        let lp = if len > 0.0 {
            len.powf(length_penalty)
        } else {
            1.0
        };
        self.score / lp
    }
}

struct FinishedHypotheses {
    hypotheses: Vec<BeamHypothesis>,
    length_penalty: f32,
    prompt_len: f32,
    num_beams: usize,
    worst_score: f32,
}

impl FinishedHypotheses {
    fn new(num_beams: usize, length_penalty: f32, prompt_len: usize) -> Self {
        Self {
            hypotheses: Vec::with_capacity(num_beams),
            length_penalty,
            prompt_len: prompt_len as f32,
            num_beams,
            worst_score: f32::NEG_INFINITY,
        }
    }

    fn score(&self, hypothesis: &BeamHypothesis) -> f32 {
        hypothesis.normalized_score(self.length_penalty, self.prompt_len)
    }

    fn add(&mut self, hypothesis: BeamHypothesis) {
        if hypothesis.score == f32::NEG_INFINITY {
            return;
        }

        let score = self.score(&hypothesis);

        if self.len() < self.num_beams || score > self.worst_score {
            self.hypotheses.push(hypothesis);

            let (length_penalty, prompt_len) = (self.length_penalty, self.prompt_len);
            self.hypotheses.sort_by(|a, b| {
                b.normalized_score(length_penalty, prompt_len)
                    .total_cmp(&a.normalized_score(length_penalty, prompt_len))
            });

            if self.hypotheses.len() > self.num_beams {
                self.hypotheses.truncate(self.num_beams);
            }

            self.worst_score = self
                .hypotheses
                .last()
                .map(|h| self.score(h))
                .unwrap_or(f32::NEG_INFINITY);
        }
    }

    fn len(&self) -> usize {
        self.hypotheses.len()
    }

    fn is_done(&self, early_stopping: bool, best_sum_logprobs: f32, cur_len: usize) -> bool {
        if self.len() < self.num_beams {
            return false;
        }

        if early_stopping {
            return true;
        }

        let best_possible_len = (cur_len as f32) - self.prompt_len;
        let lp = if best_possible_len > 0.0 {
            best_possible_len.powf(self.length_penalty)
        } else {
            1.0
        };

        let highest_attainable_score = best_sum_logprobs / lp;
        self.worst_score >= highest_attainable_score
    }

    fn best(&self) -> Option<&BeamHypothesis> {
        self.hypotheses.first()
    }
}

fn find_best_beams_and_get_candidates(
    logits_2d: &Array2<f32>,
    current_beams: &[BeamHypothesis],
    num_beams: usize,
) -> Vec<(BeamHypothesis, u32, usize)> {
    let mut candidates: Vec<(f32, usize, u32)> = Vec::with_capacity(num_beams * num_beams);

    for (beam_idx, (beam, logits_for_beam)) in
        current_beams.iter().zip(logits_2d.rows()).enumerate()
    {
        if beam.score == f32::NEG_INFINITY {
            continue;
        }

        let log_probs = log_softmax_1d(&logits_for_beam);
        let top_k = get_top_k_from_log_probs(&log_probs, num_beams * 2);

        for (token_id, token_log_prob) in top_k {
            if token_log_prob.is_finite() {
                candidates.push((beam.score + token_log_prob, beam_idx, token_id));
            }
        }
    }

    // stable sort keeps beam order on equal scores
    candidates.sort_by(|a, b| b.0.total_cmp(&a.0));
    candidates.truncate(num_beams * 2);

    candidates
        .into_iter()
        .map(|(new_score, source_beam_idx, new_token_id)| {
            let mut new_tokens = current_beams[source_beam_idx].tokens.clone();
            new_tokens.push(new_token_id);
            (
                BeamHypothesis {
                    tokens: new_tokens,
                    score: new_score,
                },
                new_token_id,
                source_beam_idx,
            )
        })
        .collect()
}

fn suppress_token(row: &mut ArrayViewMut1<f32>, token: u32) {
    if let Some(v) = row.get_mut(token as usize) {
        *v = f32::NEG_INFINITY;
    }
}

/// Beam search over a single conditioning input.
///
/// Greedy decoding is the one-beam case. Generation stops after
/// `config.max_length` tokens, when enough hypotheses finished with EOS, or
/// when every beam died. EOS is suppressed until `config.min_length` tokens
/// exist. The returned tokens exclude the start token and the final EOS, so
/// their count never exceeds `max_length`.
pub fn run_beam_search<S: BeamStepper + ?Sized>(
    stepper: &mut S,
    config: &GenerationConfig,
) -> Result<GeneratedSequence> {
    config.validate()?;

    let (num_beams, length_penalty, early_stopping) = match &config.strategy {
        DecodingStrategy::BeamSearch(params) => (
            params.num_beams,
            params.length_penalty,
            params.early_stopping,
        ),
        DecodingStrategy::Greedy => (1, 1.0, true),
    };

    let start_token_id = stepper.start_token_id();
    let eos_token_id = stepper.eos_token_id();

    let mut beams: Vec<BeamHypothesis> = (0..num_beams)
        .map(|i| BeamHypothesis {
            tokens: vec![start_token_id],
            score: if i == 0 { 0.0 } else { f32::NEG_INFINITY },
        })
        .collect();

    // prompt_len: just the start token
    let prompt_len = 1;
    let mut finished = FinishedHypotheses::new(num_beams, length_penalty, prompt_len);
    let mut stopped_early = false;

    for step in 0..config.max_length {
        let histories: Vec<&[u32]> = beams.iter().map(|b| b.tokens.as_slice()).collect();
        let mut logits_2d = stepper.step(&histories, step)?;

        if logits_2d.nrows() != beams.len() {
            bail!(
                "Decoder step returned {} logit rows for {} beams",
                logits_2d.nrows(),
                beams.len()
            );
        }
        if eos_token_id as usize >= logits_2d.ncols() {
            bail!(
                "EOS token {} is outside the vocabulary of size {}",
                eos_token_id,
                logits_2d.ncols()
            );
        }

        if step < config.min_length {
            for mut row in logits_2d.rows_mut() {
                suppress_token(&mut row, eos_token_id);
            }
        }

        let all_candidates = find_best_beams_and_get_candidates(&logits_2d, &beams, num_beams);

        let mut active_beams = Vec::with_capacity(num_beams);

        for (global_rank, (beam, next_token, _source_idx)) in all_candidates.into_iter().enumerate() {
            if next_token == eos_token_id {
                if global_rank >= num_beams {
                    continue;
                }
                finished.add(beam);
            } else {
                active_beams.push(beam);

                if active_beams.len() == num_beams {
                    break;
                }
            }
        }

        let best_unfinished_score = active_beams
            .first()
            .map(|b| b.score)
            .unwrap_or(f32::NEG_INFINITY);

        // tokens held by a hypothesis after this step, start token included
        let current_len = step + 2;
        if finished.is_done(early_stopping, best_unfinished_score, current_len) {
            stopped_early = true;
            break;
        }

        if active_beams.is_empty() {
            stopped_early = true;
            break;
        }

        // pad if beams died
        while active_beams.len() < num_beams {
            let tokens = active_beams
                .last()
                .map(|b| b.tokens.clone())
                .unwrap_or_else(|| vec![start_token_id]);
            active_beams.push(BeamHypothesis {
                tokens,
                score: f32::NEG_INFINITY,
            });
        }

        beams = active_beams;

        if beams.iter().all(|b| b.score == f32::NEG_INFINITY) {
            break;
        }
    }

    // only add active beams if we didn't early-stop
    if !stopped_early {
        for beam in beams {
            if beam.score != f32::NEG_INFINITY {
                finished.add(beam);
            }
        }
    }

    let best_beam = finished
        .best()
        .ok_or_else(|| anyhow!("no hypotheses found"))?;

    let mut tokens: Vec<u32> = best_beam.tokens.iter().skip(prompt_len).copied().collect();
    if tokens.last() == Some(&eos_token_id) {
        tokens.pop();
    }

    let score = finished.score(best_beam);
    log::debug!(
        "Beam search ({} beams) finished: {} tokens, score {:.4}, early stop: {}",
        num_beams,
        tokens.len(),
        score,
        stopped_early
    );

    Ok(GeneratedSequence { tokens, score })
}
