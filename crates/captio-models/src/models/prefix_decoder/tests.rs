use anyhow::Result;
use approx::assert_abs_diff_eq;
use captio_transformers::common::GenerationConfig;
use captio_transformers::decoder::{CaptionDecoder, DecoderStage, NoopObserver, StageObserver};
use ndarray::{Array2, ArrayView2};

use super::{PrefixDecoder, PrefixDecoderConfig};

fn small_config() -> PrefixDecoderConfig {
    PrefixDecoderConfig {
        vocab_size: 16,
        hidden_size: 8,
        max_positions: 12,
        ..Default::default()
    }
}

fn conditioning(batch: usize, hidden: usize) -> Array2<f32> {
    Array2::from_shape_fn((batch, hidden), |(b, h)| ((b + 1) as f32 * 0.3 + h as f32 * 0.1).sin())
}

/// Keeps every observation in arrival order.
#[derive(Default)]
struct Recording {
    calls: Vec<(usize, DecoderStage, Array2<f32>)>,
}

impl StageObserver for Recording {
    fn observe(&mut self, sample: usize, stage: DecoderStage, output: ArrayView2<'_, f32>) {
        self.calls.push((sample, stage, output.to_owned()));
    }
}

#[test]
fn test_generates_one_bounded_sequence_per_row() -> Result<()> {
    let decoder = PrefixDecoder::new(small_config())?;
    let config = GenerationConfig::beam_search(10, 3);
    let out = decoder.generate(&conditioning(3, 8).view(), &config, &mut NoopObserver)?;

    assert_eq!(out.len(), 3);
    for seq in &out {
        assert!(seq.len() <= 10);
        assert!(seq.tokens.iter().all(|&t| (t as usize) < 16));
    }
    Ok(())
}

#[test]
fn test_observer_sees_both_stages_in_order() -> Result<()> {
    let decoder = PrefixDecoder::new(small_config())?;
    let mut recording = Recording::default();
    decoder.generate(
        &conditioning(2, 8).view(),
        &GenerationConfig::beam_search(4, 2),
        &mut recording,
    )?;

    assert!(!recording.calls.is_empty());
    for pair in recording.calls.chunks(2) {
        assert_eq!(pair[0].1, DecoderStage::Transformer);
        assert_eq!(pair[1].1, DecoderStage::LmHead);
        assert_eq!(pair[0].0, pair[1].0);
        assert_eq!(pair[0].2.shape(), &[2, 8]);
        assert_eq!(pair[1].2.shape(), &[2, 16]);
    }
    // samples are decoded in order
    let samples: Vec<usize> = recording.calls.iter().map(|c| c.0).collect();
    assert!(samples.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(samples.last(), Some(&1));
    Ok(())
}

#[test]
fn test_head_is_tied_to_token_embedding() -> Result<()> {
    let decoder = PrefixDecoder::new(small_config())?;
    let mut recording = Recording::default();
    decoder.generate(
        &conditioning(1, 8).view(),
        &GenerationConfig::greedy(1),
        &mut recording,
    )?;

    let hidden = &recording.calls[0].2;
    let logits = &recording.calls[1].2;
    let weight = decoder.lm_head().weight();
    assert_eq!(weight.shape(), &[16, 8]);
    assert!(decoder.lm_head().bias().is_none());

    let expected = hidden.dot(&weight.t());
    for (a, b) in logits.iter().zip(expected.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-5);
    }
    Ok(())
}

#[test]
fn test_generation_is_deterministic() -> Result<()> {
    let cond = conditioning(2, 8);
    let config = GenerationConfig::beam_search(8, 4);

    let a = PrefixDecoder::new(small_config())?;
    let b = PrefixDecoder::new(small_config())?;
    let mut rec_a = Recording::default();
    let mut rec_b = Recording::default();
    let out_a = a.generate(&cond.view(), &config, &mut rec_a)?;
    let out_b = b.generate(&cond.view(), &config, &mut rec_b)?;

    assert_eq!(out_a, out_b);
    assert_eq!(rec_a.calls.len(), rec_b.calls.len());
    for (x, y) in rec_a.calls.iter().zip(&rec_b.calls) {
        assert_eq!(x, y);
    }
    Ok(())
}

#[test]
fn test_rejects_wrong_conditioning_width() -> Result<()> {
    let decoder = PrefixDecoder::new(small_config())?;
    let err = decoder
        .generate(
            &conditioning(1, 5).view(),
            &GenerationConfig::greedy(3),
            &mut NoopObserver,
        )
        .unwrap_err();
    assert!(err.to_string().contains("width 8, got 5"));
    Ok(())
}

#[test]
fn test_rejects_max_length_beyond_positions() -> Result<()> {
    let decoder = PrefixDecoder::new(small_config())?;
    let result = decoder.generate(
        &conditioning(1, 8).view(),
        &GenerationConfig::greedy(13),
        &mut NoopObserver,
    );
    assert!(result.is_err());
    Ok(())
}

#[test]
fn test_empty_batch_generates_nothing() -> Result<()> {
    let decoder = PrefixDecoder::new(small_config())?;
    let mut recording = Recording::default();
    let out = decoder.generate(
        &Array2::<f32>::zeros((0, 8)).view(),
        &GenerationConfig::beam_search(5, 2),
        &mut recording,
    )?;
    assert!(out.is_empty());
    assert!(recording.calls.is_empty());
    Ok(())
}

#[test]
fn test_invalid_configs_rejected() {
    let same_ids = PrefixDecoderConfig {
        eos_token_id: 0,
        ..small_config()
    };
    assert!(PrefixDecoder::new(same_ids).is_err());

    let eos_outside = PrefixDecoderConfig {
        eos_token_id: 16,
        ..small_config()
    };
    assert!(PrefixDecoder::new(eos_outside).is_err());
}

#[test]
fn test_exposes_both_observation_points() -> Result<()> {
    let decoder = PrefixDecoder::new(small_config())?;
    assert_eq!(
        decoder.observation_points(),
        &[DecoderStage::Transformer, DecoderStage::LmHead]
    );
    assert_eq!(decoder.hidden_size(), 8);
    assert_eq!(decoder.vocab_size(), 16);
    assert_eq!(decoder.max_output_length(), Some(12));
    Ok(())
}
