//! Capture of decoder stage outputs during a forward pass.

use anyhow::anyhow;
use captio_transformers::decoder::{DecoderStage, StageObserver};
use ndarray::{stack, Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::common::{CaptionError, CaptionResult};

/// Latest output of each observed decoder stage, one row per image.
///
/// Entries keep the order in which stages were first recorded. A buffer
/// belongs to the forward pass that produced it; the next pass returns a new
/// one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationBuffer {
    entries: Vec<(DecoderStage, Array2<f32>)>,
}

impl ObservationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `stage`, replacing an earlier value in place.
    pub fn insert(&mut self, stage: DecoderStage, value: Array2<f32>) {
        match self.entries.iter_mut().find(|(s, _)| *s == stage) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((stage, value)),
        }
    }

    pub fn get(&self, stage: DecoderStage) -> Option<&Array2<f32>> {
        self.entries
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, v)| v)
    }

    /// Looks a stage up by its key (`"decoder_out_hidden"`, `"decoder_out_head"`).
    pub fn get_by_key(&self, key: &str) -> Option<&Array2<f32>> {
        self.entries
            .iter()
            .find(|(s, _)| s.key() == key)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, stage: DecoderStage) -> bool {
        self.get(stage).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = DecoderStage> + '_ {
        self.entries.iter().map(|(s, _)| *s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DecoderStage, &Array2<f32>)> + '_ {
        self.entries.iter().map(|(s, v)| (*s, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for ObservationBuffer {
    type Item = (DecoderStage, Array2<f32>);
    type IntoIter = std::vec::IntoIter<(DecoderStage, Array2<f32>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Observer handed to the decoder for one forward pass.
///
/// For every image and stage it keeps row 0 of the most recent output, the
/// top-ranked hypothesis at the final decoding step.
pub(crate) struct StageRecorder {
    stages: Vec<DecoderStage>,
    latest: Vec<Vec<Option<Array1<f32>>>>, // [stage][sample]
    stray_sample: Option<usize>,
}

impl StageRecorder {
    pub(crate) fn new(stages: &[DecoderStage], batch: usize) -> Self {
        Self {
            stages: stages.to_vec(),
            latest: vec![vec![None; batch]; stages.len()],
            stray_sample: None,
        }
    }

    /// Stacks the captured rows into one `[batch, dim]` tensor per stage.
    pub(crate) fn finish(self) -> CaptionResult<ObservationBuffer> {
        if let Some(sample) = self.stray_sample {
            return Err(CaptionError::Decoder(anyhow!(
                "decoder reported an observation for image {} outside a batch of {}",
                sample,
                self.latest.first().map_or(0, Vec::len)
            )));
        }

        let mut buffer = ObservationBuffer::new();
        for (stage, rows) in self.stages.into_iter().zip(self.latest) {
            let mut views: Vec<ArrayView1<f32>> = Vec::with_capacity(rows.len());
            for (sample, row) in rows.iter().enumerate() {
                let row = row.as_ref().ok_or_else(|| {
                    CaptionError::Decoder(anyhow!(
                        "stage '{}' was not observed for image {}",
                        stage,
                        sample
                    ))
                })?;
                views.push(row.view());
            }
            let stacked = stack(Axis(0), &views).map_err(|e| {
                CaptionError::Decoder(anyhow!(
                    "stage '{}' produced rows of differing width: {}",
                    stage,
                    e
                ))
            })?;
            buffer.insert(stage, stacked);
        }
        Ok(buffer)
    }
}

impl StageObserver for StageRecorder {
    fn observe(&mut self, sample: usize, stage: DecoderStage, output: ArrayView2<'_, f32>) {
        let Some(stage_idx) = self.stages.iter().position(|s| *s == stage) else {
            return;
        };
        let slots = &mut self.latest[stage_idx];
        if sample >= slots.len() {
            self.stray_sample = Some(sample);
            return;
        }
        if let Some(top) = output.rows().into_iter().next() {
            slots[sample] = Some(top.to_owned());
        }
    }
}
