// ============================================================
// Layer 4: Sliding Window Preprocessor
// ============================================================
// Turns one long series of T frames into supervised samples
// for sequence-to-sequence forecasting.
//
// A frame is one time step of any shape (a scalar, a vector
// of sensor readings, a node x feature grid, ...). The series
// is stored flat in row-major order: frame t occupies
//   data[t * frame_size .. (t + 1) * frame_size]
//
// Windowing with input_window = 3, output_window = 2:
//
//   frames:   f0 f1 f2 f3 f4 f5 f6 ...
//   sample 0: [f0 f1 f2] → [f3 f4]
//   sample 1: [f1 f2 f3] → [f4 f5]
//   sample 2: [f2 f3 f4] → [f5 f6]
//
// The start index slides forward by one frame, giving
//   N = T - input_window - output_window
// samples in chronological order. The first
//   floor(N * (train_rate + eval_rate))
// samples form the training split and the rest the test
// split. eval_rate only moves that boundary; no separate
// evaluation split is produced.

use burn::prelude::*;
use burn::tensor::TensorData;
use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, Result};
use crate::infra::config::PipelineConfig;

// ─── Configuration ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Fraction of samples used for training
    pub train_rate:    f64,
    /// Extra fraction folded into the training split
    pub eval_rate:     f64,
    /// Frames per input sample
    pub input_window:  usize,
    /// Frames per target sample
    pub output_window: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            train_rate:    0.7,
            eval_rate:     0.1,
            input_window:  12,
            output_window: 3,
        }
    }
}

impl WindowConfig {
    /// Read `train_rate`, `eval_rate`, `input_window` and `output_window`,
    /// falling back to the defaults for absent keys.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            train_rate:    config.get_f64_or("train_rate", d.train_rate)?,
            eval_rate:     config.get_f64_or("eval_rate", d.eval_rate)?,
            input_window:  config.get_usize_or("input_window", d.input_window)?,
            output_window: config.get_usize_or("output_window", d.output_window)?,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.input_window == 0 || self.output_window == 0 {
            return Err(PipelineError::invalid(format!(
                "input_window and output_window must be positive, got {} and {}",
                self.input_window, self.output_window,
            )));
        }
        let rate = self.train_rate + self.eval_rate;
        if !(self.train_rate >= 0.0 && self.eval_rate >= 0.0 && rate <= 1.0) {
            return Err(PipelineError::invalid(format!(
                "train_rate ({}) and eval_rate ({}) must be non-negative and sum to at most 1",
                self.train_rate, self.eval_rate,
            )));
        }
        Ok(())
    }
}

// ─── FrameSeries ──────────────────────────────────────────────────────────────
/// T frames of identical shape, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSeries {
    frame_shape: Vec<usize>,
    data:        Vec<f32>,
}

impl FrameSeries {
    /// `frame_shape` is the shape of one frame; an empty shape means
    /// scalar frames. `data.len()` must be a multiple of the frame size.
    pub fn new(frame_shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let frame_size: usize = frame_shape.iter().product();
        if frame_size == 0 {
            return Err(PipelineError::invalid(format!(
                "frame shape {frame_shape:?} has no elements"
            )));
        }
        if data.len() % frame_size != 0 {
            return Err(PipelineError::invalid(format!(
                "{} values do not divide into frames of shape {:?}",
                data.len(),
                frame_shape,
            )));
        }
        Ok(Self { frame_shape, data })
    }

    /// Scalar series, one value per frame.
    pub fn from_scalars(values: Vec<f32>) -> Self {
        Self { frame_shape: Vec::new(), data: values }
    }

    /// Take a tensor whose first dimension is time.
    pub fn from_tensor<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Self> {
        let dims = tensor.dims();
        let data = tensor
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| PipelineError::Tensor(format!("{e:?}")))?;
        Self::new(dims[1..].to_vec(), data)
    }

    pub fn frame_shape(&self) -> &[usize] { &self.frame_shape }

    pub fn frame_size(&self) -> usize { self.frame_shape.iter().product() }

    /// Number of frames T.
    pub fn len(&self) -> usize { self.data.len() / self.frame_size() }

    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    /// Frames `[start, end)` as one flat slice.
    fn frames(&self, start: usize, end: usize) -> &[f32] {
        let fs = self.frame_size();
        &self.data[start * fs..end * fs]
    }
}

// ─── WindowArray ──────────────────────────────────────────────────────────────
/// A stack of samples: shape `(samples, window, ...frame)`, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowArray {
    shape: Vec<usize>,
    data:  Vec<f32>,
}

impl WindowArray {
    fn empty(window: usize, frame_shape: &[usize]) -> Self {
        let mut shape = vec![0, window];
        shape.extend_from_slice(frame_shape);
        Self { shape, data: Vec::new() }
    }

    fn push(&mut self, sample: &[f32]) {
        self.data.extend_from_slice(sample);
        self.shape[0] += 1;
    }

    /// Samples `[start, end)` as a new array.
    fn slice(&self, start: usize, end: usize) -> Self {
        let ss = self.sample_size();
        let mut shape = self.shape.clone();
        shape[0] = end - start;
        Self { shape, data: self.data[start * ss..end * ss].to_vec() }
    }

    pub fn shape(&self) -> &[usize] { &self.shape }

    pub fn data(&self) -> &[f32] { &self.data }

    pub fn sample_count(&self) -> usize { self.shape[0] }

    /// Number of values in one sample.
    pub fn sample_size(&self) -> usize { self.shape[1..].iter().product() }

    pub fn sample(&self, index: usize) -> Option<&[f32]> {
        let ss = self.sample_size();
        (index < self.sample_count()).then(|| &self.data[index * ss..(index + 1) * ss])
    }

    /// Copy into a burn tensor of rank `D`, which must equal `shape().len()`.
    pub fn to_tensor<B: Backend, const D: usize>(&self, device: &B::Device) -> Result<Tensor<B, D>> {
        if self.shape.len() != D {
            return Err(PipelineError::invalid(format!(
                "window array has rank {} but a rank {D} tensor was requested",
                self.shape.len(),
            )));
        }
        let data = TensorData::new(self.data.clone(), self.shape.clone());
        Ok(Tensor::<B, D>::from_data(data, device))
    }
}

/// Train/test windows produced by [`preprocess_data`].
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedSamples {
    pub train_x: WindowArray,
    pub train_y: WindowArray,
    pub test_x:  WindowArray,
    pub test_y:  WindowArray,
}

/// Slide a window over `series` and split the samples into train/test.
///
/// Fails with `InvalidInput` when the series is too short to give
/// a single sample (`input_window + output_window >= T`).
pub fn preprocess_data(series: &FrameSeries, config: &WindowConfig) -> Result<WindowedSamples> {
    config.validate()?;

    let t      = series.len();
    let span   = config.input_window + config.output_window;
    if span >= t {
        return Err(PipelineError::invalid(format!(
            "series of {t} frames is too short for input_window={} + output_window={}",
            config.input_window, config.output_window,
        )));
    }
    let n = t - span;

    let mut x = WindowArray::empty(config.input_window, series.frame_shape());
    let mut y = WindowArray::empty(config.output_window, series.frame_shape());

    for i in 0..n {
        let split = i + config.input_window;
        x.push(series.frames(i, split));
        y.push(series.frames(split, i + span));
    }

    let train_size = (n as f64 * (config.train_rate + config.eval_rate)).floor() as usize;
    let train_size = train_size.min(n);

    tracing::debug!(
        "Windowed {} frames into {} samples: {} train, {} test (x {:?}, y {:?})",
        t,
        n,
        train_size,
        n - train_size,
        x.shape(),
        y.shape(),
    );

    Ok(WindowedSamples {
        train_x: x.slice(0, train_size),
        train_y: y.slice(0, train_size),
        test_x:  x.slice(train_size, n),
        test_y:  y.slice(train_size, n),
    })
}
