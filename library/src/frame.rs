use crate::error::NodeError;

/// A single image frame in row-major H×W×C layout, f32 values in [0, 1].
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub data: Vec<f32>,
}

impl Frame {
    pub fn new(width: u32, height: u32, channels: u32, data: Vec<f32>) -> Result<Self, NodeError> {
        let expected = (width as usize) * (height as usize) * (channels as usize);
        if data.len() != expected {
            return Err(NodeError::InvalidArgument(format!(
                "Frame buffer holds {} values, expected {} for shape {}x{}x{}",
                data.len(),
                expected,
                height,
                width,
                channels,
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }
}

/// An ordered batch of frames sharing one height/width/channel layout.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameBatch {
    frames: Vec<Frame>,
}

impl FrameBatch {
    /// Build a batch, rejecting frames whose shape differs from the first.
    pub fn new(frames: Vec<Frame>) -> Result<Self, NodeError> {
        if let Some(first) = frames.first() {
            let layout = (first.height, first.width, first.channels);
            for (index, frame) in frames.iter().enumerate() {
                if (frame.height, frame.width, frame.channels) != layout {
                    return Err(NodeError::InvalidArgument(format!(
                        "Frame {} has shape {}x{}x{}, expected {}x{}x{}",
                        index,
                        frame.height,
                        frame.width,
                        frame.channels,
                        layout.0,
                        layout.1,
                        layout.2,
                    )));
                }
            }
        }
        Ok(Self { frames })
    }

    pub fn empty() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Shape as (batch, height, width, channels); all zero for an empty batch.
    pub fn shape(&self) -> (usize, u32, u32, u32) {
        match self.frames.first() {
            Some(first) => (self.frames.len(), first.height, first.width, first.channels),
            None => (0, 0, 0, 0),
        }
    }

    /// Sub-batch containing the frames at the given indices, in the order
    /// provided. Out-of-range indices are skipped.
    pub fn gather(&self, indices: &[usize]) -> FrameBatch {
        let frames = indices
            .iter()
            .filter_map(|&index| self.frames.get(index).cloned())
            .collect();
        FrameBatch { frames }
    }

    /// Up to `limit` values from the flattened batch content, frame order.
    pub fn flat_sample(&self, limit: usize) -> Vec<f32> {
        let mut sample = Vec::with_capacity(limit.min(64));
        for frame in &self.frames {
            if sample.len() >= limit {
                break;
            }
            let remaining = limit - sample.len();
            sample.extend_from_slice(&frame.data[..frame.data.len().min(remaining)]);
        }
        sample
    }
}
