use edgetrack_tensor::TensorView;

/// Anchor boxes per output scale.
pub const NUM_ANCHORS: usize = 3;

const NUM_CENTERS: usize = 2;
const NUM_SCALES: usize = 2;
const NUM_CONF: usize = 1;
const CONF_CHANNEL_OFFSET: usize = NUM_CENTERS + NUM_SCALES;
const CLASS_CHANNEL_OFFSET: usize = CONF_CHANNEL_OFFSET + NUM_CONF;

/// Sigmoid guarded against overflow for large-magnitude logits. NaN inputs
/// propagate to NaN so they are caught at detection construction; exp_raw
/// would otherwise flush NaN to a finite value.
#[inline(always)]
pub fn stable_sigmoid(x: f32) -> f32 {
    if x.is_nan() {
        x
    } else if x.abs() > 80.0 {
        x.signum() * 0.5 + 0.5
    } else {
        // exp_raw is only valid for -88 < x < 88
        1.0 / (1.0 + fast_math::exp_raw(-x))
    }
}

/// Primitive decode capability of one output tensor. One implementation per
/// model architecture; adding an architecture adds an implementation.
pub trait OutputLayer {
    fn grid_width(&self) -> usize;

    fn grid_height(&self) -> usize;

    fn num_classes(&self) -> usize;

    /// Box confidence at a grid cell/anchor, in [0, 1] once the configured
    /// activation is applied.
    fn confidence(&self, row: usize, col: usize, anchor: usize) -> f32;

    /// Argmax class id and its (dequantized, optionally activated)
    /// confidence at a grid cell/anchor.
    fn class(&self, row: usize, col: usize, anchor: usize) -> (usize, f32);

    /// Normalized box center (x, y) at a grid cell/anchor.
    fn center(&self, row: usize, col: usize, anchor: usize) -> (f32, f32);

    /// Normalized box (width, height) at a grid cell/anchor against the
    /// anchor geometry and image dimensions.
    fn shape(
        &self,
        row: usize,
        col: usize,
        anchor: usize,
        image_width: usize,
        image_height: usize,
    ) -> (f32, f32);
}

/// Anchor-based output layer with per-anchor channel layout
/// `[cx, cy, w, h, conf, class 1, class 2, ...]`.
pub struct AnchorLayer<'a> {
    tensor: TensorView<'a>,
    anchors: [[f32; 2]; NUM_ANCHORS],
    channels_per_anchor: usize,
    apply_sigmoid: bool,
    label_offset: usize,
}

impl<'a> AnchorLayer<'a> {
    pub fn new(
        tensor: TensorView<'a>,
        anchors: [[f32; 2]; NUM_ANCHORS],
        apply_sigmoid: bool,
        label_offset: usize,
    ) -> Self {
        Self {
            tensor,
            anchors,
            channels_per_anchor: tensor.channels() / NUM_ANCHORS,
            apply_sigmoid,
            label_offset,
        }
    }

    #[inline(always)]
    fn activated(&self, value: f32) -> f32 {
        if self.apply_sigmoid {
            stable_sigmoid(value)
        } else {
            value
        }
    }

    /// Raw quantized class score. Class ids start at 1; id 0 is the
    /// background entry of the label table and has no channel.
    #[inline(always)]
    fn class_raw(&self, row: usize, col: usize, anchor: usize, class_id: usize) -> u32 {
        let channel = self.channels_per_anchor * anchor + CLASS_CHANNEL_OFFSET + class_id - 1;
        self.tensor.raw(row, col, channel)
    }
}

impl OutputLayer for AnchorLayer<'_> {
    fn grid_width(&self) -> usize {
        self.tensor.cols()
    }

    fn grid_height(&self) -> usize {
        self.tensor.rows()
    }

    fn num_classes(&self) -> usize {
        self.channels_per_anchor - CLASS_CHANNEL_OFFSET
    }

    fn confidence(&self, row: usize, col: usize, anchor: usize) -> f32 {
        let channel = self.channels_per_anchor * anchor + CONF_CHANNEL_OFFSET;
        self.activated(self.tensor.dequantized(row, col, channel))
    }

    fn class(&self, row: usize, col: usize, anchor: usize) -> (usize, f32) {
        // Argmax over raw quantized scores; strict > keeps the lowest class
        // id on ties.
        let mut selected = self.label_offset;
        let mut raw_max = 0u32;
        for class_id in self.label_offset..=self.num_classes() {
            let raw = self.class_raw(row, col, anchor, class_id);
            if raw > raw_max {
                selected = class_id;
                raw_max = raw;
            }
        }
        let conf = self.activated(self.tensor.quantization().dequantize(raw_max));
        (selected, conf)
    }

    fn center(&self, row: usize, col: usize, anchor: usize) -> (f32, f32) {
        let channel = self.channels_per_anchor * anchor;
        let x = (self.tensor.dequantized(row, col, channel) * 2.0 - 0.5 + col as f32)
            / self.grid_width() as f32;
        let y = (self.tensor.dequantized(row, col, channel + 1) * 2.0 - 0.5 + row as f32)
            / self.grid_height() as f32;
        (x, y)
    }

    fn shape(
        &self,
        row: usize,
        col: usize,
        anchor: usize,
        image_width: usize,
        image_height: usize,
    ) -> (f32, f32) {
        let channel = self.channels_per_anchor * anchor + NUM_CENTERS;
        let w = (2.0 * self.tensor.dequantized(row, col, channel)).powi(2)
            * self.anchors[anchor][0]
            / image_width as f32;
        let h = (2.0 * self.tensor.dequantized(row, col, channel + 1)).powi(2)
            * self.anchors[anchor][1]
            / image_height as f32;
        (w, h)
    }
}
