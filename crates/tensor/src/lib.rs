//! Read-only views over quantized model output tensors.

pub use error::{Error, Result};

use ndarray::ArrayView3;
use num_traits::AsPrimitive;

mod error;

/// Fixed downsampling factor between the smallest output grid and the model
/// input image. A 20x20 grid decodes against a 640x640 input.
pub const GRID_STRIDE: usize = 32;

/// Dequantization metadata for a quantized tensor: a stored integer `v` maps
/// to `scale * (v - zero_point)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantization {
    pub scale: f32,
    pub zero_point: i32,
}

impl Quantization {
    pub fn new(scale: f32, zero_point: i32) -> Self {
        Self { scale, zero_point }
    }

    #[inline(always)]
    pub fn dequantize<T: AsPrimitive<f32>>(&self, value: T) -> f32 {
        self.scale * (value.as_() - self.zero_point as f32)
    }
}

impl Default for Quantization {
    fn default() -> Self {
        Self {
            scale: 1.0,
            zero_point: 0,
        }
    }
}

impl<S, Z> From<(S, Z)> for Quantization
where
    S: AsPrimitive<f32>,
    Z: AsPrimitive<i32>,
{
    fn from((scale, zp): (S, Z)) -> Quantization {
        Self {
            scale: scale.as_(),
            zero_point: zp.as_(),
        }
    }
}

/// Element storage for one output tensor. Accelerator output streams are
/// either 8-bit or 16-bit unsigned.
#[derive(Debug, Clone, Copy)]
pub enum TensorData<'a> {
    UInt8(ArrayView3<'a, u8>),
    UInt16(ArrayView3<'a, u16>),
}

/// Read-only typed view over one quantized output tensor with shape
/// (rows, cols, channels). The backing buffer is owned by the frame; the view
/// never outlives one decode pass.
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a> {
    data: TensorData<'a>,
    quant: Quantization,
}

impl<'a> TensorView<'a> {
    pub fn from_slice_u8(
        data: &'a [u8],
        shape: (usize, usize, usize),
        quant: Quantization,
    ) -> Result<Self> {
        let view = ArrayView3::from_shape(shape, data).map_err(|_| Error::ShapeVolumeMismatch {
            expected: shape.0 * shape.1 * shape.2,
            actual: data.len(),
        })?;
        Ok(Self {
            data: TensorData::UInt8(view),
            quant,
        })
    }

    pub fn from_slice_u16(
        data: &'a [u16],
        shape: (usize, usize, usize),
        quant: Quantization,
    ) -> Result<Self> {
        let view = ArrayView3::from_shape(shape, data).map_err(|_| Error::ShapeVolumeMismatch {
            expected: shape.0 * shape.1 * shape.2,
            actual: data.len(),
        })?;
        Ok(Self {
            data: TensorData::UInt16(view),
            quant,
        })
    }

    pub fn quantization(&self) -> Quantization {
        self.quant
    }

    pub fn rows(&self) -> usize {
        match &self.data {
            TensorData::UInt8(v) => v.shape()[0],
            TensorData::UInt16(v) => v.shape()[0],
        }
    }

    pub fn cols(&self) -> usize {
        match &self.data {
            TensorData::UInt8(v) => v.shape()[1],
            TensorData::UInt16(v) => v.shape()[1],
        }
    }

    pub fn channels(&self) -> usize {
        match &self.data {
            TensorData::UInt8(v) => v.shape()[2],
            TensorData::UInt16(v) => v.shape()[2],
        }
    }

    pub fn len(&self) -> usize {
        self.rows() * self.cols() * self.channels()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw quantized value at (row, col, channel), widened to u32 so 8-bit
    /// and 16-bit tensors compare uniformly.
    #[inline(always)]
    pub fn raw(&self, row: usize, col: usize, channel: usize) -> u32 {
        match &self.data {
            TensorData::UInt8(v) => v[[row, col, channel]] as u32,
            TensorData::UInt16(v) => v[[row, col, channel]] as u32,
        }
    }

    /// Dequantized value at (row, col, channel).
    #[inline(always)]
    pub fn dequantized(&self, row: usize, col: usize, channel: usize) -> f32 {
        self.quant.dequantize(self.raw(row, col, channel))
    }

    /// Image dimensions implied by this grid under the fixed stride factor,
    /// as (width, height).
    pub fn image_extent(&self) -> (usize, usize) {
        (self.cols() * GRID_STRIDE, self.rows() * GRID_STRIDE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dequantize_u8() {
        let quant = Quantization::new(0.25, 4);
        assert_eq!(quant.dequantize(4u8), 0.0);
        assert_eq!(quant.dequantize(8u8), 1.0);
        assert_eq!(quant.dequantize(0u8), -1.0);
    }

    #[test]
    fn test_view_indexing() {
        let data: Vec<u8> = (0..24).collect();
        let view = TensorView::from_slice_u8(&data, (2, 3, 4), Quantization::default()).unwrap();
        assert_eq!(view.rows(), 2);
        assert_eq!(view.cols(), 3);
        assert_eq!(view.channels(), 4);
        assert_eq!(view.raw(0, 0, 0), 0);
        assert_eq!(view.raw(1, 2, 3), 23);
        assert_eq!(view.raw(0, 1, 2), 6);
    }

    #[test]
    fn test_view_u16() {
        let data: Vec<u16> = vec![300, 500, 700, 900];
        let quant = Quantization::new(0.01, 100);
        let view = TensorView::from_slice_u16(&data, (1, 2, 2), quant).unwrap();
        assert_eq!(view.raw(0, 1, 1), 900);
        assert!((view.dequantized(0, 0, 0) - 2.0).abs() < 1e-6);
        assert!((view.dequantized(0, 1, 1) - 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_shape_mismatch() {
        let data = vec![0u8; 10];
        let err = TensorView::from_slice_u8(&data, (2, 3, 4), Quantization::default());
        assert!(matches!(
            err,
            Err(Error::ShapeVolumeMismatch {
                expected: 24,
                actual: 10
            })
        ));
    }

    #[test]
    fn test_image_extent() {
        let data = vec![0u8; 20 * 20 * 18];
        let view =
            TensorView::from_slice_u8(&data, (20, 20, 18), Quantization::default()).unwrap();
        assert_eq!(view.image_extent(), (640, 640));
    }
}
