/// Dense `batch × channels × length` activations, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor3 {
    pub batch: usize,
    pub channels: usize,
    pub len: usize,
    pub data: Vec<f64>,
}

impl Tensor3 {
    pub fn zeros(batch: usize, channels: usize, len: usize) -> Self {
        Self {
            batch,
            channels,
            len,
            data: vec![0.0; batch * channels * len],
        }
    }

    /// Single-channel batch from equally long rows.
    pub fn from_rows(rows: &[&[f64]]) -> Self {
        let len = rows.first().map_or(0, |r| r.len());
        let mut data = Vec::with_capacity(rows.len() * len);
        for r in rows {
            debug_assert_eq!(r.len(), len);
            data.extend_from_slice(r);
        }
        Self {
            batch: rows.len(),
            channels: 1,
            len,
            data,
        }
    }

    /// Offset of `(b, c, 0)` in `data`.
    #[inline]
    pub fn offset(&self, b: usize, c: usize) -> usize {
        (b * self.channels + c) * self.len
    }

    #[inline]
    pub fn at(&self, b: usize, c: usize, t: usize) -> f64 {
        self.data[self.offset(b, c) + t]
    }

    pub fn same_shape(&self) -> Self {
        Self::zeros(self.batch, self.channels, self.len)
    }
}
