//! Ingesting whole pixel blocks.

use smallvec::SmallVec;
use tracing::debug;

use crate::error::{Error, Result};
use crate::{LayerValue, RatTree, RowId, NODATA_ROW};

impl<T: LayerValue> RatTree<T> {
    /// Assigns a row to every pixel of a band-sequential block.
    ///
    /// `layers[l][p]` is the value of layer `l` at pixel `p`; every layer
    /// must cover the same pixels. A pixel where any layer equals that
    /// layer's `nodata` value gets [`NODATA_ROW`] and is neither inserted nor
    /// counted. The returned ids line up with the pixels.
    ///
    /// Shape errors are reported before any pixel is touched. If an insert
    /// fails partway through, the pixels before it stay inserted and counted
    /// in the histogram, but their row ids are not returned.
    pub fn insert_block(&mut self, layers: &[&[T]], nodata: &[T]) -> Result<Vec<RowId>> {
        if nodata.len() != layers.len() {
            return Err(Error::NodataCount {
                expected: layers.len(),
                got: nodata.len(),
            });
        }
        self.check_depth(layers.len())?;

        let npixels = layers[0].len();
        for (layer, values) in layers.iter().enumerate() {
            if values.len() != npixels {
                return Err(Error::LayerLength {
                    layer,
                    expected: npixels,
                    got: values.len(),
                });
            }
        }

        let mut out = Vec::new();
        out.try_reserve_exact(npixels)?;
        let mut tuple: SmallVec<[T; 16]> = SmallVec::with_capacity(layers.len());
        let mut skipped = 0usize;

        'pixels: for px in 0..npixels {
            tuple.clear();
            for (values, &nd) in layers.iter().zip(nodata) {
                let value = values[px];
                if value == nd {
                    out.push(NODATA_ROW);
                    skipped += 1;
                    continue 'pixels;
                }
                tuple.push(value);
            }
            out.push(self.insert_or_lookup(&tuple)?);
        }

        debug!(
            pixels = npixels,
            nodata_pixels = skipped,
            rows = self.len(),
            "ingested block"
        );
        Ok(out)
    }
}
