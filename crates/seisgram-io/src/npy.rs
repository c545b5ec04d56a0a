//! `[N, F, T]` corpus arrays in NumPy `.npy` format (float64, C order).

use crate::{Error, Result};
use ndarray::{Array2, Array3, Axis};
use ndarray_npy::{ReadNpyExt, WriteNpyExt};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Stack `(F, T)` instances along a new leading axis.
///
/// Every instance must have `shape`; zero instances give a `[0, F, T]` array.
pub fn stack_instances<'a>(
    instances: impl IntoIterator<Item = &'a Array2<f64>>,
    shape: (usize, usize),
) -> Result<Array3<f64>> {
    let instances: Vec<&Array2<f64>> = instances.into_iter().collect();
    let mut corpus = Array3::<f64>::zeros((instances.len(), shape.0, shape.1));

    for (mut slot, instance) in corpus.axis_iter_mut(Axis(0)).zip(instances) {
        if instance.dim() != shape {
            return Err(Error::ShapeMismatch {
                expected: shape,
                found: instance.dim(),
            });
        }
        slot.assign(instance);
    }

    Ok(corpus)
}

/// Write a corpus, replacing `path` atomically.
pub fn write_corpus(path: &Path, corpus: &Array3<f64>) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        corpus.write_npy(&mut writer)?;
        writer.into_inner().map_err(|e| e.into_error())?;
    }
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Read a corpus written by [`write_corpus`] (or NumPy).
pub fn read_corpus(path: &Path) -> Result<Array3<f64>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(Array3::<f64>::read_npy(reader)?)
}
