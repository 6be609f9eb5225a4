// ============================================================
// Layer 4: Bundle Loader
// ============================================================
// Loads the cached embedding bundle from a NumPy .npz archive
// using the npyz crate.
//
// How .npz files work:
//   An .npz file is a ZIP archive holding one .npy file per
//   array. Each .npy carries a small header (dtype, shape,
//   memory order) followed by the raw values.
//
// Accepted dtypes:
//   *_data    float32 or float64, 2-D, C order
//   *_target  any signed/unsigned integer width, 1-D
//   labels    byte or unicode strings (or integers), optional
//
// Reference: npyz crate documentation (npz feature)

use std::{
    io::{Read, Seek},
    path::PathBuf,
};

use anyhow::{Context, Result};
use npyz::{npz::NpzArchive, DType, NpyFile, Order, TypeChar, TypeStr};

use crate::data::bundle::{ArrayBundle, SplitData};
use crate::domain::{error::DataError, split::Split};

const LABELS_KEY: &str = "labels";

/// Reads an [`ArrayBundle`] from an .npz archive on disk.
pub struct NpzLoader {
    path: PathBuf,
}

impl NpzLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Open the archive and read all five arrays.
    pub fn load(&self) -> Result<ArrayBundle> {
        let mut npz = NpzArchive::open(&self.path).with_context(|| {
            format!(
                "Cannot open embedding bundle '{}'. Generate the embeddings first.",
                self.path.display()
            )
        })?;
        let bundle = read_bundle(&mut npz)
            .with_context(|| format!("Invalid embedding bundle '{}'", self.path.display()))?;

        tracing::info!(
            "Loaded bundle '{}': {} train / {} test samples, dim={}, classes={}",
            self.path.display(),
            bundle.train().len(),
            bundle.test().len(),
            bundle.embedding_dim(),
            bundle.num_classes()
        );
        Ok(bundle)
    }
}

/// Read a bundle from any seekable .npz stream.
pub fn read_bundle<R: Read + Seek>(npz: &mut NpzArchive<R>) -> Result<ArrayBundle> {
    let train  = read_split(npz, Split::Train)?;
    let test   = read_split(npz, Split::Test)?;
    let labels = read_labels(npz)?;
    Ok(ArrayBundle::new(train, test, labels)?)
}

fn read_split<R: Read + Seek>(npz: &mut NpzArchive<R>, split: Split) -> Result<SplitData> {
    let data_key   = split.data_key();
    let target_key = split.target_key();

    let (features, rows, cols) = read_matrix(npz, &data_key)?;
    let targets = read_targets(npz, &target_key)?;

    if targets.len() != rows {
        return Err(DataError::ShapeMismatch(format!(
            "{target_key} has {} entries but {data_key} has {rows} rows",
            targets.len()
        ))
        .into());
    }

    tracing::debug!("Read {}: {} x {}", data_key, rows, cols);
    Ok(SplitData::new(features, targets, cols)?)
}

fn open_array<'a, R: Read + Seek>(
    npz:  &'a mut NpzArchive<R>,
    name: &str,
) -> Result<NpyFile<impl Read + 'a>> {
    npz.by_name(name)
        .with_context(|| format!("Cannot read array '{name}'"))?
        .ok_or_else(|| anyhow::Error::from(DataError::MissingArray(name.to_string())))
}

/// Returns (flat row-major values, rows, cols).
fn read_matrix<R: Read + Seek>(
    npz:  &mut NpzArchive<R>,
    name: &str,
) -> Result<(Vec<f32>, usize, usize)> {
    let npy = open_array(npz, name)?;

    let (rows, cols) = match npy.shape() {
        &[rows, cols] => (rows as usize, cols as usize),
        other => {
            return Err(DataError::ShapeMismatch(format!(
                "{name} must be 2-D, found shape {other:?}"
            ))
            .into())
        }
    };
    if let Order::Fortran = npy.order() {
        return Err(DataError::ShapeMismatch(format!(
            "{name} is stored in Fortran order; re-save it in C order"
        ))
        .into());
    }

    let ts = plain_type(&npy.dtype(), name)?;
    let values: Vec<f32> = match (ts.type_char(), ts.size_field()) {
        (TypeChar::Float, 4) => npy.into_vec::<f32>()?,
        (TypeChar::Float, 8) => npy.into_vec::<f64>()?.into_iter().map(|v| v as f32).collect(),
        _ => return Err(unsupported(name, &ts).into()),
    };
    Ok((values, rows, cols))
}

fn read_targets<R: Read + Seek>(npz: &mut NpzArchive<R>, name: &str) -> Result<Vec<usize>> {
    let npy = open_array(npz, name)?;
    if npy.shape().len() != 1 {
        return Err(DataError::ShapeMismatch(format!(
            "{name} must be 1-D, found shape {:?}",
            npy.shape()
        ))
        .into());
    }

    let raw = read_integers(npy, name)?;
    raw.into_iter()
        .enumerate()
        .map(|(row, value)| {
            usize::try_from(value).map_err(|_| {
                anyhow::Error::from(DataError::InvalidTarget { name: name.to_string(), row, value })
            })
        })
        .collect()
}

/// Widen any integer dtype to i64. u64 values above i64::MAX
/// wrap negative and are then rejected as targets.
fn read_integers<R: Read>(npy: NpyFile<R>, name: &str) -> Result<Vec<i64>> {
    let ts = plain_type(&npy.dtype(), name)?;
    let values = match (ts.type_char(), ts.size_field()) {
        (TypeChar::Int, 1) => widen(npy.into_vec::<i8>()?),
        (TypeChar::Int, 2) => widen(npy.into_vec::<i16>()?),
        (TypeChar::Int, 4) => widen(npy.into_vec::<i32>()?),
        (TypeChar::Int, 8) => npy.into_vec::<i64>()?,
        (TypeChar::Uint, 1) => widen(npy.into_vec::<u8>()?),
        (TypeChar::Uint, 2) => widen(npy.into_vec::<u16>()?),
        (TypeChar::Uint, 4) => widen(npy.into_vec::<u32>()?),
        (TypeChar::Uint, 8) => npy.into_vec::<u64>()?.into_iter().map(|v| v as i64).collect(),
        _ => return Err(unsupported(name, &ts).into()),
    };
    Ok(values)
}

fn widen<T: Into<i64>>(values: Vec<T>) -> Vec<i64> {
    values.into_iter().map(Into::into).collect()
}

/// Class names. The array is optional: a bundle without it gets
/// generated names later on.
fn read_labels<R: Read + Seek>(npz: &mut NpzArchive<R>) -> Result<Vec<String>> {
    let Some(npy) = npz
        .by_name(LABELS_KEY)
        .with_context(|| format!("Cannot read array '{LABELS_KEY}'"))?
    else {
        tracing::warn!("Bundle has no '{}' array; using generated class names", LABELS_KEY);
        return Ok(Vec::new());
    };

    let ts = plain_type(&npy.dtype(), LABELS_KEY)?;
    match ts.type_char() {
        TypeChar::ByteStr | TypeChar::UnicodeStr => Ok(npy.into_vec::<String>()?),
        TypeChar::Int | TypeChar::Uint => Ok(read_integers(npy, LABELS_KEY)?
            .into_iter()
            .map(|v| v.to_string())
            .collect()),
        _ => Err(unsupported(LABELS_KEY, &ts).into()),
    }
}

fn plain_type(dtype: &DType, name: &str) -> Result<TypeStr, DataError> {
    match dtype {
        DType::Plain(ts) => Ok(ts.clone()),
        other => Err(DataError::UnsupportedDtype {
            name:  name.to_string(),
            dtype: format!("{other:?}"),
        }),
    }
}

fn unsupported(name: &str, ts: &TypeStr) -> DataError {
    DataError::UnsupportedDtype { name: name.to_string(), dtype: ts.to_string() }
}

/// Writers for on-disk `.npz` fixtures used by tests across the crate.
#[cfg(test)]
pub(crate) mod test_support {
    use std::{
        io::{Seek, Write},
        path::Path,
    };

    use npyz::{npz::NpzWriter, WriterBuilder};

    pub fn write_f32(npz: &mut NpzWriter<impl Write + Seek>, name: &str, shape: &[u64], v: &[f32]) {
        let mut w = npz
            .array::<f32>(name, Default::default())
            .unwrap()
            .default_dtype()
            .shape(shape)
            .begin_nd()
            .unwrap();
        w.extend(v.iter().copied()).unwrap();
        w.finish().unwrap();
    }

    pub fn write_i64(npz: &mut NpzWriter<impl Write + Seek>, name: &str, v: &[i64]) {
        let mut w = npz
            .array::<i64>(name, Default::default())
            .unwrap()
            .default_dtype()
            .shape(&[v.len() as u64])
            .begin_nd()
            .unwrap();
        w.extend(v.iter().copied()).unwrap();
        w.finish().unwrap();
    }

    /// Write a bundle whose splits have `dim` columns. The archive is
    /// finalised when the writer drops at the end of the call.
    pub fn write_bundle(
        path:          &Path,
        dim:           u64,
        train:         &[f32],
        train_targets: &[i64],
        test:          &[f32],
        test_targets:  &[i64],
    ) {
        let mut npz = NpzWriter::create(path).unwrap();
        write_f32(&mut npz, "train_data", &[train.len() as u64 / dim, dim], train);
        write_i64(&mut npz, "train_target", train_targets);
        write_f32(&mut npz, "test_data", &[test.len() as u64 / dim, dim], test);
        write_i64(&mut npz, "test_target", test_targets);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn write_bundle(path: &Path, test_targets: &[i64]) {
        test_support::write_bundle(
            path,
            2,
            &[0., 0., 0., 1., 1., 0., 1., 1.],
            &[0, 1, 1, 0],
            &[0., 1., 1., 1.],
            test_targets,
        );
    }

    #[test]
    fn test_loads_npz_bundle() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.npz");
        write_bundle(&path, &[1, 0]);

        let bundle = NpzLoader::new(&path).load().unwrap();
        assert_eq!(bundle.embedding_dim(), 2);
        assert_eq!(bundle.train().len(), 4);
        assert_eq!(bundle.train().row(2), &[1.0, 0.0]);
        assert_eq!(bundle.test().targets(), &[1, 0]);
        assert_eq!(bundle.num_classes(), 2);
        // no labels array in the archive
        assert_eq!(bundle.label_names(), vec!["class_0", "class_1"]);
    }

    #[test]
    fn test_negative_target_is_rejected() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.npz");
        write_bundle(&path, &[1, -1]);

        let err = NpzLoader::new(&path).load().unwrap_err();
        let data_err = err.root_cause().downcast_ref::<DataError>().cloned();
        assert_eq!(
            data_err,
            Some(DataError::InvalidTarget { name: "test_target".into(), row: 1, value: -1 })
        );
    }

    #[test]
    fn test_misaligned_targets_are_rejected() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.npz");
        write_bundle(&path, &[1, 0, 1]);

        let err = NpzLoader::new(&path).load().unwrap_err();
        assert!(format!("{err:#}").contains("test_target"));
    }

    #[test]
    fn test_missing_file_mentions_path() {
        let err = NpzLoader::new("does/not/exist.npz").load().unwrap_err();
        assert!(err.to_string().contains("does/not/exist.npz"));
    }
}
