//! Per-image logit archives recorded with Burn's MessagePack file recorder.
//!
//! A network run offline exports one `[C, H, W]` logit tensor per image as
//! `<dir>/<image stem>.mpk`; the evaluation reads them back in place of a
//! live forward pass.

use std::path::{Path, PathBuf};

use burn::{
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
    tensor::{backend::Backend, Tensor},
};

use crate::error::{DataError, DataResult};

/// Directory of recorded logit tensors keyed by image stem.
#[derive(Debug, Clone)]
pub struct LogitArchive {
    dir: PathBuf,
}

impl LogitArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Archive path of an image, without the `.mpk` extension the recorder adds.
    ///
    /// # Errors
    ///
    /// Returns an error if the image path has no file stem.
    pub fn entry_path(&self, image: &Path) -> DataResult<PathBuf> {
        let stem = image.file_stem().ok_or_else(|| DataError::NoFileStem {
            path: image.to_path_buf(),
        })?;
        Ok(self.dir.join(stem))
    }

    /// Loads the logits recorded for an image.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive entry is missing or unreadable.
    pub fn load<B: Backend>(&self, image: &Path, device: &B::Device) -> DataResult<Tensor<B, 3>> {
        let path = self.entry_path(image)?;
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();

        recorder
            .load(path.clone(), device)
            .map_err(|e| DataError::LogitsLoadFailed {
                path,
                reason: e.to_string(),
            })
    }

    /// Records the logits of an image.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive entry cannot be written.
    pub fn record<B: Backend>(&self, image: &Path, logits: Tensor<B, 3>) -> DataResult<()> {
        let path = self.entry_path(image)?;
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();

        recorder
            .record(logits, path.clone())
            .map_err(|e| DataError::LogitsRecordFailed {
                path,
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use burn::{backend::NdArray, tensor::TensorData};

    use super::*;

    type TestBackend = NdArray;

    #[test]
    fn recorded_logits_load_back_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let archive = LogitArchive::new(dir.path());
        let image = Path::new("RoadAnomaly/images/animals01.jpg");
        let device = Default::default();

        let logits = Tensor::<TestBackend, 3>::from_data(
            TensorData::new(vec![0.5_f32, -1.0, 2.0, 3.5, 0.0, -0.25], [3, 1, 2]),
            &device,
        );
        archive.record(image, logits.clone()).unwrap();

        let loaded: Tensor<TestBackend, 3> = archive.load(image, &device).unwrap();
        assert_eq!(loaded.dims(), [3, 1, 2]);
        loaded.into_data().assert_eq(&logits.into_data(), true);
    }

    #[test]
    fn missing_entry_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let archive = LogitArchive::new(dir.path());

        let result = archive.load::<TestBackend>(Path::new("images/none.png"), &Default::default());
        match result {
            Err(DataError::LogitsLoadFailed { path, .. }) => {
                assert_eq!(path, dir.path().join("none"));
            }
            other => panic!("Expected LogitsLoadFailed error, got {other:?}"),
        }
    }
}
