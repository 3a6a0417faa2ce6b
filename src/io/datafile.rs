//! Hierarchical dataset container backing the output file.
//!
//! Every artefact is a flat dataset addressed by a `/`-separated path whose
//! last components encode the artefact kind: CSR lists become the pair
//! `<prefix>/csrlist/data` + `<prefix>/csrlist/offset`, plain arrays become
//! `<prefix>/vector/0`, scalars one-element arrays under
//! `<prefix>/scalar/0`, maps a key/value pair under `<prefix>/map/0` and
//! `<prefix>/map/1`, and tuples enumerate their fields as
//! `<prefix>/tuple/<i>`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::csr::CsrList;
use crate::error::{Error, Result};

/// One flat dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Dataset {
    UInt(Vec<u64>),
    Float(Vec<f64>),
}

/// A set of datasets keyed by hierarchical path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataFile {
    datasets: BTreeMap<String, Dataset>,
}

impl DataFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    pub fn insert(&mut self, path: impl Into<String>, dataset: Dataset) {
        self.datasets.insert(path.into(), dataset);
    }

    pub fn get(&self, path: &str) -> Option<&Dataset> {
        self.datasets.get(path)
    }

    pub fn uint(&self, path: &str) -> Option<&[u64]> {
        match self.datasets.get(path) {
            Some(Dataset::UInt(values)) => Some(values),
            _ => None,
        }
    }

    pub fn float(&self, path: &str) -> Option<&[f64]> {
        match self.datasets.get(path) {
            Some(Dataset::Float(values)) => Some(values),
            _ => None,
        }
    }

    pub fn put_vector_u64(&mut self, prefix: &str, values: impl IntoIterator<Item = u64>) {
        self.insert(
            format!("{prefix}/vector/0"),
            Dataset::UInt(values.into_iter().collect()),
        );
    }

    pub fn put_vector_f64(&mut self, prefix: &str, values: impl IntoIterator<Item = f64>) {
        self.insert(
            format!("{prefix}/vector/0"),
            Dataset::Float(values.into_iter().collect()),
        );
    }

    pub fn put_scalar(&mut self, prefix: &str, value: u64) {
        self.insert(format!("{prefix}/scalar/0"), Dataset::UInt(vec![value]));
    }

    pub fn put_csr(&mut self, prefix: &str, list: &CsrList<usize>) {
        self.insert(
            format!("{prefix}/csrlist/data"),
            Dataset::UInt(list.data().iter().map(|&v| v as u64).collect()),
        );
        self.insert(
            format!("{prefix}/csrlist/offset"),
            Dataset::UInt(list.offset().iter().map(|&v| v as u64).collect()),
        );
    }

    pub fn put_map(
        &mut self,
        prefix: &str,
        entries: impl IntoIterator<Item = (u64, u64)> + Clone,
    ) {
        let keys: Vec<u64> = entries.clone().into_iter().map(|(k, _)| k).collect();
        let values: Vec<u64> = entries.into_iter().map(|(_, v)| v).collect();
        self.insert(format!("{prefix}/map/0"), Dataset::UInt(keys));
        self.insert(format!("{prefix}/map/1"), Dataset::UInt(values));
    }

    pub fn put_tuple(&mut self, prefix: &str, fields: impl IntoIterator<Item = Dataset>) {
        for (i, field) in fields.into_iter().enumerate() {
            self.insert(format!("{prefix}/tuple/{i}"), field);
        }
    }

    /// Reads back a CSR pair written by [`DataFile::put_csr`].
    pub fn csr(&self, prefix: &str) -> Option<CsrList<usize>> {
        let data = self.uint(&format!("{prefix}/csrlist/data"))?;
        let offset = self.uint(&format!("{prefix}/csrlist/offset"))?;
        CsrList::from_parts(
            data.iter().map(|&v| v as usize).collect(),
            offset.iter().map(|&v| v as usize).collect(),
        )
        .ok()
    }

    pub fn to_postcard(&self) -> Result<Vec<u8>> {
        postcard::to_stdvec(self).map_err(|e| Error::Io(std::io::Error::other(e)))
    }

    pub fn from_postcard(bytes: &[u8]) -> Result<Self> {
        postcard::from_bytes(bytes).map_err(|e| {
            Error::InvalidInput(format!("cannot decode hierarchical data file: {e}"))
        })
    }
}
