//! Result archive: a NumPy `.npz` holding frequencies, the scattering
//! matrix, reference impedances and an optional far-field pattern.

use crate::error::{Error, Result};
use crate::npy::{self, Element};
use crate::solver::FarField;
use ndarray::{Array1, Array2, Array3, ArrayD, Axis as ArrayAxis, Ix1, Ix3};
use num_complex::Complex64;
use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Keys written only for far-field runs.
pub const FAR_FIELD_KEYS: [&str; 12] = [
    "theta", "phi", "r", "freq", "Dmax", "Prad", "E_theta", "E_phi", "E_norm", "E_cprh", "E_cplh",
    "P_rad",
];

/// Port reference impedance, as stored under `z`.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceImpedance {
    /// One value for every port; stored as a scalar
    Uniform(f64),
    /// One value per port, in port order
    PerPort(Vec<f64>),
}

impl ReferenceImpedance {
    /// Collapse to [`ReferenceImpedance::Uniform`] when all ports agree.
    pub fn from_ports(impedances: &[f64], default: f64) -> Self {
        match impedances.split_first() {
            None => ReferenceImpedance::Uniform(default),
            Some((first, rest)) if rest.iter().all(|z| z == first) => {
                ReferenceImpedance::Uniform(*first)
            }
            Some(_) => ReferenceImpedance::PerPort(impedances.to_vec()),
        }
    }
}

/// Everything a completed sweep produces.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    /// Frequencies (Hz)
    pub f: Array1<f64>,
    /// Scattering matrix `[frequency, port, port]`
    pub s: Array3<Complex64>,
    pub z: ReferenceImpedance,
    pub far_field: Option<FarField>,
}

/// Archive path for `path`: same stem, `.npz` extension.
pub fn npz_path(path: &Path) -> PathBuf {
    if path.extension().and_then(|e| e.to_str()) == Some("npz") {
        path.to_path_buf()
    } else {
        path.with_extension("npz")
    }
}

/// Zip of `.npy` entries. Entry names are unique; repeats are dropped.
pub struct NpzWriter {
    zip: ZipWriter<File>,
    names: HashSet<String>,
}

impl NpzWriter {
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self {
            zip: ZipWriter::new(File::create(path)?),
            names: HashSet::new(),
        })
    }

    /// Add `name.npy`. Returns false, with a warning, if `name` was already written.
    pub fn add(&mut self, name: &str, npy: &[u8]) -> Result<bool> {
        if !self.names.insert(name.to_string()) {
            warn!("Entry {} already in result archive, skipping", name);
            return Ok(false);
        }
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        self.zip.start_file(format!("{name}.npy"), options)?;
        self.zip.write_all(npy)?;
        Ok(true)
    }

    pub fn finish(self) -> Result<()> {
        self.zip.finish()?;
        Ok(())
    }
}

fn with_frequency_axis<A: Clone, D: ndarray::Dimension>(
    array: &ndarray::Array<A, D>,
) -> ndarray::Array<A, D::Larger> {
    array.clone().insert_axis(ArrayAxis(0))
}

impl SimulationResult {
    /// Write the archive to `path` with its extension set to `.npz`.
    pub fn save(&self, path: &Path) -> Result<PathBuf> {
        let path = npz_path(path);
        let mut npz = NpzWriter::create(&path)?;

        npz.add("f", &npy::encode(&self.f))?;
        npz.add("s", &npy::encode(&self.s))?;
        match &self.z {
            ReferenceImpedance::Uniform(z) => npz.add("z", &npy::encode_scalar(*z))?,
            ReferenceImpedance::PerPort(z) => npz.add("z", &npy::encode(&Array1::from(z.clone())))?,
        };

        if let Some(ff) = &self.far_field {
            npz.add("theta", &npy::encode(&ff.theta))?;
            npz.add("phi", &npy::encode(&ff.phi))?;
            npz.add("r", &npy::encode_scalar(ff.r))?;
            npz.add("freq", &npy::encode(&ndarray::arr1(&[ff.freq])))?;
            npz.add("Dmax", &npy::encode(&ndarray::arr1(&[ff.dmax])))?;
            npz.add("Prad", &npy::encode(&ndarray::arr1(&[ff.prad])))?;
            npz.add("E_theta", &npy::encode(&with_frequency_axis(&ff.e_theta)))?;
            npz.add("E_phi", &npy::encode(&with_frequency_axis(&ff.e_phi)))?;
            npz.add("E_norm", &npy::encode(&with_frequency_axis(&ff.e_norm())))?;
            npz.add("E_cprh", &npy::encode(&with_frequency_axis(&ff.e_cprh())))?;
            npz.add("E_cplh", &npy::encode(&with_frequency_axis(&ff.e_cplh())))?;
            npz.add("P_rad", &npy::encode(&with_frequency_axis(&ff.p_rad)))?;
        }

        npz.finish()?;
        info!("Wrote results to {:?}", path);
        Ok(path)
    }

    /// Read an archive written by [`SimulationResult::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let mut npz = NpzReader::open(path)?;

        let f = npz.array::<f64, Ix1>("f")?;
        let s = npz.array::<Complex64, Ix3>("s")?;
        let (frequencies, ports, ports_again) = s.dim();
        if frequencies != f.len() || ports != ports_again {
            return Err(Error::ResultArchive(format!(
                "s has shape {:?}, expected ({}, N, N)",
                s.shape(),
                f.len()
            )));
        }

        let z = npz.read::<f64>("z")?;
        let z = match z.ndim() {
            0 => ReferenceImpedance::Uniform(z.iter().copied().next().unwrap_or_default()),
            1 if z.len() == ports => ReferenceImpedance::PerPort(z.iter().copied().collect()),
            _ => {
                return Err(Error::ResultArchive(format!(
                    "z has shape {:?}, expected a scalar or ({ports},)",
                    z.shape()
                )))
            }
        };

        let present: Vec<&str> = FAR_FIELD_KEYS
            .iter()
            .copied()
            .filter(|k| npz.contains(k))
            .collect();
        let far_field = match present.len() {
            0 => None,
            n if n == FAR_FIELD_KEYS.len() => Some(npz.far_field()?),
            _ => {
                return Err(Error::ResultArchive(format!(
                    "incomplete far field, found only {present:?}"
                )))
            }
        };

        Ok(Self { f, s, z, far_field })
    }
}

struct NpzReader {
    zip: ZipArchive<File>,
}

impl NpzReader {
    fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            zip: ZipArchive::new(File::open(path)?)?,
        })
    }

    fn contains(&self, name: &str) -> bool {
        self.zip.index_for_name(&format!("{name}.npy")).is_some()
    }

    fn read<A: Element>(&mut self, name: &str) -> Result<ArrayD<A>> {
        let mut entry = self
            .zip
            .by_name(&format!("{name}.npy"))
            .map_err(|_| Error::ResultArchive(format!("missing entry {name}")))?;
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        npy::decode(&bytes).map_err(|e| Error::ResultArchive(format!("{name}: {e}")))
    }

    fn array<A: Element, D: ndarray::Dimension>(&mut self, name: &str) -> Result<ndarray::Array<A, D>> {
        let array = self.read::<A>(name)?;
        let shape = array.shape().to_vec();
        array.into_dimensionality::<D>().map_err(|_| {
            Error::ResultArchive(format!("{name} has unexpected shape {shape:?}"))
        })
    }

    fn scalar(&mut self, name: &str) -> Result<f64> {
        let array = self.read::<f64>(name)?;
        match array.len() {
            1 => Ok(array.iter().copied().next().unwrap_or_default()),
            _ => Err(Error::ResultArchive(format!("{name} should hold one value"))),
        }
    }

    /// A `[1, theta, phi]` field reduced to `[theta, phi]`.
    fn field<A: Element>(&mut self, name: &str, dim: (usize, usize)) -> Result<Array2<A>> {
        let stacked = self.array::<A, Ix3>(name)?;
        if stacked.dim() != (1, dim.0, dim.1) {
            return Err(Error::ResultArchive(format!(
                "{name} has shape {:?}, expected (1, {}, {})",
                stacked.shape(),
                dim.0,
                dim.1
            )));
        }
        Ok(stacked.index_axis_move(ArrayAxis(0), 0))
    }

    fn far_field(&mut self) -> Result<FarField> {
        let theta = self.array::<f64, Ix1>("theta")?;
        let phi = self.array::<f64, Ix1>("phi")?;
        let dim = (theta.len(), phi.len());
        // derived components are recomputed from E_theta and E_phi
        for derived in ["E_cprh", "E_cplh"] {
            self.field::<Complex64>(derived, dim)?;
        }
        self.field::<f64>("E_norm", dim)?;

        Ok(FarField {
            r: self.scalar("r")?,
            freq: self.scalar("freq")?,
            dmax: self.scalar("Dmax")?,
            prad: self.scalar("Prad")?,
            e_theta: self.field("E_theta", dim)?,
            e_phi: self.field("E_phi", dim)?,
            p_rad: self.field("P_rad", dim)?,
            theta,
            phi,
        })
    }
}
