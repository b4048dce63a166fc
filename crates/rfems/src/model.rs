//! Labeled surface models read from an input archive
//!
//! Each `.stl` entry of the zip becomes one [`Model`]. Its metadata is
//! decoded once from the entry's base name; nothing downstream looks at the
//! name string again.

use crate::error::{Error, Result};
use crate::geometry::{Axis, BoundingBox, Triangle};
use crate::material::{CustomDielectric, MaterialTag};
use crate::naming::ModelName;
use crate::stl::read_stl;
use crate::STL_TOL;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Decoded port metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortSpec {
    pub number: u32,
    pub direction: Axis,
    /// Reference impedance in ohms, already defaulted.
    pub impedance: f64,
    pub priority: i32,
}

/// What a model is for.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelRole {
    /// A structure; air structures only widen the scene.
    Part {
        tag: MaterialTag,
        custom: CustomDielectric,
        priority: i32,
    },
    Port(PortSpec),
}

impl ModelRole {
    /// Decode a model name. Port metadata errors are fatal.
    pub fn decode(name: &str, default_impedance: f64) -> Result<Self> {
        let name = ModelName::parse(name);
        if name.is_port() {
            Ok(ModelRole::Port(PortSpec {
                number: name.port_number()?,
                direction: name.port_direction()?,
                impedance: name.port_impedance(default_impedance),
                priority: name.priority(),
            }))
        } else {
            Ok(ModelRole::Part {
                tag: name.material_tag(),
                custom: name.custom_dielectric(),
                priority: name.priority(),
            })
        }
    }
}

/// One ingested surface model. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    /// Extracted surface file, read again by the solver for volumetric parts.
    pub path: PathBuf,
    pub facets: Vec<Triangle>,
    /// Bounding box with thin axes collapsed.
    pub bbox: BoundingBox,
    pub role: ModelRole,
}

impl Model {
    pub fn load(name: &str, path: &Path, default_impedance: f64) -> Result<Self> {
        let role = ModelRole::decode(name, default_impedance)?;
        let facets = read_stl(path)?;
        let bbox = BoundingBox::from_facets(&facets)
            .ok_or_else(|| Error::EmptyModel {
                name: name.to_string(),
            })?
            .collapse_thin(STL_TOL);
        debug!("Loaded {}: {} facets, bbox {:?}", name, facets.len(), bbox);
        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            facets,
            bbox,
            role,
        })
    }

    pub fn port(&self) -> Option<&PortSpec> {
        match &self.role {
            ModelRole::Port(spec) => Some(spec),
            ModelRole::Part { .. } => None,
        }
    }
}

/// All models of one run, with a validated port set.
#[derive(Debug, Clone)]
pub struct ModelSet {
    models: Vec<Model>,
}

impl ModelSet {
    /// Validate the port numbering and take ownership of the models.
    pub fn new(models: Vec<Model>) -> Result<Self> {
        let numbers: Vec<u32> = models.iter().filter_map(|m| m.port()).map(|p| p.number).collect();
        if numbers.is_empty() {
            warn!("No ports provided");
        }
        validate_port_numbers(&numbers)?;
        Ok(Self { models })
    }

    /// Extract every `.stl` entry of `archive` into `dir` and load it.
    pub fn load(archive: &Path, dir: &Path, default_impedance: f64) -> Result<Self> {
        let entries = extract_models(archive, dir)?;
        let models = entries
            .iter()
            .map(|(name, path)| Model::load(name, path, default_impedance))
            .collect::<Result<Vec<_>>>()?;
        info!("Loaded {} models from {:?}", models.len(), archive);
        Self::new(models)
    }

    /// Non-port models sorted by name.
    pub fn parts(&self) -> Vec<&Model> {
        let mut parts: Vec<&Model> = self.models.iter().filter(|m| m.port().is_none()).collect();
        parts.sort_by(|a, b| a.name.cmp(&b.name));
        parts
    }

    /// Port models sorted by port number.
    pub fn ports(&self) -> Vec<(&Model, &PortSpec)> {
        let mut ports: Vec<_> = self
            .models
            .iter()
            .filter_map(|m| m.port().map(|p| (m, p)))
            .collect();
        ports.sort_by_key(|(_, p)| p.number);
        ports
    }

    pub fn port_count(&self) -> usize {
        self.models.iter().filter(|m| m.port().is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Port numbers must be exactly `1..=N`.
pub fn validate_port_numbers(numbers: &[u32]) -> Result<()> {
    let mut sorted = numbers.to_vec();
    sorted.sort_unstable();
    let contiguous = sorted.iter().zip(1u32..).all(|(&n, expected)| n == expected);
    if contiguous {
        Ok(())
    } else {
        Err(Error::NonContiguousPorts { numbers: sorted })
    }
}

/// Extract the `.stl` entries of a zip archive into `dir`, keyed by base
/// name without extension. Other entries are skipped with a warning.
pub fn extract_models(archive: &Path, dir: &Path) -> Result<BTreeMap<String, PathBuf>> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
    let mut models = BTreeMap::new();
    fs::create_dir_all(dir)?;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            warn!("Ignoring {}, path escapes the archive", entry.name());
            continue;
        };
        if relative.extension().and_then(|e| e.to_str()) != Some("stl") {
            warn!("Ignoring {}, only .stl files allowed", entry.name());
            continue;
        }
        let Some(name) = relative.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            warn!("Ignoring {}, unreadable name", entry.name());
            continue;
        };

        let target = dir.join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        io::copy(&mut entry, &mut File::create(&target)?)?;

        if models.insert(name.clone(), target).is_some() {
            warn!("Duplicate model name {}, keeping the last entry", name);
        }
    }

    Ok(models)
}
