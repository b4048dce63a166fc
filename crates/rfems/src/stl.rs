//! ASCII STL ingestion
//!
//! Only the text form is accepted. The binary form stores vertices as
//! 32-bit floats, which is not enough precision for mesh line placement.

use crate::error::{Error, Result};
use crate::geometry::{Triangle, Vec3};
use std::fs;
use std::path::Path;

const ASCII_MAGIC: &[u8] = b"solid";
const BINARY_HEADER_LEN: usize = 84;
const BINARY_FACET_LEN: usize = 50;

/// Read all facets from an ASCII STL file.
pub fn read_stl(path: &Path) -> Result<Vec<Triangle>> {
    let bytes = fs::read(path)?;
    if !bytes.starts_with(ASCII_MAGIC) || looks_binary(&bytes) {
        return Err(Error::BinaryStl {
            path: path.to_path_buf(),
        });
    }
    parse_ascii(&String::from_utf8_lossy(&bytes), path)
}

/// Some exporters write binary files whose 80-byte header begins with
/// `solid`. Those carry a facet count that matches the file length exactly
/// and never contain a `facet` keyword.
fn looks_binary(bytes: &[u8]) -> bool {
    if bytes.len() < BINARY_HEADER_LEN {
        return false;
    }
    let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
    let sized_as_binary = BINARY_HEADER_LEN + count * BINARY_FACET_LEN == bytes.len();
    let has_facets = bytes.windows(8).any(|w| w == b"endfacet");
    sized_as_binary && !has_facets
}

/// Parse the text form. `path` is only used for diagnostics.
pub fn parse_ascii(text: &str, path: &Path) -> Result<Vec<Triangle>> {
    let mut facets = Vec::new();
    let mut facet: Vec<Vec3> = Vec::with_capacity(3);

    for (index, line) in text.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            ["endfacet", ..] if !facet.is_empty() => {
                let triangle: Triangle = facet.as_slice().try_into().map_err(|_| {
                    Error::MalformedStl {
                        path: path.to_path_buf(),
                        line: index + 1,
                        reason: format!("facet has {} vertices, expected 3", facet.len()),
                    }
                })?;
                facets.push(triangle);
                facet.clear();
            }
            ["vertex", x, y, z] => {
                let parse = |s: &str| {
                    s.parse::<f64>().map_err(|e| Error::MalformedStl {
                        path: path.to_path_buf(),
                        line: index + 1,
                        reason: format!("'{}': {}", s, e),
                    })
                };
                facet.push(Vec3::new(parse(*x)?, parse(*y)?, parse(*z)?));
            }
            _ => {}
        }
    }

    Ok(facets)
}
