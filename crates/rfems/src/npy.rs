//! NumPy `.npy` (format version 1.0) encoding for little-endian `f64` and
//! `complex128` arrays in C order.

use crate::error::{Error, Result};
use ndarray::{ArrayBase, ArrayD, Data, Dimension, IxDyn};
use num_complex::Complex64;

const MAGIC: &[u8] = b"\x93NUMPY";
const VERSION: [u8; 2] = [1, 0];
/// Header (magic through newline) is padded to a multiple of this.
const ALIGNMENT: usize = 64;

/// Array element with a fixed little-endian representation.
pub trait Element: Copy {
    /// NumPy dtype string
    const DESCR: &'static str;
    const SIZE: usize;

    fn write_le(&self, out: &mut Vec<u8>);
    fn read_le(bytes: &[u8]) -> Self;
}

impl Element for f64 {
    const DESCR: &'static str = "<f8";
    const SIZE: usize = 8;

    fn write_le(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn read_le(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        f64::from_le_bytes(raw)
    }
}

impl Element for Complex64 {
    const DESCR: &'static str = "<c16";
    const SIZE: usize = 16;

    fn write_le(&self, out: &mut Vec<u8>) {
        self.re.write_le(out);
        self.im.write_le(out);
    }

    fn read_le(bytes: &[u8]) -> Self {
        Complex64::new(f64::read_le(&bytes[..8]), f64::read_le(&bytes[8..16]))
    }
}

fn shape_tuple(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [n] => format!("({n},)"),
        _ => format!(
            "({})",
            shape.iter().map(usize::to_string).collect::<Vec<_>>().join(", ")
        ),
    }
}

/// Encode an array as a complete `.npy` file.
pub fn encode<A, S, D>(array: &ArrayBase<S, D>) -> Vec<u8>
where
    A: Element,
    S: Data<Elem = A>,
    D: Dimension,
{
    let mut header = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
        A::DESCR,
        shape_tuple(array.shape())
    );
    let unpadded = MAGIC.len() + VERSION.len() + 2 + header.len() + 1;
    let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');

    let mut out = Vec::with_capacity(MAGIC.len() + 4 + header.len() + array.len() * A::SIZE);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for value in array.iter() {
        value.write_le(&mut out);
    }
    out
}

/// Encode a scalar as a zero-dimensional array.
pub fn encode_scalar<A: Element>(value: A) -> Vec<u8> {
    encode(&ndarray::arr0(value))
}

fn malformed(reason: impl Into<String>) -> Error {
    Error::ResultArchive(reason.into())
}

/// Value of `'key': ` in a header dict, up to the next top-level comma.
fn header_field<'a>(header: &'a str, key: &str) -> Result<&'a str> {
    let pattern = format!("'{key}':");
    let start = header
        .find(&pattern)
        .map(|i| i + pattern.len())
        .ok_or_else(|| malformed(format!("npy header has no {key}")))?;
    let rest = header[start..].trim_start();
    let end = if rest.starts_with('(') {
        rest.find(')').map(|i| i + 1)
    } else {
        rest.find(',')
    }
    .ok_or_else(|| malformed(format!("npy header field {key} is unterminated")))?;
    Ok(rest[..end].trim())
}

fn parse_shape(tuple: &str) -> Result<Vec<usize>> {
    tuple
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().map_err(|_| malformed(format!("bad npy shape {tuple}"))))
        .collect()
}

/// Decode a `.npy` file holding elements of type `A`.
pub fn decode<A: Element>(bytes: &[u8]) -> Result<ArrayD<A>> {
    if bytes.len() < 10 || &bytes[..6] != MAGIC {
        return Err(malformed("not an npy file"));
    }
    if bytes[6] != 1 {
        return Err(malformed(format!("unsupported npy version {}.{}", bytes[6], bytes[7])));
    }
    let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
    let data_start = 10 + header_len;
    let header = bytes
        .get(10..data_start)
        .and_then(|h| std::str::from_utf8(h).ok())
        .ok_or_else(|| malformed("truncated npy header"))?;

    let descr = header_field(header, "descr")?.trim_matches('\'');
    if descr != A::DESCR {
        return Err(malformed(format!("expected dtype {}, found {descr}", A::DESCR)));
    }
    if header_field(header, "fortran_order")? != "False" {
        return Err(malformed("fortran order arrays are not supported"));
    }
    let shape = parse_shape(header_field(header, "shape")?)?;

    let count: usize = shape.iter().product();
    let data = &bytes[data_start..];
    if data.len() != count * A::SIZE {
        return Err(malformed(format!(
            "npy data holds {} bytes, shape {:?} needs {}",
            data.len(),
            shape,
            count * A::SIZE
        )));
    }
    let values = data.chunks_exact(A::SIZE).map(A::read_le).collect();
    ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|e| malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    #[test]
    fn test_header_layout() {
        let bytes = encode(&array![1.0, 2.0, 3.0]);
        assert_eq!(&bytes[..8], b"\x93NUMPY\x01\x00");
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % ALIGNMENT, 0);
        let header = std::str::from_utf8(&bytes[10..10 + header_len]).unwrap();
        assert!(header.starts_with("{'descr': '<f8', 'fortran_order': False, 'shape': (3,), }"));
        assert!(header.ends_with('\n'));
        assert_eq!(bytes.len(), 10 + header_len + 24);
    }

    #[test]
    fn test_complex_matrix() {
        let mut s = Array3::<Complex64>::zeros((2, 2, 2));
        s[[1, 0, 1]] = Complex64::new(0.5, -0.25);
        let decoded = decode::<Complex64>(&encode(&s)).unwrap();
        assert_eq!(decoded.shape(), &[2, 2, 2]);
        assert_eq!(decoded[[1, 0, 1]], Complex64::new(0.5, -0.25));
    }

    #[test]
    fn test_scalar() {
        let decoded = decode::<f64>(&encode_scalar(50.0)).unwrap();
        assert_eq!(decoded.ndim(), 0);
        assert_eq!(decoded.iter().next(), Some(&50.0));
    }

    #[test]
    fn test_rejects_wrong_dtype() {
        let bytes = encode(&array![1.0]);
        assert!(matches!(decode::<Complex64>(&bytes), Err(Error::ResultArchive(_))));
        assert!(decode::<f64>(b"not numpy at all").is_err());
        assert!(decode::<f64>(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn test_parse_shape() {
        assert_eq!(parse_shape("()").unwrap(), Vec::<usize>::new());
        assert_eq!(parse_shape("(4,)").unwrap(), vec![4]);
        assert_eq!(parse_shape("(1, 2, 3)").unwrap(), vec![1, 2, 3]);
    }
}
