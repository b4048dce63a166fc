//! Reader for the far-field file written by the `nf2ff` executable
//!
//! The file is HDF5; reading it needs the `hdf5` feature. Without it
//! [`AVAILABLE`] is false and far-field runs are refused up front.

use crate::error::{Error, Result};
use ndarray::Array2;
use num_complex::Complex64;

/// Whether far-field files can be read in this build.
pub const AVAILABLE: bool = cfg!(feature = "hdf5");

/// Output file name of the transform.
pub const OUTFILE: &str = "nf2ff.h5";

/// Datasets are stored `[phi, theta]`; return `[theta, phi]`.
fn real_field(shape: &[usize], data: Vec<f64>) -> Result<Array2<f64>> {
    let &[rows, cols] = shape else {
        return Err(Error::Solver(format!("expected a 2D far-field dataset, got shape {shape:?}")));
    };
    let field = Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::Solver(format!("far-field dataset: {e}")))?;
    Ok(field.reversed_axes().as_standard_layout().into_owned())
}

fn complex_field(shape: &[usize], re: Vec<f64>, im: Vec<f64>) -> Result<Array2<Complex64>> {
    let re = real_field(shape, re)?;
    let im = real_field(shape, im)?;
    Ok(ndarray::Zip::from(&re)
        .and(&im)
        .map_collect(|&r, &i| Complex64::new(r, i)))
}

#[cfg(feature = "hdf5")]
mod reader {
    use super::{complex_field, real_field};
    use crate::error::{Error, Result};
    use crate::solver::FarField;
    use ndarray::{Array1, Array2};
    use num_complex::Complex64;
    use std::path::Path;

    fn h5(path: &Path) -> impl Fn(hdf5::Error) -> Error + '_ {
        move |e| Error::Solver(format!("{}: {e}", path.display()))
    }

    fn vector(file: &hdf5::File, name: &str, path: &Path) -> Result<Vec<f64>> {
        file.dataset(name)
            .and_then(|ds| ds.read_raw::<f64>())
            .map_err(h5(path))
    }

    fn scalar_attr(group: &hdf5::Group, name: &str, path: &Path) -> Result<f64> {
        let values = group
            .attr(name)
            .and_then(|a| a.read_raw::<f64>())
            .map_err(h5(path))?;
        values
            .first()
            .copied()
            .ok_or_else(|| Error::Solver(format!("{}: empty attribute {name}", path.display())))
    }

    fn field(file: &hdf5::File, name: &str, path: &Path) -> Result<Array2<Complex64>> {
        let re = file.dataset(&format!("nf2ff/{name}/FD/f0_real")).map_err(h5(path))?;
        let im = file.dataset(&format!("nf2ff/{name}/FD/f0_imag")).map_err(h5(path))?;
        complex_field(
            &re.shape(),
            re.read_raw::<f64>().map_err(h5(path))?,
            im.read_raw::<f64>().map_err(h5(path))?,
        )
    }

    pub fn read(path: &Path) -> Result<FarField> {
        let file = hdf5::File::open(path).map_err(h5(path))?;
        let attrs = file.group("nf2ff").map_err(h5(path))?;

        let r = vector(&file, "Mesh/r", path)?;
        let p_rad = file.dataset("nf2ff/P_rad/FD/f0").map_err(h5(path))?;

        Ok(FarField {
            theta: Array1::from(vector(&file, "Mesh/theta", path)?),
            phi: Array1::from(vector(&file, "Mesh/phi", path)?),
            r: r.first().copied().unwrap_or(1.0),
            freq: scalar_attr(&attrs, "Frequency", path)?,
            dmax: scalar_attr(&attrs, "Dmax", path)?,
            prad: scalar_attr(&attrs, "Prad", path)?,
            e_theta: field(&file, "E_theta", path)?,
            e_phi: field(&file, "E_phi", path)?,
            p_rad: real_field(&p_rad.shape(), p_rad.read_raw::<f64>().map_err(h5(path))?)?,
        })
    }
}

/// Read a far-field result file.
#[cfg(feature = "hdf5")]
pub fn read_far_field(path: &std::path::Path) -> Result<crate::solver::FarField> {
    reader::read(path)
}

/// Read a far-field result file.
#[cfg(not(feature = "hdf5"))]
pub fn read_far_field(path: &std::path::Path) -> Result<crate::solver::FarField> {
    Err(Error::FarFieldUnavailable(format!(
        "cannot read {}: built without the hdf5 feature",
        path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_are_transposed() {
        // two phi rows, three theta columns
        let field = real_field(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(field.dim(), (3, 2));
        assert_eq!(field[[0, 1]], 4.0);
        assert_eq!(field[[2, 0]], 3.0);

        let c = complex_field(&[1, 2], vec![1.0, 2.0], vec![-1.0, -2.0]).unwrap();
        assert_eq!(c[[1, 0]], Complex64::new(2.0, -2.0));
    }

    #[test]
    fn test_bad_shapes() {
        assert!(real_field(&[6], vec![0.0; 6]).is_err());
        assert!(real_field(&[2, 2], vec![0.0; 3]).is_err());
    }

    #[cfg(not(feature = "hdf5"))]
    #[test]
    fn test_unavailable_without_hdf5() {
        assert!(!AVAILABLE);
        let err = read_far_field(std::path::Path::new("nf2ff.h5")).unwrap_err();
        assert!(matches!(err, Error::FarFieldUnavailable(_)));
    }
}
