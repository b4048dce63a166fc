//! External field solver contract
//!
//! The sweep driver only talks to a [`FieldSolver`]. [`OpenEms`] drives the
//! openEMS executables; tests use a recording mock.

pub mod csx;
pub mod nf2ff;
pub mod openems;
pub mod probe;

pub use openems::OpenEms;

use crate::error::Result;
use crate::port::LumpedPort;
use crate::simulation::Scene;
use crate::sparams::{AngularGrid, PortResponse};
use ndarray::{Array1, Array2, Zip};
use num_complex::Complex64;
use std::f64::consts::FRAC_1_SQRT_2;
use std::path::Path;

/// A time-domain field solver run over one [`Scene`] at a time.
///
/// Every call blocks until the external work is done. The work area
/// `sim_path` is owned by the caller and reset between scenes.
pub trait FieldSolver {
    /// Open the scene in an interactive viewer. The run stops afterwards.
    fn show_model(&self, scene: &Scene, sim_path: &Path) -> Result<()>;

    /// Run the solver to completion or to its end criterion.
    fn run(&self, scene: &Scene, sim_path: &Path) -> Result<()>;

    /// Open the structural PEC dump written by [`FieldSolver::run`].
    fn show_pec_dump(&self, sim_path: &Path) -> Result<()>;

    /// Incident and reflected voltage of `port` at `frequencies`.
    fn port_response(
        &self,
        port: &LumpedPort,
        sim_path: &Path,
        frequencies: &Array1<f64>,
    ) -> Result<PortResponse>;

    /// Transform the recorded near fields to the far field at one frequency.
    fn far_field(
        &self,
        scene: &Scene,
        sim_path: &Path,
        frequency: f64,
        grid: &AngularGrid,
    ) -> Result<FarField>;

    /// Whether [`FieldSolver::far_field`] can succeed in this build.
    fn supports_far_field(&self) -> bool;
}

/// Far-field pattern at a single frequency.
///
/// Field arrays are indexed `[theta, phi]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FarField {
    /// Radians
    pub theta: Array1<f64>,
    /// Radians
    pub phi: Array1<f64>,
    /// Observation radius (m)
    pub r: f64,
    /// Hz
    pub freq: f64,
    /// Maximum directivity
    pub dmax: f64,
    /// Total radiated power (W)
    pub prad: f64,
    pub e_theta: Array2<Complex64>,
    pub e_phi: Array2<Complex64>,
    /// Radiated power density
    pub p_rad: Array2<f64>,
}

impl FarField {
    /// `sqrt(|E_theta|^2 + |E_phi|^2)`
    pub fn e_norm(&self) -> Array2<f64> {
        Zip::from(&self.e_theta)
            .and(&self.e_phi)
            .map_collect(|t, p| (t.norm_sqr() + p.norm_sqr()).sqrt())
    }

    /// Right-hand circular polarization component.
    pub fn e_cprh(&self) -> Array2<Complex64> {
        self.circular(1.0)
    }

    /// Left-hand circular polarization component.
    pub fn e_cplh(&self) -> Array2<Complex64> {
        self.circular(-1.0)
    }

    fn circular(&self, hand: f64) -> Array2<Complex64> {
        let j = Complex64::i() * hand;
        let mut out = Array2::zeros(self.e_theta.raw_dim());
        Zip::indexed(&mut out)
            .and(&self.e_theta)
            .and(&self.e_phi)
            .for_each(|(_, k), out, &t, &p| {
                let phi = self.phi[k];
                let rot = Complex64::new(phi.cos(), hand * phi.sin());
                *out = rot * (t + j * p) * FRAC_1_SQRT_2;
            });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn field(e_theta: Complex64, e_phi: Complex64, phi: f64) -> FarField {
        FarField {
            theta: array![0.0],
            phi: array![phi],
            r: 1.0,
            freq: 1e9,
            dmax: 1.0,
            prad: 1.0,
            e_theta: array![[e_theta]],
            e_phi: array![[e_phi]],
            p_rad: array![[1.0]],
        }
    }

    #[test]
    fn test_e_norm() {
        let ff = field(Complex64::new(3.0, 0.0), Complex64::new(0.0, 4.0), 0.0);
        assert!((ff.e_norm()[[0, 0]] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_circular_components() {
        // E_phi = -j E_theta is purely right-hand at phi = 0
        let ff = field(Complex64::new(1.0, 0.0), Complex64::new(0.0, -1.0), 0.0);
        let rh = ff.e_cprh()[[0, 0]];
        let lh = ff.e_cplh()[[0, 0]];
        assert!((rh.norm() - 2f64.sqrt()).abs() < 1e-12);
        assert!(lh.norm() < 1e-12);

        // rotation by phi only changes the phase
        let turned = field(Complex64::new(1.0, 0.0), Complex64::new(0.0, -1.0), 1.0);
        assert!((turned.e_cprh()[[0, 0]].norm() - rh.norm()).abs() < 1e-12);
    }
}
