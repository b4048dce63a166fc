//! Scattering-parameter and far-field reductions

use ndarray::{Array1, Array3};
use num_complex::Complex64;

/// Incident and reflected voltage waves of one port, per frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct PortResponse {
    pub incident: Array1<Complex64>,
    pub reflected: Array1<Complex64>,
}

/// Scattering matrix of shape `(frequencies, ports, ports)`, written one
/// column per excited port.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatteringMatrix {
    s: Array3<Complex64>,
}

impl ScatteringMatrix {
    pub fn zeros(frequencies: usize, ports: usize) -> Self {
        Self {
            s: Array3::zeros((frequencies, ports, ports)),
        }
    }

    /// Write column `excited`: `S[:, m, excited] = reflected(m) / incident(excited)`.
    pub fn fill_column(&mut self, excited: usize, responses: &[PortResponse]) {
        let incident = &responses[excited].incident;
        for (m, response) in responses.iter().enumerate() {
            let column = &response.reflected / incident;
            self.s
                .slice_mut(ndarray::s![.., m, excited])
                .assign(&column);
        }
    }

    /// Reflection coefficient of `port` over frequency.
    pub fn reflection(&self, port: usize) -> Array1<Complex64> {
        self.s.slice(ndarray::s![.., port, port]).to_owned()
    }

    pub fn port_count(&self) -> usize {
        self.s.shape()[1]
    }

    pub fn as_array(&self) -> &Array3<Complex64> {
        &self.s
    }

    pub fn into_array(self) -> Array3<Complex64> {
        self.s
    }
}

/// Frequency with the smallest `|S[:, port, port]|`.
///
/// Falls back to `center` when the search lands on a zero frequency or the
/// port has no column.
pub fn frequency_of_interest(
    frequencies: &Array1<f64>,
    s: &ScatteringMatrix,
    port: usize,
    center: f64,
) -> f64 {
    if port >= s.port_count() {
        return center;
    }
    let best = s
        .reflection(port)
        .iter()
        .map(|v| v.norm())
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| frequencies[i]);
    match best {
        Some(f) if f != 0.0 => f,
        _ => center,
    }
}

/// Observation angles in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct AngularGrid {
    /// `-180 <= theta < 180`
    pub theta: Array1<f64>,
    /// `0 <= phi < 180`
    pub phi: Array1<f64>,
}

impl AngularGrid {
    pub fn new(dtheta: f64, dphi: f64) -> Self {
        Self {
            theta: Array1::range(-180.0, 180.0, dtheta),
            phi: Array1::range(0.0, 180.0, dphi),
        }
    }

    pub fn theta_radians(&self) -> Array1<f64> {
        self.theta.mapv(f64::to_radians)
    }

    pub fn phi_radians(&self) -> Array1<f64> {
        self.phi.mapv(f64::to_radians)
    }
}
