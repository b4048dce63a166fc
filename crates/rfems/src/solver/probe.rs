//! Voltage/current probe time series
//!
//! openEMS writes one text file per probe: `%`-prefixed header lines
//! followed by whitespace separated `time value` rows.

use crate::error::{Error, Result};
use crate::sparams::PortResponse;
use ndarray::Array1;
use num_complex::Complex64;
use std::f64::consts::PI;
use std::fs;
use std::path::Path;

/// Sampled probe signal.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSeries {
    pub time: Vec<f64>,
    pub values: Vec<f64>,
}

impl ProbeSeries {
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text).map_err(|reason| {
            Error::Solver(format!("{}: {}", path.display(), reason))
        })
    }

    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let mut series = ProbeSeries {
            time: Vec::new(),
            values: Vec::new(),
        };
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('%') {
                continue;
            }
            let mut columns = line.split_whitespace().map(str::parse::<f64>);
            match (columns.next(), columns.next()) {
                (Some(Ok(t)), Some(Ok(v))) => {
                    series.time.push(t);
                    series.values.push(v);
                }
                _ => return Err(format!("line {}: expected 'time value'", number + 1)),
            }
        }
        if series.time.len() < 2 {
            return Err("fewer than two samples".to_string());
        }
        Ok(series)
    }

    /// Spectrum of a pulse signal: `2·dt·Σ v(t)·exp(-j2πft)`.
    pub fn spectrum(&self, frequencies: &Array1<f64>) -> Array1<Complex64> {
        let dt = self.time[1] - self.time[0];
        frequencies.mapv(|f| {
            let sum: Complex64 = self
                .time
                .iter()
                .zip(&self.values)
                .map(|(&t, &v)| v * Complex64::from_polar(1.0, -2.0 * PI * f * t))
                .sum();
            sum * 2.0 * dt
        })
    }
}

/// Split total port voltage and current into incident and reflected waves
/// against reference impedance `z`.
pub fn decompose(u: &Array1<Complex64>, i: &Array1<Complex64>, z: f64) -> PortResponse {
    let incident = (u + &(i * z)) * 0.5;
    let reflected = u - &incident;
    PortResponse {
        incident,
        reflected,
    }
}

/// Voltage probe file name for port `number`.
pub fn voltage_probe(number: u32) -> String {
    format!("port_ut_{number}")
}

/// Current probe file name for port `number`.
pub fn current_probe(number: u32) -> String {
    format!("port_it_{number}")
}

/// Read both probes of a port and decompose them at `frequencies`.
pub fn read_port(
    sim_path: &Path,
    number: u32,
    impedance: f64,
    frequencies: &Array1<f64>,
) -> Result<PortResponse> {
    let u = ProbeSeries::read(&sim_path.join(voltage_probe(number)))?.spectrum(frequencies);
    let i = ProbeSeries::read(&sim_path.join(current_probe(number)))?.spectrum(frequencies);
    Ok(decompose(&u, &i, impedance))
}
