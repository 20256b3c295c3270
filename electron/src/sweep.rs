use crate::{ElectronError, ElectronFreeEnergy};
use control::ElectronControl;

use ndarray::{Array3, ArrayView3};
use rayon::prelude::*;
use tracing::info;

const MAX_TEMPERATURE_POINTS: f64 = u32::MAX as f64;

/// Thermal properties along a temperature axis, aligned by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemperatureSweep {
    pub temperatures: Vec<f64>,
    pub free_energies: Vec<f64>,
    pub entropies: Vec<f64>,
    pub heat_capacities: Vec<f64>,
    pub energies: Vec<f64>,
    pub chemical_potentials: Vec<f64>,
    pub converged: Vec<bool>,
}

impl TemperatureSweep {
    fn with_capacity(n: usize) -> TemperatureSweep {
        TemperatureSweep {
            temperatures: Vec::with_capacity(n),
            free_energies: Vec::with_capacity(n),
            entropies: Vec::with_capacity(n),
            heat_capacities: Vec::with_capacity(n),
            energies: Vec::with_capacity(n),
            chemical_potentials: Vec::with_capacity(n),
            converged: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.temperatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.temperatures.is_empty()
    }

    pub fn all_converged(&self) -> bool {
        self.converged.iter().all(|&c| c)
    }

    /// (temperatures, free energies, entropies, heat capacities)
    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
        (
            self.temperatures,
            self.free_energies,
            self.entropies,
            self.heat_capacities,
        )
    }
}

/// Band structure of one volume point of a quasi-harmonic grid.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumePoint {
    /// eV, shape (spin, kpoint, band).
    pub eigenvalues: Array3<f64>,
    pub weights: Vec<i64>,
    pub n_electrons: f64,
}

/// `t_min, t_min + t_step, ...` up to `t_max + tolerance` (exclusive).
pub fn temperature_range(
    t_min: f64,
    t_max: f64,
    t_step: f64,
    tolerance: f64,
) -> Result<Vec<f64>, ElectronError> {
    if !(t_min.is_finite() && t_max.is_finite() && t_step.is_finite()) || t_step <= 0.0 {
        return Err(ElectronError::InvalidTemperatureRange {
            t_min,
            t_max,
            t_step,
        });
    }

    let n = ((t_max + tolerance - t_min) / t_step).ceil();

    if !n.is_finite() || n > MAX_TEMPERATURE_POINTS {
        return Err(ElectronError::InvalidTemperatureRange {
            t_min,
            t_max,
            t_step,
        });
    }

    if n <= 0.0 {
        return Ok(vec![]);
    }

    Ok((0..n as usize).map(|i| t_min + i as f64 * t_step).collect())
}

/// Builds one evaluator and runs it over `temperature_range(t_min, t_max, t_step)`.
pub fn get_free_energy_at_t(
    t_min: f64,
    t_max: f64,
    t_step: f64,
    eigenvalues: ArrayView3<f64>,
    weights: &[i64],
    n_electrons: f64,
    control: &ElectronControl,
) -> Result<TemperatureSweep, ElectronError> {
    let temperatures =
        temperature_range(t_min, t_max, t_step, control.get_temperature_step_tolerance())?;

    let mut efe = ElectronFreeEnergy::new(eigenvalues, weights, n_electrons, control.clone())?;

    info!(
        ntemp = temperatures.len(),
        t_min, t_max, t_step, n_electrons, "electron free energy temperature sweep"
    );

    let mut sweep = TemperatureSweep::with_capacity(temperatures.len());

    for &t in temperatures.iter() {
        let state = efe.evaluate(t)?;

        sweep.temperatures.push(t);
        sweep.free_energies.push(state.get_free_energy());
        sweep.entropies.push(state.entropy);
        sweep.heat_capacities.push(state.heat_capacity);
        sweep.energies.push(state.energy);
        sweep.chemical_potentials.push(state.chemical_potential.value);
        sweep.converged.push(state.chemical_potential.converged);
    }

    let nfail = sweep.converged.iter().filter(|&&c| !c).count();

    info!(nfail, "electron free energy temperature sweep done");

    Ok(sweep)
}

/// Runs an independent temperature sweep for every volume point in parallel.
/// The output order follows `points`.
pub fn sweep_volumes(
    points: &[VolumePoint],
    t_min: f64,
    t_max: f64,
    t_step: f64,
    control: &ElectronControl,
) -> Result<Vec<TemperatureSweep>, ElectronError> {
    info!(
        nvolume = points.len(),
        t_min, t_max, t_step, "electron free energy volume sweep"
    );

    let sweeps = points
        .par_iter()
        .map(|p| {
            get_free_energy_at_t(
                t_min,
                t_max,
                t_step,
                p.eigenvalues.view(),
                &p.weights,
                p.n_electrons,
                control,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    let nfail = sweeps.iter().filter(|s| !s.all_converged()).count();

    info!(nfail, "electron free energy volume sweep done");

    Ok(sweeps)
}
