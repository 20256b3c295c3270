use crate::{ElectronError, SpinScheme};
use control::ElectronControl;
use fermilevel::ChemicalPotential;
use smearing::Smearing;

use itertools::multizip;
use ndarray::{Array3, ArrayView2, ArrayView3, Axis};
use tracing::{debug, warn};

/// Result of one `ElectronFreeEnergy::evaluate` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalState {
    /// Temperature as requested, K.
    pub temperature: f64,
    /// Temperature in energy units, eV.
    pub kbt: f64,
    pub chemical_potential: ChemicalPotential,
    /// Occupation numbers, shape (kpoint, spin, band).
    pub occupations: Array3<f64>,
    /// k_B units.
    pub entropy: f64,
    /// eV.
    pub energy: f64,
    /// k_B units.
    pub heat_capacity: f64,
}

impl ThermalState {
    pub fn get_free_energy(&self) -> f64 {
        self.energy - self.kbt * self.entropy
    }
}

/// Fixed density-of-states evaluator for the electronic entropy, energy,
/// free energy and heat capacity of a metal.
///
/// With `g` the spin degeneracy, `w_k` the k-point weights and `f` the
/// Fermi-Dirac occupations,
///
/// ```text
/// S = -g / sum(w) * sum_k w_k sum_i [ f ln f + (1 - f) ln(1 - f) ]
/// E =  g / sum(w) * sum_k w_k sum_i f e
/// F =  E - kT S
/// ```
pub struct ElectronFreeEnergy {
    eigenvalues: Array3<f64>, // (kpoint, spin, band), eV
    weights: Vec<f64>,
    total_weight: f64,
    n_electrons: f64,
    spin_scheme: SpinScheme,
    smearing: Box<dyn Smearing>,
    control: ElectronControl,
    state: Option<ThermalState>,
}

impl ElectronFreeEnergy {
    /// `eigenvalues` are in eV with shape (spin, kpoint, band); `weights` are the
    /// integer k-star multiplicities of the irreducible k-points.
    pub fn new(
        eigenvalues: ArrayView3<f64>,
        weights: &[i64],
        n_electrons: f64,
        control: ElectronControl,
    ) -> Result<ElectronFreeEnergy, ElectronError> {
        control.validate()?;

        let (nspin, nkpt, nband) = eigenvalues.dim();

        let spin_scheme = SpinScheme::from_spin_channels(nspin)?;

        if weights.len() != nkpt {
            return Err(ElectronError::WeightLengthMismatch {
                weights: weights.len(),
                kpoints: nkpt,
            });
        }

        if let Some((index, &weight)) = weights.iter().enumerate().find(|&(_, &w)| w < 0) {
            return Err(ElectronError::NegativeWeight { index, weight });
        }

        if nkpt == 0 || nband == 0 {
            return Err(ElectronError::EmptyEigenvalues);
        }

        if let Some(((spin, kpoint, band), _)) =
            eigenvalues.indexed_iter().find(|(_, e)| !e.is_finite())
        {
            return Err(ElectronError::NonFiniteEigenvalue { spin, kpoint, band });
        }

        if !n_electrons.is_finite() || n_electrons < 0.0 {
            return Err(ElectronError::InvalidElectronCount(n_electrons));
        }

        let weights: Vec<f64> = weights.iter().map(|&w| w as f64).collect();
        let total_weight: f64 = weights.iter().sum();

        if total_weight == 0.0 {
            return Err(ElectronError::ZeroTotalWeight);
        }

        let eigenvalues = eigenvalues
            .permuted_axes([1, 0, 2])
            .as_standard_layout()
            .into_owned();

        let smearing = smearing::new(&control);

        Ok(ElectronFreeEnergy {
            eigenvalues,
            weights,
            total_weight,
            n_electrons,
            spin_scheme,
            smearing,
            control,
            state: None,
        })
    }

    pub fn with_defaults(
        eigenvalues: ArrayView3<f64>,
        weights: &[i64],
        n_electrons: f64,
    ) -> Result<ElectronFreeEnergy, ElectronError> {
        ElectronFreeEnergy::new(eigenvalues, weights, n_electrons, ElectronControl::new())
    }

    /// Solves the chemical potential at `temperature` (K) and refreshes
    /// occupations, entropy, energy and heat capacity.
    ///
    /// Temperatures (K) below the configured floor are replaced by the floor
    /// itself, taken as energy (eV); the floor is therefore both the Kelvin
    /// threshold and the resulting kT. A chemical potential that misses the electron
    /// tolerance within the iteration cap is kept and flagged in the state.
    pub fn evaluate(&mut self, temperature: f64) -> Result<&ThermalState, ElectronError> {
        if !temperature.is_finite() {
            return Err(ElectronError::InvalidTemperature(temperature));
        }

        let floor = self.control.get_temperature_floor();
        let kbt = if temperature < floor {
            floor
        } else {
            temperature * self.control.get_boltzmann_constant()
        };

        let chemical_potential = self.get_chemical_potential_at(kbt);
        let mu = chemical_potential.value;

        if !chemical_potential.converged {
            warn!(
                temperature,
                mu,
                electrons = chemical_potential.electrons,
                nelec = self.n_electrons,
                "chemical potential not converged after {} iterations",
                chemical_potential.iterations
            );
        }

        let smearing = &self.smearing;

        let occupations = self
            .eigenvalues
            .mapv(|e| smearing.get_occupation_number(mu, kbt, e));

        let entropy = self.get_bz_average(|ik, _| {
            occupations
                .index_axis(Axis(0), ik)
                .iter()
                .map(|&f| smearing.get_entropy_term(f))
                .sum()
        });

        let energy = self.get_bz_average(|ik, evals| {
            multizip((evals.iter(), occupations.index_axis(Axis(0), ik).iter()))
                .map(|(&e, &f)| f * e)
                .sum()
        });

        let heat_capacity = self.get_bz_average(|ik, evals| {
            multizip((evals.iter(), occupations.index_axis(Axis(0), ik).iter()))
                .map(|(&e, &f)| smearing.get_heat_capacity_term(mu, kbt, e, f))
                .sum()
        });

        debug!(
            temperature,
            kbt,
            mu,
            iterations = chemical_potential.iterations,
            entropy,
            energy,
            heat_capacity,
            "electron free energy evaluated"
        );

        Ok(&*self.state.insert(ThermalState {
            temperature,
            kbt,
            chemical_potential,
            occupations,
            entropy,
            energy,
            heat_capacity,
        }))
    }

    /// Weighted, degeneracy-scaled electron count per cell at trial chemical
    /// potential `mu` and temperature `kbt` (eV).
    pub fn get_number_of_electrons(&self, mu: f64, kbt: f64) -> f64 {
        self.get_bz_average(|_, evals| {
            evals
                .iter()
                .map(|&e| self.smearing.get_occupation_number(mu, kbt, e))
                .sum()
        })
    }

    fn get_chemical_potential_at(&self, kbt: f64) -> ChemicalPotential {
        // eigenvalues are validated non-empty at construction
        let (emin, emax) = fermilevel::get_initial_bracket(self.eigenvalues.iter())
            .unwrap_or((0.0, 0.0));

        fermilevel::find_chemical_potential(
            emin,
            emax,
            self.n_electrons,
            self.control.get_electron_tolerance(),
            self.control.get_max_bisection_iter(),
            |mu| self.get_number_of_electrons(mu, kbt),
        )
    }

    // g / sum(w) * sum_k w_k * kpoint_sum(k)

    fn get_bz_average<F>(&self, mut kpoint_sum: F) -> f64
    where
        F: FnMut(usize, ArrayView2<f64>) -> f64,
    {
        let mut total = 0.0;

        for (ik, (evals, &w)) in
            multizip((self.eigenvalues.outer_iter(), self.weights.iter())).enumerate()
        {
            total += kpoint_sum(ik, evals) * w;
        }

        total * self.spin_scheme.get_degeneracy() / self.total_weight
    }

    pub fn get_state(&self) -> Option<&ThermalState> {
        self.state.as_ref()
    }

    pub fn get_chemical_potential(&self) -> Option<f64> {
        self.state.as_ref().map(|s| s.chemical_potential.value)
    }

    pub fn get_entropy(&self) -> Option<f64> {
        self.state.as_ref().map(|s| s.entropy)
    }

    pub fn get_energy(&self) -> Option<f64> {
        self.state.as_ref().map(|s| s.energy)
    }

    pub fn get_heat_capacity(&self) -> Option<f64> {
        self.state.as_ref().map(|s| s.heat_capacity)
    }

    pub fn get_free_energy(&self) -> Option<f64> {
        self.state.as_ref().map(|s| s.get_free_energy())
    }

    pub fn get_kbt(&self) -> Option<f64> {
        self.state.as_ref().map(|s| s.kbt)
    }

    pub fn get_occupation_numbers(&self) -> Option<&Array3<f64>> {
        self.state.as_ref().map(|s| &s.occupations)
    }

    pub fn is_converged(&self) -> Option<bool> {
        self.state.as_ref().map(|s| s.chemical_potential.converged)
    }

    /// Eigenvalues in (kpoint, spin, band) order.
    pub fn get_eigenvalues(&self) -> &Array3<f64> {
        &self.eigenvalues
    }

    pub fn get_spin_scheme(&self) -> SpinScheme {
        self.spin_scheme
    }

    pub fn get_degeneracy(&self) -> f64 {
        self.spin_scheme.get_degeneracy()
    }

    pub fn get_n_electrons(&self) -> f64 {
        self.n_electrons
    }

    pub fn get_nkpoints(&self) -> usize {
        self.eigenvalues.len_of(Axis(0))
    }

    pub fn get_nbands(&self) -> usize {
        self.eigenvalues.len_of(Axis(2))
    }

    pub fn get_total_weight(&self) -> f64 {
        self.total_weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array3};

    fn toy_nonspin() -> Array3<f64> {
        array![[[-2.0, -1.0, 0.1, 1.5], [-1.5, -0.1, 0.6, 2.0]]]
    }

    #[test]
    fn axes_are_reordered_to_kpoint_spin_band() {
        let evals = Array3::from_shape_fn((2, 3, 4), |(s, k, b)| (100 * s + 10 * k + b) as f64);
        let efe = ElectronFreeEnergy::with_defaults(evals.view(), &[1, 1, 1], 2.0).unwrap();

        let stored = efe.get_eigenvalues();
        assert_eq!(stored.dim(), (3, 2, 4));
        assert_eq!(stored[[2, 1, 3]], 123.0);
        assert_eq!(stored[[0, 1, 0]], 100.0);
        assert!(stored.is_standard_layout());
        assert_eq!(efe.get_spin_scheme(), SpinScheme::Spin);
        assert_eq!(efe.get_nkpoints(), 3);
        assert_eq!(efe.get_nbands(), 4);
    }

    #[test]
    fn construction_rejects_bad_spin_axis() {
        let evals = Array3::<f64>::zeros((3, 2, 4));
        let err = ElectronFreeEnergy::with_defaults(evals.view(), &[1, 3], 4.0).err();
        assert!(matches!(err, Some(ElectronError::UnsupportedSpinChannels(3))));
    }

    #[test]
    fn construction_rejects_weight_mismatch() {
        let evals = toy_nonspin();
        let err = ElectronFreeEnergy::with_defaults(evals.view(), &[1, 3, 1], 4.0).err();
        assert!(matches!(
            err,
            Some(ElectronError::WeightLengthMismatch {
                weights: 3,
                kpoints: 2
            })
        ));
    }

    #[test]
    fn construction_rejects_negative_and_zero_weights() {
        let evals = toy_nonspin();

        let err = ElectronFreeEnergy::with_defaults(evals.view(), &[1, -3], 4.0).err();
        assert!(matches!(
            err,
            Some(ElectronError::NegativeWeight {
                index: 1,
                weight: -3
            })
        ));

        let err = ElectronFreeEnergy::with_defaults(evals.view(), &[0, 0], 4.0).err();
        assert!(matches!(err, Some(ElectronError::ZeroTotalWeight)));
    }

    #[test]
    fn construction_rejects_bad_values() {
        let mut evals = toy_nonspin();

        let err = ElectronFreeEnergy::with_defaults(evals.view(), &[1, 3], f64::NAN).err();
        assert!(matches!(err, Some(ElectronError::InvalidElectronCount(_))));

        let err = ElectronFreeEnergy::with_defaults(evals.view(), &[1, 3], -1.0).err();
        assert!(matches!(err, Some(ElectronError::InvalidElectronCount(_))));

        evals[[0, 1, 2]] = f64::INFINITY;
        let err = ElectronFreeEnergy::with_defaults(evals.view(), &[1, 3], 4.0).err();
        assert!(matches!(
            err,
            Some(ElectronError::NonFiniteEigenvalue {
                spin: 0,
                kpoint: 1,
                band: 2
            })
        ));

        let empty = Array3::<f64>::zeros((1, 2, 0));
        let err = ElectronFreeEnergy::with_defaults(empty.view(), &[1, 3], 0.0).err();
        assert!(matches!(err, Some(ElectronError::EmptyEigenvalues)));
    }

    #[test]
    fn construction_rejects_invalid_control() {
        let evals = toy_nonspin();
        let mut control = ElectronControl::new();
        control.set_boltzmann_constant(0.0);

        let err = ElectronFreeEnergy::new(evals.view(), &[1, 3], 4.0, control).err();
        assert!(matches!(err, Some(ElectronError::Control(_))));
    }

    #[test]
    fn accessors_are_empty_before_evaluation() {
        let evals = toy_nonspin();
        let efe = ElectronFreeEnergy::with_defaults(evals.view(), &[1, 3], 4.0).unwrap();

        assert!(efe.get_state().is_none());
        assert!(efe.get_chemical_potential().is_none());
        assert!(efe.get_free_energy().is_none());
        assert!(efe.is_converged().is_none());
        assert_eq!(efe.get_total_weight(), 4.0);
        assert_eq!(efe.get_degeneracy(), 2.0);
    }

    #[test]
    fn evaluate_rejects_non_finite_temperature() {
        let evals = toy_nonspin();
        let mut efe = ElectronFreeEnergy::with_defaults(evals.view(), &[1, 3], 4.0).unwrap();

        assert!(matches!(
            efe.evaluate(f64::NAN),
            Err(ElectronError::InvalidTemperature(_))
        ));
        assert!(efe.get_state().is_none());
    }

    #[test]
    fn temperature_below_floor_uses_floor() {
        let evals = toy_nonspin();
        let mut efe = ElectronFreeEnergy::with_defaults(evals.view(), &[1, 3], 4.0).unwrap();

        assert_eq!(efe.evaluate(0.0).unwrap().kbt, 1e-10);
        assert_eq!(efe.evaluate(-5.0).unwrap().kbt, 1e-10);
        assert_relative_eq!(
            efe.evaluate(300.0).unwrap().kbt,
            300.0 * elconsts::BOLTZMANN_CONSTANT_EV
        );
    }

    #[test]
    fn synthetic_boltzmann_constant_scales_temperature() {
        let evals = toy_nonspin();
        let mut control = ElectronControl::new();
        control.set_boltzmann_constant(1.0);

        let mut efe = ElectronFreeEnergy::new(evals.view(), &[1, 3], 4.0, control).unwrap();
        assert_eq!(efe.evaluate(0.05).unwrap().kbt, 0.05);
    }

    #[test]
    fn configured_floor_is_also_the_kelvin_threshold() {
        let evals = toy_nonspin();
        let control = ElectronControl::from_ctrl_str("temperature_floor = 1e-3").unwrap();
        let mut efe = ElectronFreeEnergy::new(evals.view(), &[1, 3], 4.0, control).unwrap();

        // below 1e-3 K: kT is the floor, in eV
        assert_eq!(efe.evaluate(5e-4).unwrap().kbt, 1e-3);

        // at or above 1e-3 K: plain T * k_B, far below the floor
        let kbt = efe.evaluate(2e-3).unwrap().kbt;
        assert_relative_eq!(kbt, 2e-3 * elconsts::BOLTZMANN_CONSTANT_EV);
        assert!(kbt < 1e-3);
    }

    #[test]
    fn bz_average_uses_weights_and_degeneracy() {
        let evals = toy_nonspin();
        let efe = ElectronFreeEnergy::with_defaults(evals.view(), &[1, 3], 4.0).unwrap();

        // one per state: g * nband
        assert_relative_eq!(efe.get_bz_average(|_, e| e.len() as f64), 8.0);

        // (1 * 0 + 3 * 1) / 4 * 2
        assert_relative_eq!(efe.get_bz_average(|ik, _| ik as f64), 1.5);
    }

    #[test]
    fn electron_count_limits() {
        let evals = toy_nonspin();
        let efe = ElectronFreeEnergy::with_defaults(evals.view(), &[1, 3], 4.0).unwrap();

        assert!(efe.get_number_of_electrons(-100.0, 0.01) < 1e-40);
        assert_relative_eq!(efe.get_number_of_electrons(100.0, 0.01), 8.0);
    }

    #[test]
    fn iteration_cap_is_flagged() {
        let evals = toy_nonspin();
        let mut control = ElectronControl::new();
        control.set_max_bisection_iter(2);

        let mut efe = ElectronFreeEnergy::new(evals.view(), &[1, 3], 4.3, control).unwrap();
        let state = efe.evaluate(300.0).unwrap();

        assert!(!state.chemical_potential.converged);
        assert_eq!(state.chemical_potential.iterations, 2);
        assert_eq!(efe.is_converged(), Some(false));
        assert!(efe.get_entropy().unwrap().is_finite());
    }
}
