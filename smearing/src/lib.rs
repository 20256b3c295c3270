mod fd;
pub use fd::*;

use control::ElectronControl;

/// Occupation statistics of a single eigenstate.
///
/// `kbt` is the temperature in energy units, already floored away from zero.
pub trait Smearing: Send + Sync {
    fn get_occupation_number(&self, chemical_potential: f64, kbt: f64, electron_energy: f64)
        -> f64;

    /// Entropy contribution of one state in units of k_B.
    fn get_entropy_term(&self, occ: f64) -> f64;

    /// Heat-capacity contribution of one state in units of k_B.
    fn get_heat_capacity_term(
        &self,
        chemical_potential: f64,
        kbt: f64,
        electron_energy: f64,
        occ: f64,
    ) -> f64;
}

pub fn new(control: &ElectronControl) -> Box<dyn Smearing> {
    Box::new(SmearingFD::new(
        control.get_occupation_exponent_limit(),
        control.get_entropy_occupation_cutoff(),
    ))
}
