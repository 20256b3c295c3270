//! Thermodynamics of the electron gas in a metal under the fixed
//! density-of-states approximation.
//!
//! Band eigenvalues on a symmetry-reduced k-point set are frozen; for every
//! temperature the chemical potential is solved so that the Fermi-Dirac
//! occupations hold the requested number of electrons, and entropy, energy,
//! free energy and heat capacity follow from those occupations.

mod error;
pub use error::*;

mod spin;
pub use spin::*;

mod free_energy;
pub use free_energy::*;

mod sweep;
pub use sweep::*;

pub use control::ElectronControl;
pub use fermilevel::ChemicalPotential;
