use crate::Smearing;
use elconsts::*;

/// Fermi-Dirac statistics with the exponent clamped to `[-exponent_limit, exponent_limit]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmearingFD {
    exponent_limit: f64,
    entropy_cutoff: f64,
}

impl Default for SmearingFD {
    fn default() -> Self {
        SmearingFD::new(OCC_EXPONENT_LIMIT, EPS12)
    }
}

impl SmearingFD {
    pub fn new(exponent_limit: f64, entropy_cutoff: f64) -> SmearingFD {
        SmearingFD {
            exponent_limit,
            entropy_cutoff,
        }
    }
}

impl Smearing for SmearingFD {
    fn get_occupation_number(
        &self,
        chemical_potential: f64,
        kbt: f64,
        electron_energy: f64,
    ) -> f64 {
        let x = ((electron_energy - chemical_potential) / kbt)
            .clamp(-self.exponent_limit, self.exponent_limit);

        1.0 / (1.0 + x.exp())
    }

    fn get_entropy_term(&self, occ: f64) -> f64 {
        if occ <= self.entropy_cutoff || occ >= 1.0 - self.entropy_cutoff {
            return 0.0;
        }

        -(occ * occ.ln() + (1.0 - occ) * (1.0 - occ).ln())
    }

    fn get_heat_capacity_term(
        &self,
        chemical_potential: f64,
        kbt: f64,
        electron_energy: f64,
        occ: f64,
    ) -> f64 {
        let x = (electron_energy - chemical_potential) / kbt;

        x * x * occ * (1.0 - occ)
    }
}
