// Boltzmann constant

pub const BOLTZMANN_CONSTANT_EV: f64 = 8.617333262145E-5; // eV K^-1

// Fermi-Dirac statistics

pub const OCC_EXPONENT_LIMIT: f64 = 100.0; // |(e - mu) / kT| is clamped to this before exp
pub const MAX_BISECTION_ITER: usize = 1000;

// numerical convergence

pub const EPS8: f64 = 1E-8;
pub const EPS10: f64 = 1E-10;
pub const EPS12: f64 = 1E-12;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_temperature_kt() {
        let kt = BOLTZMANN_CONSTANT_EV * 300.0;
        assert!((kt - 0.025852).abs() < 1e-5);
    }

    #[test]
    fn exponent_limit_keeps_exp_finite() {
        assert!(OCC_EXPONENT_LIMIT.exp().is_finite());
        assert!((-OCC_EXPONENT_LIMIT).exp() > 0.0);
    }
}
