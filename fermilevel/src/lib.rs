//! Chemical potential by bisection on the total electron count.
//!
//! The electron count must be non-decreasing in the trial chemical potential,
//! which holds for any Fermi-Dirac occupation at fixed eigenvalues and
//! temperature.

/// Outcome of a chemical-potential search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChemicalPotential {
    /// Chemical potential in the energy unit of the eigenvalues.
    pub value: f64,
    /// Electron count at `value`.
    pub electrons: f64,
    /// Number of electron-count evaluations spent inside the bracket loop.
    pub iterations: usize,
    /// `false` when the iteration cap was hit before `|n - nelec| < tolerance`.
    /// The last midpoint is still returned in that case.
    pub converged: bool,
}

/// Smallest and largest eigenvalue, used as the initial bracket.
pub fn get_initial_bracket<'a, I>(evals: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = &'a f64>,
{
    evals.into_iter().fold(None, |acc, &e| match acc {
        None => Some((e, e)),
        Some((lower, upper)) => Some((lower.min(e), upper.max(e))),
    })
}

/// Bisects `[lower, upper]` starting from its midpoint until the electron count
/// matches `nelec` within `tolerance` or `max_iter` evaluations are spent.
pub fn find_chemical_potential<F>(
    lower: f64,
    upper: f64,
    nelec: f64,
    tolerance: f64,
    max_iter: usize,
    mut total_electrons: F,
) -> ChemicalPotential
where
    F: FnMut(f64) -> f64,
{
    let mut lower = lower;
    let mut upper = upper;

    let mut fermi_level = (lower + upper) / 2.0;

    for iter in 0..max_iter {
        let ntot = total_electrons(fermi_level);

        if (ntot - nelec).abs() < tolerance {
            return ChemicalPotential {
                value: fermi_level,
                electrons: ntot,
                iterations: iter + 1,
                converged: true,
            };
        }

        if ntot < nelec {
            lower = fermi_level;
        } else {
            upper = fermi_level;
        }

        fermi_level = (upper + lower) / 2.0;
    }

    let ntot = total_electrons(fermi_level);

    ChemicalPotential {
        value: fermi_level,
        electrons: ntot,
        iterations: max_iter,
        converged: (ntot - nelec).abs() < tolerance,
    }
}
