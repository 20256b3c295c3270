use elconsts::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const OUT_WIDTH1: usize = 28;
const OUT_WIDTH2: usize = 16;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("invalid value '{value}' for control parameter '{key}'")]
    Invalid { key: &'static str, value: String },

    #[error("unknown control parameter '{0}'")]
    UnknownKey(String),

    #[error("malformed control line '{0}', expected 'key = value'")]
    MalformedLine(String),

    #[error("failed to parse control json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Numerical settings of the finite-temperature electron evaluator.
///
/// Energies are in eV and temperatures in K unless stated otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectronControl {
    boltzmann_constant: f64,        // eV / K
    // eV, kT used when T is (numerically) zero. The same number is also the
    // threshold on the input temperature in K: T < temperature_floor maps to it.
    temperature_floor: f64,
    electron_tolerance: f64,        // |n(mu) - nelec| accepted by the bisection
    max_bisection_iter: usize,
    occupation_exponent_limit: f64, // clamp for (e - mu) / kT
    entropy_occupation_cutoff: f64, // f outside (cut, 1 - cut) contributes no entropy
    temperature_step_tolerance: f64,
}

impl Default for ElectronControl {
    fn default() -> Self {
        ElectronControl {
            boltzmann_constant: BOLTZMANN_CONSTANT_EV,
            temperature_floor: EPS10,
            electron_tolerance: EPS10,
            max_bisection_iter: MAX_BISECTION_ITER,
            occupation_exponent_limit: OCC_EXPONENT_LIMIT,
            entropy_occupation_cutoff: EPS12,
            temperature_step_tolerance: EPS8,
        }
    }
}

impl ElectronControl {
    pub fn new() -> ElectronControl {
        ElectronControl::default()
    }

    /// Reads settings from json; absent keys keep their defaults.
    pub fn from_json_str(text: &str) -> Result<ElectronControl, ControlError> {
        let control: ElectronControl = serde_json::from_str(text)?;
        control.validate()?;

        Ok(control)
    }

    /// Reads settings from `key = value` lines. Blank lines and lines starting
    /// with `#` are skipped.
    pub fn from_ctrl_str(text: &str) -> Result<ElectronControl, ControlError> {
        let mut control = ElectronControl::default();

        for line in text.lines().map(|x| x.trim()) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let s: Vec<&str> = line.split('=').map(|x| x.trim()).collect();

            if s.len() != 2 || s[0].is_empty() {
                return Err(ControlError::MalformedLine(line.to_string()));
            }

            match s[0] {
                "boltzmann_constant" => {
                    control.boltzmann_constant = parse_value("boltzmann_constant", s[1])?;
                }

                "temperature_floor" => {
                    control.temperature_floor = parse_value("temperature_floor", s[1])?;
                }

                "electron_tolerance" => {
                    control.electron_tolerance = parse_value("electron_tolerance", s[1])?;
                }

                "max_bisection_iter" => {
                    control.max_bisection_iter = parse_value("max_bisection_iter", s[1])?;
                }

                "occupation_exponent_limit" => {
                    control.occupation_exponent_limit =
                        parse_value("occupation_exponent_limit", s[1])?;
                }

                "entropy_occupation_cutoff" => {
                    control.entropy_occupation_cutoff =
                        parse_value("entropy_occupation_cutoff", s[1])?;
                }

                "temperature_step_tolerance" => {
                    control.temperature_step_tolerance =
                        parse_value("temperature_step_tolerance", s[1])?;
                }

                other => return Err(ControlError::UnknownKey(other.to_string())),
            }
        }

        control.validate()?;

        Ok(control)
    }

    pub fn validate(&self) -> Result<(), ControlError> {
        let positive = [
            ("boltzmann_constant", self.boltzmann_constant),
            ("temperature_floor", self.temperature_floor),
            ("electron_tolerance", self.electron_tolerance),
            ("occupation_exponent_limit", self.occupation_exponent_limit),
            ("temperature_step_tolerance", self.temperature_step_tolerance),
        ];

        for (key, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ControlError::Invalid {
                    key,
                    value: value.to_string(),
                });
            }
        }

        if self.max_bisection_iter == 0 {
            return Err(ControlError::Invalid {
                key: "max_bisection_iter",
                value: "0".to_string(),
            });
        }

        let cut = self.entropy_occupation_cutoff;
        if !(cut > 0.0 && cut < 0.5) {
            return Err(ControlError::Invalid {
                key: "entropy_occupation_cutoff",
                value: cut.to_string(),
            });
        }

        Ok(())
    }

    pub fn get_boltzmann_constant(&self) -> f64 {
        self.boltzmann_constant
    }

    pub fn get_temperature_floor(&self) -> f64 {
        self.temperature_floor
    }

    pub fn get_electron_tolerance(&self) -> f64 {
        self.electron_tolerance
    }

    pub fn get_max_bisection_iter(&self) -> usize {
        self.max_bisection_iter
    }

    pub fn get_occupation_exponent_limit(&self) -> f64 {
        self.occupation_exponent_limit
    }

    pub fn get_entropy_occupation_cutoff(&self) -> f64 {
        self.entropy_occupation_cutoff
    }

    pub fn get_temperature_step_tolerance(&self) -> f64 {
        self.temperature_step_tolerance
    }

    // synthetic constants are handy in tests

    pub fn set_boltzmann_constant(&mut self, boltzmann_constant: f64) {
        self.boltzmann_constant = boltzmann_constant;
    }

    pub fn set_max_bisection_iter(&mut self, max_bisection_iter: usize) {
        self.max_bisection_iter = max_bisection_iter;
    }

    pub fn set_electron_tolerance(&mut self, electron_tolerance: f64) {
        self.electron_tolerance = electron_tolerance;
    }
}

impl fmt::Display for ElectronControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "   {:<width1$} = {:>width2$.6E} eV/K",
            "boltzmann_constant",
            self.boltzmann_constant,
            width1 = OUT_WIDTH1,
            width2 = OUT_WIDTH2
        )?;
        writeln!(
            f,
            "   {:<width1$} = {:>width2$.3E} eV",
            "temperature_floor",
            self.temperature_floor,
            width1 = OUT_WIDTH1,
            width2 = OUT_WIDTH2
        )?;
        writeln!(
            f,
            "   {:<width1$} = {:>width2$.3E}",
            "electron_tolerance",
            self.electron_tolerance,
            width1 = OUT_WIDTH1,
            width2 = OUT_WIDTH2
        )?;
        writeln!(
            f,
            "   {:<width1$} = {:>width2$}",
            "max_bisection_iter",
            self.max_bisection_iter,
            width1 = OUT_WIDTH1,
            width2 = OUT_WIDTH2
        )?;
        writeln!(
            f,
            "   {:<width1$} = {:>width2$}",
            "occupation_exponent_limit",
            self.occupation_exponent_limit,
            width1 = OUT_WIDTH1,
            width2 = OUT_WIDTH2
        )?;
        writeln!(
            f,
            "   {:<width1$} = {:>width2$.3E}",
            "entropy_occupation_cutoff",
            self.entropy_occupation_cutoff,
            width1 = OUT_WIDTH1,
            width2 = OUT_WIDTH2
        )?;
        write!(
            f,
            "   {:<width1$} = {:>width2$.3E} K",
            "temperature_step_tolerance",
            self.temperature_step_tolerance,
            width1 = OUT_WIDTH1,
            width2 = OUT_WIDTH2
        )
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ControlError> {
    value.parse().map_err(|_| ControlError::Invalid {
        key,
        value: value.to_string(),
    })
}
