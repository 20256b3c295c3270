use control::ControlError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ElectronError {
    #[error("unsupported spin-channel count {0}, expected 1 (nonspin) or 2 (spin)")]
    UnsupportedSpinChannels(usize),

    #[error("{weights} k-point weights given for {kpoints} k-points")]
    WeightLengthMismatch { weights: usize, kpoints: usize },

    #[error("negative weight {weight} at k-point {index}")]
    NegativeWeight { index: usize, weight: i64 },

    #[error("k-point weights sum to zero")]
    ZeroTotalWeight,

    #[error("eigenvalue tensor has no states")]
    EmptyEigenvalues,

    #[error("eigenvalue at spin {spin}, k-point {kpoint}, band {band} is not finite")]
    NonFiniteEigenvalue {
        spin: usize,
        kpoint: usize,
        band: usize,
    },

    #[error("invalid electron count {0}")]
    InvalidElectronCount(f64),

    #[error("invalid temperature {0} K")]
    InvalidTemperature(f64),

    #[error("invalid temperature range: min = {t_min}, max = {t_max}, step = {t_step}")]
    InvalidTemperatureRange { t_min: f64, t_max: f64, t_step: f64 },

    #[error(transparent)]
    Control(#[from] ControlError),
}
