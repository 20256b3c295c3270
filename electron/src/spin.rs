use crate::ElectronError;

/// Spin treatment selected from the length of the spin axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinScheme {
    /// One channel; every band holds two electrons.
    NonSpin,
    /// Two explicit channels; every band holds one electron.
    Spin,
}

impl SpinScheme {
    pub fn from_spin_channels(nspin: usize) -> Result<SpinScheme, ElectronError> {
        match nspin {
            1 => Ok(SpinScheme::NonSpin),
            2 => Ok(SpinScheme::Spin),
            other => Err(ElectronError::UnsupportedSpinChannels(other)),
        }
    }

    pub fn get_degeneracy(&self) -> f64 {
        match self {
            SpinScheme::NonSpin => 2.0,
            SpinScheme::Spin => 1.0,
        }
    }

    pub fn get_nspin(&self) -> usize {
        match self {
            SpinScheme::NonSpin => 1,
            SpinScheme::Spin => 2,
        }
    }
}
