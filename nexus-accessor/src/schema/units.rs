use serde::{Serialize, Serializer};

/// The NXDL unit categories a field may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
pub enum NexusUnitCategory {
    #[strum(serialize = "NX_ANGLE")]
    Angle,
    #[strum(serialize = "NX_ANY")]
    Any,
    #[strum(serialize = "NX_AREA")]
    Area,
    #[strum(serialize = "NX_CHARGE")]
    Charge,
    #[strum(serialize = "NX_COUNT")]
    Count,
    #[strum(serialize = "NX_CROSS_SECTION")]
    CrossSection,
    #[strum(serialize = "NX_CURRENT")]
    Current,
    #[strum(serialize = "NX_DIMENSIONLESS")]
    Dimensionless,
    #[strum(serialize = "NX_EMITTANCE")]
    Emittance,
    #[strum(serialize = "NX_ENERGY")]
    Energy,
    #[strum(serialize = "NX_FLUX")]
    Flux,
    #[strum(serialize = "NX_FREQUENCY")]
    Frequency,
    #[strum(serialize = "NX_LENGTH")]
    Length,
    #[strum(serialize = "NX_MASS")]
    Mass,
    #[strum(serialize = "NX_MASS_DENSITY")]
    MassDensity,
    #[strum(serialize = "NX_MOLECULAR_WEIGHT")]
    MolecularWeight,
    #[strum(serialize = "NX_PERIOD")]
    Period,
    #[strum(serialize = "NX_PER_AREA")]
    PerArea,
    #[strum(serialize = "NX_PER_LENGTH")]
    PerLength,
    #[strum(serialize = "NX_POWER")]
    Power,
    #[strum(serialize = "NX_PRESSURE")]
    Pressure,
    #[strum(serialize = "NX_PULSES")]
    Pulses,
    #[strum(serialize = "NX_SCATTERING_LENGTH_DENSITY")]
    ScatteringLengthDensity,
    #[strum(serialize = "NX_SOLID_ANGLE")]
    SolidAngle,
    #[strum(serialize = "NX_TEMPERATURE")]
    Temperature,
    #[strum(serialize = "NX_TIME")]
    Time,
    #[strum(serialize = "NX_TIME_OF_FLIGHT")]
    TimeOfFlight,
    #[strum(serialize = "NX_TRANSFORMATION")]
    Transformation,
    #[strum(serialize = "NX_UNITLESS")]
    Unitless,
    #[strum(serialize = "NX_VOLTAGE")]
    Voltage,
    #[strum(serialize = "NX_VOLUME")]
    Volume,
    #[strum(serialize = "NX_WAVELENGTH")]
    Wavelength,
    #[strum(serialize = "NX_WAVENUMBER")]
    Wavenumber,
}

impl NexusUnitCategory {
    /// Whether a field of this category is expected to carry a `units` attribute.
    pub fn requires_units(&self) -> bool {
        !matches!(self, Self::Unitless | Self::Dimensionless | Self::Count)
    }
}

impl Serialize for NexusUnitCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn round_trips_through_names() {
        let category = NexusUnitCategory::from_str("NX_TEMPERATURE").unwrap();
        assert_eq!(category, NexusUnitCategory::Temperature);
        assert_eq!(category.to_string(), "NX_TEMPERATURE");
    }

    #[test]
    fn unitless_needs_no_units() {
        assert!(!NexusUnitCategory::Unitless.requires_units());
        assert!(NexusUnitCategory::Length.requires_units());
    }
}
