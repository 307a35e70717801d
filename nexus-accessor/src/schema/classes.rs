//! The base classes embedded in the crate, and typed literal sets for
//! enumerations applications commonly branch on.
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Base classes whose NXDL definitions ship with the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter)]
pub enum NexusClass {
    #[strum(serialize = "NXaperture")]
    Aperture,
    #[strum(serialize = "NXattenuator")]
    Attenuator,
    #[strum(serialize = "NXbeam_stop")]
    BeamStop,
    #[strum(serialize = "NXbending_magnet")]
    BendingMagnet,
    #[strum(serialize = "NXcg_cylinder_set")]
    CgCylinderSet,
    #[strum(serialize = "NXcollimator")]
    Collimator,
    #[strum(serialize = "NXcylindrical_geometry")]
    CylindricalGeometry,
    #[strum(serialize = "NXdetector")]
    Detector,
    #[strum(serialize = "NXdisk_chopper")]
    DiskChopper,
    #[strum(serialize = "NXentry")]
    Entry,
    #[strum(serialize = "NXgeometry")]
    Geometry,
    #[strum(serialize = "NXinstrument")]
    Instrument,
    #[strum(serialize = "NXlog")]
    Log,
    #[strum(serialize = "NXmoderator")]
    Moderator,
    #[strum(serialize = "NXoff_geometry")]
    OffGeometry,
    #[strum(serialize = "NXorientation")]
    Orientation,
    #[strum(serialize = "NXsample")]
    Sample,
    #[strum(serialize = "NXshape")]
    Shape,
    #[strum(serialize = "NXslit")]
    Slit,
    #[strum(serialize = "NXsource")]
    Source,
    #[strum(serialize = "NXtransformations")]
    Transformations,
    #[strum(serialize = "NXtranslation")]
    Translation,
}

impl NexusClass {
    pub(crate) fn nxdl(&self) -> &'static str {
        match self {
            Self::Aperture => include_str!("../../nxdl/NXaperture.nxdl.xml"),
            Self::Attenuator => include_str!("../../nxdl/NXattenuator.nxdl.xml"),
            Self::BeamStop => include_str!("../../nxdl/NXbeam_stop.nxdl.xml"),
            Self::BendingMagnet => include_str!("../../nxdl/NXbending_magnet.nxdl.xml"),
            Self::CgCylinderSet => include_str!("../../nxdl/NXcg_cylinder_set.nxdl.xml"),
            Self::Collimator => include_str!("../../nxdl/NXcollimator.nxdl.xml"),
            Self::CylindricalGeometry => {
                include_str!("../../nxdl/NXcylindrical_geometry.nxdl.xml")
            }
            Self::Detector => include_str!("../../nxdl/NXdetector.nxdl.xml"),
            Self::DiskChopper => include_str!("../../nxdl/NXdisk_chopper.nxdl.xml"),
            Self::Entry => include_str!("../../nxdl/NXentry.nxdl.xml"),
            Self::Geometry => include_str!("../../nxdl/NXgeometry.nxdl.xml"),
            Self::Instrument => include_str!("../../nxdl/NXinstrument.nxdl.xml"),
            Self::Log => include_str!("../../nxdl/NXlog.nxdl.xml"),
            Self::Moderator => include_str!("../../nxdl/NXmoderator.nxdl.xml"),
            Self::OffGeometry => include_str!("../../nxdl/NXoff_geometry.nxdl.xml"),
            Self::Orientation => include_str!("../../nxdl/NXorientation.nxdl.xml"),
            Self::Sample => include_str!("../../nxdl/NXsample.nxdl.xml"),
            Self::Shape => include_str!("../../nxdl/NXshape.nxdl.xml"),
            Self::Slit => include_str!("../../nxdl/NXslit.nxdl.xml"),
            Self::Source => include_str!("../../nxdl/NXsource.nxdl.xml"),
            Self::Transformations => include_str!("../../nxdl/NXtransformations.nxdl.xml"),
            Self::Translation => include_str!("../../nxdl/NXtranslation.nxdl.xml"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter)]
pub enum TransformationType {
    #[strum(serialize = "translation")]
    Translation,
    #[strum(serialize = "rotation")]
    Rotation,
}

/// `NXmoderator/type`. The water literals are spelt with a zero, as in the definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter)]
pub enum ModeratorType {
    #[strum(serialize = "H20")]
    LightWater,
    #[strum(serialize = "D20")]
    HeavyWater,
    #[strum(serialize = "Liquid H2")]
    LiquidHydrogen,
    #[strum(serialize = "Liquid CH4")]
    LiquidMethane,
    #[strum(serialize = "Liquid D2")]
    LiquidDeuterium,
    #[strum(serialize = "Solid D2")]
    SolidDeuterium,
    #[strum(serialize = "C")]
    Graphite,
    #[strum(serialize = "Solid CH4")]
    SolidMethane,
    #[strum(serialize = "Solid H2")]
    SolidHydrogen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter)]
pub enum SourceType {
    #[strum(serialize = "Spallation Neutron Source")]
    SpallationNeutron,
    #[strum(serialize = "Pulsed Reactor Neutron Source")]
    PulsedReactorNeutron,
    #[strum(serialize = "Reactor Neutron Source")]
    ReactorNeutron,
    #[strum(serialize = "Synchrotron X-ray Source")]
    SynchrotronXray,
    #[strum(serialize = "Pulsed Muon Source")]
    PulsedMuon,
    #[strum(serialize = "Rotating Anode X-ray")]
    RotatingAnodeXray,
    #[strum(serialize = "Fixed Tube X-ray")]
    FixedTubeXray,
    #[strum(serialize = "UV Laser")]
    UvLaser,
    #[strum(serialize = "Free-Electron Laser")]
    FreeElectronLaser,
    #[strum(serialize = "Optical Laser")]
    OpticalLaser,
    #[strum(serialize = "Ion Source")]
    Ion,
    #[strum(serialize = "UV Plasma Source")]
    UvPlasma,
    #[strum(serialize = "Metal Jet X-ray")]
    MetalJetXray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter)]
pub enum SourceProbe {
    #[strum(serialize = "neutron")]
    Neutron,
    #[strum(serialize = "photon")]
    Photon,
    #[strum(serialize = "x-ray")]
    Xray,
    #[strum(serialize = "muon")]
    Muon,
    #[strum(serialize = "electron")]
    Electron,
    #[strum(serialize = "ultraviolet")]
    Ultraviolet,
    #[strum(serialize = "visible light")]
    VisibleLight,
    #[strum(serialize = "positron")]
    Positron,
    #[strum(serialize = "proton")]
    Proton,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter)]
pub enum CollimatorType {
    Soller,
    #[strum(serialize = "radial")]
    Radial,
    #[strum(serialize = "oscillating")]
    Oscillating,
    #[strum(serialize = "honeycomb")]
    Honeycomb,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_nxdl;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn embedded_definitions_parse_under_their_class_name() {
        for class in NexusClass::iter() {
            let schema = parse_nxdl(class.nxdl()).unwrap();
            assert_eq!(schema.class, class.to_string());
        }
    }

    #[test]
    fn class_names_round_trip() {
        assert_eq!(NexusClass::OffGeometry.to_string(), "NXoff_geometry");
        assert_eq!(
            NexusClass::from_str("NXtransformations").unwrap(),
            NexusClass::Transformations
        );
        assert!(NexusClass::from_str("NXroot").is_err());
    }

    /// Every typed literal must be one the embedded definition declares.
    fn assert_literals_declared<E: IntoEnumIterator + ToString>(
        class: NexusClass,
        field: &str,
    ) {
        let schema = parse_nxdl(class.nxdl()).unwrap();
        let enumeration = schema
            .field(field)
            .and_then(|field| field.enumeration.clone())
            .unwrap();
        for literal in E::iter() {
            assert!(
                enumeration.admits(&literal.to_string()),
                "{} not declared by {class}/{field}",
                literal.to_string()
            );
        }
    }

    #[test]
    fn typed_literals_are_declared() {
        assert_literals_declared::<ModeratorType>(NexusClass::Moderator, "type");
        assert_literals_declared::<SourceType>(NexusClass::Source, "type");
        assert_literals_declared::<SourceProbe>(NexusClass::Source, "probe");
        assert_literals_declared::<CollimatorType>(NexusClass::Collimator, "type");
    }

    #[test]
    fn transformation_types_are_declared() {
        let schema = parse_nxdl(NexusClass::Transformations.nxdl()).unwrap();
        let enumeration = schema
            .field("AXISNAME")
            .and_then(|field| field.attribute("transformation_type"))
            .and_then(|attribute| attribute.enumeration.clone())
            .unwrap();
        for literal in TransformationType::iter() {
            assert!(enumeration.admits(literal.as_ref()));
        }
    }

    #[test]
    fn moderator_literal_with_space() {
        assert_eq!(
            ModeratorType::from_str("Liquid H2").unwrap(),
            ModeratorType::LiquidHydrogen
        );
        assert!(ModeratorType::from_str("Plasma").is_err());
    }
}
