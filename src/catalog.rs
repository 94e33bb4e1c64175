//! Catalog of containers, units and presets describing one device variant
//!
//! A [`Catalog`] is plain static data. [`Catalog::validate`] checks its structural rules once,
//! when the engine is created, so that lookups afterwards never fail for a well-formed table.

use alloc::vec::Vec;
use core::fmt;

use crate::fifo::FrameType;
use crate::model::{ByteOrder, Container, InfoUnit, Kind, Locator, Value};

/// Named list of configuration assignments
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    /// Preset name
    pub name: &'static str,
    /// Config unit assignments, applied in one `config_write`
    pub assignments: &'static [(&'static str, Value)],
}

/// Structural problem found by [`Catalog::validate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CatalogError {
    /// Two containers or two units share a name
    DuplicateName(&'static str),
    /// Container size is zero or larger than 8 bytes
    InvalidContainerSize(&'static str),
    /// Unit has a zero width or does not fit inside its container
    UnitOutOfRange(&'static str),
    /// Two writable units of the same container share bits
    OverlappingUnits(&'static str, &'static str),
    /// Unit default does not fit in its width
    InvalidDefault(&'static str),
    /// Two frames share a header byte
    DuplicateFrameTag(u8),
    /// Frame payload is described by more than one unit
    MultiUnitFrame(&'static str),
    /// Preset refers to a missing or non-config unit, or to a value outside its domain
    InvalidPreset {
        /// Preset name
        preset: &'static str,
        /// Offending unit name
        unit: &'static str,
    },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateName(name) => write!(f, "name '{name}' is used twice"),
            Self::InvalidContainerSize(name) => {
                write!(f, "container '{name}' must hold 1 to 8 bytes")
            }
            Self::UnitOutOfRange(name) => write!(f, "unit '{name}' does not fit its container"),
            Self::OverlappingUnits(a, b) => write!(f, "units '{a}' and '{b}' overlap"),
            Self::InvalidDefault(name) => write!(f, "default of '{name}' exceeds its width"),
            Self::DuplicateFrameTag(tag) => write!(f, "frame tag {tag:#04x} is used twice"),
            Self::MultiUnitFrame(name) => write!(f, "frame '{name}' must have at most one unit"),
            Self::InvalidPreset { preset, unit } => {
                write!(f, "preset '{preset}' has an invalid assignment for '{unit}'")
            }
        }
    }
}

/// Complete description of a device variant
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    /// Variant name
    pub name: &'static str,
    /// Byte order of multi-byte registers and frame payloads
    pub byte_order: ByteOrder,
    /// Registers and frames
    pub containers: &'static [Container],
    /// Named configuration presets
    pub presets: &'static [Preset],
}

impl Catalog {
    /// Iterate over every unit together with its container
    pub fn units(&self) -> impl Iterator<Item = (&'static Container, &'static InfoUnit)> {
        self.containers
            .iter()
            .flat_map(|container| container.units.iter().map(move |unit| (container, unit)))
    }

    /// Find a unit by name
    #[must_use]
    pub fn find(&self, name: &str) -> Option<(&'static Container, &'static InfoUnit)> {
        self.units().find(|(_, unit)| unit.name == name)
    }

    /// Find a container by name
    #[must_use]
    pub fn container(&self, name: &str) -> Option<&'static Container> {
        self.containers
            .iter()
            .find(|container| container.name == name)
    }

    /// Find the frame container introduced by `tag`
    #[must_use]
    pub fn frame(&self, tag: u8) -> Option<(FrameType, &'static Container)> {
        self.containers
            .iter()
            .find_map(|container| match container.locator {
                Locator::Frame {
                    tag: frame_tag,
                    frame_type,
                } if frame_tag == tag => Some((frame_type, container)),
                _ => None,
            })
    }

    /// Names of every unit, in catalog order
    #[must_use]
    pub fn unit_names(&self) -> Vec<&'static str> {
        self.units().map(|(_, unit)| unit.name).collect()
    }

    /// Containers holding units of `kind`
    pub fn containers_of(&self, kind: Kind) -> impl Iterator<Item = &'static Container> {
        self.containers
            .iter()
            .filter(move |container| container.kind == kind)
    }

    /// Find a preset by name
    #[must_use]
    pub fn preset(&self, name: &str) -> Option<&'static Preset> {
        self.presets.iter().find(|preset| preset.name == name)
    }

    /// Names of every preset
    #[must_use]
    pub fn preset_names(&self) -> Vec<&'static str> {
        self.presets.iter().map(|preset| preset.name).collect()
    }

    /// Check the structural rules of the catalog
    ///
    /// Read-only units may alias each other (several views of the same data register), writable
    /// units may not, since a write to one would silently change the other.
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogError`] found.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for (i, container) in self.containers.iter().enumerate() {
            if self.containers[..i].iter().any(|c| c.name == container.name) {
                return Err(CatalogError::DuplicateName(container.name));
            }
            if container.size_bytes == 0 || container.size_bytes > 8 {
                return Err(CatalogError::InvalidContainerSize(container.name));
            }
            if let Locator::Frame { tag, .. } = container.locator {
                if self.containers[..i]
                    .iter()
                    .any(|c| matches!(c.locator, Locator::Frame { tag: t, .. } if t == tag))
                {
                    return Err(CatalogError::DuplicateFrameTag(tag));
                }
                if container.units.len() > 1 {
                    return Err(CatalogError::MultiUnitFrame(container.name));
                }
            }
            Self::validate_units(container)?;
        }

        let units: Vec<_> = self.units().map(|(_, unit)| unit.name).collect();
        for (i, name) in units.iter().enumerate() {
            if units[..i].contains(name) {
                return Err(CatalogError::DuplicateName(*name));
            }
        }

        for preset in self.presets {
            for &(name, value) in preset.assignments {
                let valid = self
                    .find(name)
                    .is_some_and(|(_, unit)| unit.kind == Kind::Config && unit.pack::<()>(value).is_ok());
                if !valid {
                    return Err(CatalogError::InvalidPreset {
                        preset: preset.name,
                        unit: name,
                    });
                }
            }
        }

        Ok(())
    }

    fn validate_units(container: &Container) -> Result<(), CatalogError> {
        for (i, unit) in container.units.iter().enumerate() {
            if unit.width == 0 || unit.end() > container.size_bits() {
                return Err(CatalogError::UnitOutOfRange(unit.name));
            }
            if unit.default_bits & !unit.mask() != 0 {
                return Err(CatalogError::InvalidDefault(unit.name));
            }
            if !unit.kind.is_writable() {
                continue;
            }
            if let Some(other) = container.units[..i]
                .iter()
                .find(|other| other.kind.is_writable() && other.span() & unit.span() != 0)
            {
                return Err(CatalogError::OverlappingUnits(other.name, unit.name));
            }
        }
        Ok(())
    }
}
