//! Bed surface types and the temperature aliases that depend on them.
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Configuration key holding the active bed type.
pub const BED_TYPE_KEY: &str = "curr_bed_type";

/// Bed surface types known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BedType {
    /// Cool plate with SuperTack coating.
    SuperTack,
    /// Smooth cool plate (PC).
    CoolPlate,
    /// Textured cool plate (PCT).
    TexturedCoolPlate,
    /// Engineering plate (EP).
    EngineeringPlate,
    /// Smooth high temperature PEI plate; the engine default.
    #[default]
    HighTempPlate,
    /// Textured PEI plate (PTE).
    TexturedPeiPlate,
}

impl BedType {
    /// Every bed type, in engine enumeration order.
    pub const ALL: [Self; 6] = [
        Self::SuperTack,
        Self::CoolPlate,
        Self::TexturedCoolPlate,
        Self::EngineeringPlate,
        Self::HighTempPlate,
        Self::TexturedPeiPlate,
    ];

    /// Value stored under [`BED_TYPE_KEY`].
    #[must_use]
    pub const fn config_name(self) -> &'static str {
        match self {
            Self::SuperTack => "Supertack Plate",
            Self::CoolPlate => "Cool Plate",
            Self::TexturedCoolPlate => "Textured Cool Plate",
            Self::EngineeringPlate => "Engineering Plate",
            Self::HighTempPlate => "High Temp Plate",
            Self::TexturedPeiPlate => "Textured PEI Plate",
        }
    }

    const fn short_code(self) -> &'static str {
        match self {
            Self::SuperTack => "SuperTack",
            Self::CoolPlate => "PC",
            Self::TexturedCoolPlate => "PCT",
            Self::EngineeringPlate => "EP",
            Self::HighTempPlate => "PEI",
            Self::TexturedPeiPlate => "PTE",
        }
    }

    /// Bed temperature key for this surface.
    #[must_use]
    pub const fn temperature_key(self, first_layer: bool) -> &'static str {
        match (self, first_layer) {
            (Self::SuperTack, false) => "supertack_plate_temp",
            (Self::SuperTack, true) => "supertack_plate_temp_initial_layer",
            (Self::CoolPlate, false) => "cool_plate_temp",
            (Self::CoolPlate, true) => "cool_plate_temp_initial_layer",
            (Self::TexturedCoolPlate, false) => "textured_cool_plate_temp",
            (Self::TexturedCoolPlate, true) => "textured_cool_plate_temp_initial_layer",
            (Self::EngineeringPlate, false) => "eng_plate_temp",
            (Self::EngineeringPlate, true) => "eng_plate_temp_initial_layer",
            (Self::HighTempPlate, false) => "hot_plate_temp",
            (Self::HighTempPlate, true) => "hot_plate_temp_initial_layer",
            (Self::TexturedPeiPlate, false) => "textured_plate_temp",
            (Self::TexturedPeiPlate, true) => "textured_plate_temp_initial_layer",
        }
    }
}

impl fmt::Display for BedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_name())
    }
}

impl FromStr for BedType {
    type Err = String;

    /// Accepts the configuration name (`"Textured PEI Plate"`), the short
    /// code (`"PTE"`) or the engine enumerator (`"btPTE"`), ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        let code = wanted
            .strip_prefix("bt")
            .filter(|rest| !rest.is_empty())
            .unwrap_or(wanted);
        Self::ALL
            .into_iter()
            .find(|bed| {
                bed.config_name().eq_ignore_ascii_case(wanted)
                    || bed.short_code().eq_ignore_ascii_case(code)
            })
            .ok_or_else(|| format!("unknown bed type '{wanted}'"))
    }
}

/// A temperature alias whose concrete key depends on the bed type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BedAlias {
    /// Bed temperature for the first layer.
    FirstLayerBedTemperature,
    /// Bed temperature for the remaining layers.
    BedTemperature,
}

impl BedAlias {
    /// Return `true` for the first-layer alias.
    #[must_use]
    pub const fn is_first_layer(self) -> bool {
        matches!(self, Self::FirstLayerBedTemperature)
    }
}

/// Alias keys recognised in CLI overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BedAliasMap {
    aliases: Vec<(String, BedAlias)>,
}

impl Default for BedAliasMap {
    fn default() -> Self {
        Self {
            aliases: vec![
                (
                    "first_layer_bed_temperature".to_string(),
                    BedAlias::FirstLayerBedTemperature,
                ),
                ("bed_temperature".to_string(), BedAlias::BedTemperature),
            ],
        }
    }
}

impl BedAliasMap {
    /// Alias registered for `key`.
    #[must_use]
    pub fn alias(&self, key: &str) -> Option<BedAlias> {
        self.aliases
            .iter()
            .find(|(alias_key, _)| alias_key == key)
            .map(|(_, alias)| *alias)
    }

    /// Map `key` to the concrete key for the active bed type.
    ///
    /// Returns `Ok(None)` when `key` is not an alias. A missing bed type
    /// means the default surface.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AliasResolution`] if the bed type is unknown.
    pub fn resolve_key(
        &self,
        key: &str,
        active_bed_type: Option<&str>,
    ) -> Result<Option<&'static str>, ConfigError> {
        let Some(alias) = self.alias(key) else {
            return Ok(None);
        };
        let bed_type = active_bed_type.unwrap_or(BedType::default().config_name());
        resolve(key, bed_type, alias.is_first_layer()).map(Some)
    }
}

/// Map a bed temperature alias to its concrete key for `active_bed_type`.
///
/// # Examples
///
/// ```
/// use orcaslicer_cli::resolver::bed;
///
/// let key = bed::resolve("first_layer_bed_temperature", "Textured PEI Plate", true).unwrap();
/// assert_eq!(key, "textured_plate_temp_initial_layer");
/// ```
///
/// # Errors
///
/// Returns [`ConfigError::AliasResolution`] if `active_bed_type` is not one of
/// the known bed types.
pub fn resolve(
    alias_key: &str,
    active_bed_type: &str,
    is_first_layer: bool,
) -> Result<&'static str, ConfigError> {
    active_bed_type
        .parse::<BedType>()
        .map(|bed| bed.temperature_key(is_first_layer))
        .map_err(|_| ConfigError::AliasResolution {
            alias: alias_key.to_string(),
            bed_type: active_bed_type.to_string(),
        })
}
