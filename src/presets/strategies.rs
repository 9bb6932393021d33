//! Named fallback strategies that propose preset names from project evidence.
//!
//! A strategy only proposes; the selector decides whether the proposal
//! exists. Strategies are tried in order and a rejected proposal moves on to
//! the next one.
use std::fmt;

use super::{EmbeddedPresetNames, Preset, PresetBundle, PresetCategory};
use crate::config::NamingConventions;
use crate::plate::PlateMetadata;

/// Evidence about the intended presets, gathered from the project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionHints {
    /// Preset names the project was saved with.
    pub embedded: EmbeddedPresetNames,
    /// Preset names recorded in the project configuration (`*_settings_id`,
    /// then `default_*_profile`). Never makes a selection strict.
    pub recorded: EmbeddedPresetNames,
    /// Plate-level printer model and nozzle hints.
    pub plate: PlateMetadata,
    /// `printer_model` from the project configuration.
    pub printer_model: Option<String>,
    /// `printer_variant` from the project configuration.
    pub printer_variant: Option<String>,
    /// `default_print_profile` from the project configuration.
    pub default_print_profile: Option<String>,
    /// `print_compatible_printers` from the project configuration.
    pub print_compatible_printers: Vec<String>,
}

/// Everything a strategy may look at.
#[derive(Debug, Clone, Copy)]
pub struct StrategyInput<'a> {
    /// Project evidence.
    pub hints: &'a SelectionHints,
    /// The loaded presets (read-only).
    pub catalog: &'a PresetBundle,
    /// The selected printer, if any.
    pub printer: Option<&'a Preset>,
    /// Naming conventions for derived names.
    pub conventions: &'a NamingConventions,
}

impl StrategyInput<'_> {
    /// Printer model: the selected printer's declared model, else the project's.
    fn printer_model(&self) -> Option<String> {
        self.printer
            .and_then(|p| p.printer_model.clone())
            .or_else(|| self.hints.printer_model.clone())
    }
}

/// A named, pure proposal rule.
pub trait NamingStrategy: Send + Sync + fmt::Debug {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Propose a preset name, or `None` when the evidence is missing.
    fn propose(&self, input: &StrategyInput<'_>) -> Option<String>;
}

/// The name embedded in the project for one category, else the name its
/// configuration recorded.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedName(pub PresetCategory);

impl NamingStrategy for EmbeddedName {
    fn name(&self) -> &'static str {
        "embedded-name"
    }

    fn propose(&self, input: &StrategyInput<'_>) -> Option<String> {
        input
            .hints
            .embedded
            .explicit(self.0)
            .or_else(|| input.hints.recorded.explicit(self.0))
            .map(str::to_string)
    }
}

/// The printer whose declared model and variant match the plate's model id
/// and nozzle diameter.
#[derive(Debug, Clone, Copy)]
pub struct PlateModelVariant;

impl NamingStrategy for PlateModelVariant {
    fn name(&self) -> &'static str {
        "plate-model-variant"
    }

    fn propose(&self, input: &StrategyInput<'_>) -> Option<String> {
        let plate = &input.hints.plate;
        let model_id = plate.printer_model_id.as_deref()?;
        let variant = plate.nozzle_variant.as_deref()?;
        let model = input.catalog.model_name(model_id).unwrap_or(model_id);
        input
            .catalog
            .printers
            .visible()
            .find(|p| {
                p.printer_model.as_deref() == Some(model)
                    && p.printer_variant
                        .as_deref()
                        .is_some_and(|v| variant_matches(v, variant))
            })
            .map(|p| p.name.clone())
    }
}

/// `"<model> <variant> nozzle"` built from the project's printer model and
/// variant.
///
/// A missing model is recovered from the `@<tag> <model>` suffix of
/// `default_print_profile`; a missing variant from the plate's nozzle.
#[derive(Debug, Clone, Copy)]
pub struct DerivedModelName;

impl NamingStrategy for DerivedModelName {
    fn name(&self) -> &'static str {
        "derived-model-name"
    }

    fn propose(&self, input: &StrategyInput<'_>) -> Option<String> {
        let hints = input.hints;
        let model = hints.printer_model.clone().or_else(|| {
            hints
                .default_print_profile
                .as_deref()
                .and_then(|profile| input.conventions.model_from_suffixed_name(profile))
        })?;
        let variant = hints
            .printer_variant
            .as_deref()
            .or(hints.plate.nozzle_variant.as_deref())?;
        Some(format!("{model} {variant} nozzle"))
    }
}

/// The first printer of the process's compatible-printer list that exists.
#[derive(Debug, Clone, Copy)]
pub struct CompatibleFromProcess;

impl NamingStrategy for CompatibleFromProcess {
    fn name(&self) -> &'static str {
        "compatible-from-process"
    }

    fn propose(&self, input: &StrategyInput<'_>) -> Option<String> {
        input
            .hints
            .print_compatible_printers
            .iter()
            .find(|name| input.catalog.printers.find(name).is_some())
            .cloned()
    }
}

/// The configured base filament or process, suffixed for the printer model:
/// `"<base> @<tag> <model>"`.
#[derive(Debug, Clone, Copy)]
pub struct ModelSuffixedBase(pub PresetCategory);

impl NamingStrategy for ModelSuffixedBase {
    fn name(&self) -> &'static str {
        "model-suffixed-base"
    }

    fn propose(&self, input: &StrategyInput<'_>) -> Option<String> {
        let base = base_name(self.0, input.conventions)?;
        let model = input.printer_model()?;
        Some(format!("{base} {}", input.conventions.model_suffix(&model)))
    }
}

/// The configured base filament name, unsuffixed.
#[derive(Debug, Clone, Copy)]
pub struct BaseName(pub PresetCategory);

impl NamingStrategy for BaseName {
    fn name(&self) -> &'static str {
        "base-name"
    }

    fn propose(&self, input: &StrategyInput<'_>) -> Option<String> {
        base_name(self.0, input.conventions).map(str::to_string)
    }
}

/// The first process compatible with the printer whose name contains
/// `Standard`.
#[derive(Debug, Clone, Copy)]
pub struct FirstCompatibleStandard;

impl NamingStrategy for FirstCompatibleStandard {
    fn name(&self) -> &'static str {
        "first-compatible-standard"
    }

    fn propose(&self, input: &StrategyInput<'_>) -> Option<String> {
        let printer = input.printer?;
        input
            .catalog
            .processes
            .visible()
            .find(|p| p.name.contains("Standard") && p.is_compatible_with(&printer.name))
            .map(|p| p.name.clone())
    }
}

/// Ordered strategy lists per category.
#[derive(Debug)]
pub struct StrategySet {
    /// Printer strategies.
    pub printer: Vec<Box<dyn NamingStrategy>>,
    /// Filament strategies.
    pub filament: Vec<Box<dyn NamingStrategy>>,
    /// Process strategies.
    pub process: Vec<Box<dyn NamingStrategy>>,
}

impl Default for StrategySet {
    fn default() -> Self {
        Self {
            printer: vec![
                Box::new(EmbeddedName(PresetCategory::Printer)),
                Box::new(PlateModelVariant),
                Box::new(DerivedModelName),
                Box::new(CompatibleFromProcess),
            ],
            filament: vec![
                Box::new(EmbeddedName(PresetCategory::Filament)),
                Box::new(ModelSuffixedBase(PresetCategory::Filament)),
                Box::new(BaseName(PresetCategory::Filament)),
            ],
            process: vec![
                Box::new(EmbeddedName(PresetCategory::Process)),
                Box::new(ModelSuffixedBase(PresetCategory::Process)),
                Box::new(FirstCompatibleStandard),
            ],
        }
    }
}

impl StrategySet {
    /// Strategies for `category`, in order.
    #[must_use]
    pub fn for_category(&self, category: PresetCategory) -> &[Box<dyn NamingStrategy>] {
        match category {
            PresetCategory::Printer => &self.printer,
            PresetCategory::Filament => &self.filament,
            PresetCategory::Process => &self.process,
        }
    }
}

fn base_name(category: PresetCategory, conventions: &NamingConventions) -> Option<&str> {
    match category {
        PresetCategory::Filament => Some(&conventions.base_filament),
        PresetCategory::Process => Some(&conventions.base_process),
        PresetCategory::Printer => None,
    }
}

/// A declared variant matches a nozzle diameter as written or with `.0`
/// appended (`"0.4"`, `"1"` matches `"1.0"`).
pub(super) fn variant_matches(declared: &str, diameter: &str) -> bool {
    declared == diameter || declared.strip_suffix(".0") == Some(diameter)
}
