//! Preset selection by name and from project evidence.
use super::strategies::{StrategyInput, StrategySet, variant_matches};
use super::{PresetBundle, PresetCategory, SelectionHints};
use crate::config::NamingConventions;
use crate::error::PresetError;

/// How a name was matched to a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// The preset has exactly the requested name.
    Exact,
    /// The requested name is the preset's alias.
    Alias,
    /// The requested name is `"<model> <diameter> nozzle"` for the preset's
    /// declared model and variant.
    BaseModel,
}

/// A successful selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Category selected in.
    pub category: PresetCategory,
    /// Name that was asked for.
    pub requested: String,
    /// Name of the selected preset.
    pub name: String,
    /// How the request matched.
    pub matched_by: MatchKind,
    /// Strategy that proposed the request, when it did not come from the user.
    pub strategy: Option<&'static str>,
}

/// Preset names given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPresetNames {
    /// `--printer`.
    pub printer: Option<String>,
    /// `--filament`.
    pub filament: Option<String>,
    /// `--process`.
    pub process: Option<String>,
}

impl UserPresetNames {
    /// Name given for `category`.
    #[must_use]
    pub fn get(&self, category: PresetCategory) -> Option<&str> {
        match category {
            PresetCategory::Printer => self.printer.as_deref(),
            PresetCategory::Filament => self.filament.as_deref(),
            PresetCategory::Process => self.process.as_deref(),
        }
        .filter(|name| !name.trim().is_empty())
    }

    /// Return `true` if no name was given.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        PresetCategory::ALL
            .into_iter()
            .all(|category| self.get(category).is_none())
    }
}

/// Outcome of [`PresetSelector::auto_apply_from_project`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedPresets {
    /// Printer selection; `None` when there was no evidence.
    pub printer: Option<Selection>,
    /// Filament selection.
    pub filament: Option<Selection>,
    /// Process selection.
    pub process: Option<Selection>,
    /// `true` when the project's own presets were applied verbatim.
    pub strict_project: bool,
}

impl AppliedPresets {
    /// Selection made for `category`.
    #[must_use]
    pub const fn get(&self, category: PresetCategory) -> Option<&Selection> {
        match category {
            PresetCategory::Printer => self.printer.as_ref(),
            PresetCategory::Filament => self.filament.as_ref(),
            PresetCategory::Process => self.process.as_ref(),
        }
    }

    fn set(&mut self, category: PresetCategory, selection: Option<Selection>) {
        match category {
            PresetCategory::Printer => self.printer = selection,
            PresetCategory::Filament => self.filament = selection,
            PresetCategory::Process => self.process = selection,
        }
    }
}

/// Resolves preset names to presets and selects them in a [`PresetBundle`].
#[derive(Debug, Default)]
pub struct PresetSelector {
    strategies: StrategySet,
    conventions: NamingConventions,
}

impl PresetSelector {
    /// Create a selector with the given strategies and naming conventions.
    #[must_use]
    pub const fn new(strategies: StrategySet, conventions: NamingConventions) -> Self {
        Self {
            strategies,
            conventions,
        }
    }

    /// Select a printer by exact name, alias, or model and nozzle diameter.
    ///
    /// # Errors
    ///
    /// Returns [`PresetError::NotFound`] if nothing matches.
    pub fn select_printer(
        &self,
        bundle: &mut PresetBundle,
        name: &str,
    ) -> Result<Selection, PresetError> {
        let category = PresetCategory::Printer;
        let printers = &bundle.printers;
        let found = printers
            .visible()
            .find(|p| p.name == name)
            .map(|p| (p.name.clone(), MatchKind::Exact))
            .or_else(|| {
                printers
                    .find_by_alias(name, |_| true)
                    .map(|p| (p.name.clone(), MatchKind::Alias))
            })
            .or_else(|| {
                let (model, diameter) = split_nozzle_name(name)?;
                printers
                    .visible()
                    .find(|p| {
                        p.printer_model.as_deref() == Some(model)
                            && p.printer_variant
                                .as_deref()
                                .is_some_and(|v| variant_matches(v, diameter))
                    })
                    .map(|p| (p.name.clone(), MatchKind::BaseModel))
            });
        commit(bundle, category, name, found)
    }

    /// Select a filament compatible with the selected printer.
    ///
    /// # Errors
    ///
    /// Returns [`PresetError::NoPrinterSelected`] without a printer, and
    /// [`PresetError::NotFound`] if nothing matches.
    pub fn select_filament(
        &self,
        bundle: &mut PresetBundle,
        name: &str,
    ) -> Result<Selection, PresetError> {
        select_for_printer(bundle, PresetCategory::Filament, name)
    }

    /// Select a process compatible with the selected printer.
    ///
    /// # Errors
    ///
    /// Returns [`PresetError::NoPrinterSelected`] without a printer, and
    /// [`PresetError::NotFound`] if nothing matches.
    pub fn select_process(
        &self,
        bundle: &mut PresetBundle,
        name: &str,
    ) -> Result<Selection, PresetError> {
        select_for_printer(bundle, PresetCategory::Process, name)
    }

    /// Select `name` in `category`.
    ///
    /// # Errors
    ///
    /// See [`select_printer`](Self::select_printer) and
    /// [`select_filament`](Self::select_filament).
    pub fn select(
        &self,
        bundle: &mut PresetBundle,
        category: PresetCategory,
        name: &str,
    ) -> Result<Selection, PresetError> {
        match category {
            PresetCategory::Printer => self.select_printer(bundle, name),
            PresetCategory::Filament => self.select_filament(bundle, name),
            PresetCategory::Process => self.select_process(bundle, name),
        }
    }

    /// Select presets for a request from user names and project evidence.
    ///
    /// With no user names and a project that explicitly names all three
    /// presets, exactly those are applied and no strategy runs. Otherwise
    /// user names win per category and the strategies fill the gaps.
    ///
    /// A printer proposed by a strategy that cannot be found is an error;
    /// with no evidence at all the printer stays unselected. Filament and
    /// process chains that run dry are only errors when `strict_resolution`
    /// is set.
    ///
    /// # Errors
    ///
    /// Returns [`PresetError::NotFound`] or [`PresetError::NoPrinterSelected`].
    pub fn auto_apply_from_project(
        &self,
        bundle: &mut PresetBundle,
        hints: &SelectionHints,
        user: &UserPresetNames,
        strict_resolution: bool,
    ) -> Result<AppliedPresets, PresetError> {
        for category in PresetCategory::ALL {
            bundle.collection_mut(category).clear_selection();
        }
        let mut applied = AppliedPresets::default();

        if user.is_empty() && hints.embedded.all_explicit() {
            applied.strict_project = true;
            for category in PresetCategory::ALL {
                let name = hints.embedded.explicit(category).unwrap_or_default();
                applied.set(category, Some(self.select(bundle, category, name)?));
            }
            return Ok(applied);
        }

        for category in PresetCategory::ALL {
            let selection = if let Some(name) = user.get(category) {
                Some(self.select(bundle, category, name)?)
            } else if category != PresetCategory::Printer && bundle.selected_printer().is_none() {
                None
            } else {
                match self.run_strategies(bundle, category, hints) {
                    Ok(Some(selection)) => Some(selection),
                    Ok(None) if category == PresetCategory::Printer => {
                        tracing::debug!("no printer evidence in project; printer left unselected");
                        None
                    }
                    result => {
                        let tried = result.err().unwrap_or_default();
                        if category == PresetCategory::Printer || strict_resolution {
                            return Err(PresetError::NotFound {
                                category,
                                name: if tried.is_empty() {
                                    "(no candidates)".to_string()
                                } else {
                                    tried.join(" | ")
                                },
                            });
                        }
                        tracing::warn!(
                            "no {category} preset found (tried: {}); engine defaults apply",
                            tried.join(" | ")
                        );
                        None
                    }
                }
            };
            applied.set(category, selection);
        }
        Ok(applied)
    }

    /// Try each strategy of `category` in order.
    ///
    /// `Ok(None)` means no strategy proposed anything; `Err` carries the
    /// proposals that did not match.
    fn run_strategies(
        &self,
        bundle: &mut PresetBundle,
        category: PresetCategory,
        hints: &SelectionHints,
    ) -> Result<Option<Selection>, Vec<String>> {
        let mut tried: Vec<String> = Vec::new();
        for strategy in self.strategies.for_category(category) {
            let candidate = {
                let input = StrategyInput {
                    hints,
                    catalog: bundle,
                    printer: bundle.selected_printer(),
                    conventions: &self.conventions,
                };
                strategy.propose(&input)
            };
            let Some(candidate) = candidate else {
                continue;
            };
            match self.select(bundle, category, &candidate) {
                Ok(mut selection) => {
                    selection.strategy = Some(strategy.name());
                    return Ok(Some(selection));
                }
                Err(e) => {
                    tracing::debug!("{} proposed '{candidate}': {e}", strategy.name());
                    if !tried.contains(&candidate) {
                        tried.push(candidate);
                    }
                }
            }
        }
        if tried.is_empty() { Ok(None) } else { Err(tried) }
    }
}

fn select_for_printer(
    bundle: &mut PresetBundle,
    category: PresetCategory,
    name: &str,
) -> Result<Selection, PresetError> {
    let Some(printer) = bundle.selected_printer().map(|p| p.name.clone()) else {
        return Err(PresetError::NoPrinterSelected { category });
    };
    let collection = bundle.collection(category);
    let found = collection
        .visible()
        .find(|p| p.name == name)
        .map(|p| (p.name.clone(), MatchKind::Exact))
        .or_else(|| {
            collection
                .find_by_alias(name, |p| p.is_compatible_with(&printer))
                .map(|p| (p.name.clone(), MatchKind::Alias))
        });
    commit(bundle, category, name, found)
}

fn commit(
    bundle: &mut PresetBundle,
    category: PresetCategory,
    requested: &str,
    found: Option<(String, MatchKind)>,
) -> Result<Selection, PresetError> {
    let (name, matched_by) = found.ok_or_else(|| PresetError::NotFound {
        category,
        name: requested.to_string(),
    })?;
    bundle.collection_mut(category).select(&name);
    Ok(Selection {
        category,
        requested: requested.to_string(),
        name,
        matched_by,
        strategy: None,
    })
}

/// Split `"<model> <diameter> nozzle"` into model and diameter.
fn split_nozzle_name(name: &str) -> Option<(&str, &str)> {
    let stem = name.trim().strip_suffix(" nozzle")?;
    let (model, diameter) = stem.trim_end().rsplit_once(' ')?;
    let model = model.trim();
    (!model.is_empty() && diameter.parse::<f64>().is_ok()).then_some((model, diameter))
}
