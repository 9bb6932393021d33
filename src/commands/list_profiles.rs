//! Command: list the presets of the loaded library.
use std::fmt::Write as _;

use anyhow::Result;

use crate::cli::{GlobalOpts, ListProfilesOpts, ProfileType};
use crate::logging::Log;
use crate::presets::{PresetBundle, PresetCategory, PresetCollection};

/// Names containing any of these are library scaffolding, not presets a
/// user would pick.
const HIDDEN_MARKERS: &[&str] = &["common", "fdm_", "@base"];

/// Filament and process lists are cut after this many names.
const LIST_LIMIT: usize = 20;

/// Run the list-profiles command.
///
/// # Errors
///
/// Returns an error if the session cannot be opened.
pub fn run(global: &GlobalOpts, opts: &ListProfilesOpts, log: &dyn Log) -> Result<()> {
    log.info("listing available profiles");
    let mut context = super::open_session(global, log)?;
    print!("{}", render(context.presets(), opts.profile_type));
    context.shutdown();
    Ok(())
}

/// Names of `collection` worth showing, in library order.
#[must_use]
pub fn listable_names(collection: &PresetCollection) -> Vec<&str> {
    collection
        .visible_names()
        .into_iter()
        .filter(|name| !HIDDEN_MARKERS.iter().any(|marker| name.contains(marker)))
        .collect()
}

/// Format the listing for `profile_type`.
#[must_use]
pub fn render(bundle: &PresetBundle, profile_type: ProfileType) -> String {
    let mut out = String::from("Available Profiles\n==================\n");
    for category in PresetCategory::ALL {
        if !includes(profile_type, category) {
            continue;
        }
        let names = listable_names(bundle.collection(category));
        let title = match category {
            PresetCategory::Printer => "Printer",
            PresetCategory::Filament => "Filament",
            PresetCategory::Process => "Process",
        };
        let _ = writeln!(out, "\n{title} Profiles ({}):", names.len());

        let limit = if category == PresetCategory::Printer {
            names.len()
        } else {
            LIST_LIMIT
        };
        for name in names.iter().take(limit) {
            let _ = writeln!(out, "  - {name}");
        }
        if names.len() > limit {
            let _ = writeln!(out, "  ... and {} more", names.len() - limit);
        }
    }
    out
}

const fn includes(profile_type: ProfileType, category: PresetCategory) -> bool {
    matches!(
        (profile_type, category),
        (ProfileType::All, _)
            | (ProfileType::Printer, PresetCategory::Printer)
            | (ProfileType::Filament, PresetCategory::Filament)
            | (ProfileType::Process, PresetCategory::Process)
    )
}
