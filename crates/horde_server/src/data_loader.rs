//! Loading match data from disk.
//!
//! The core parsers work on strings; this module reads the files and
//! decides what happens when they are missing or malformed. The
//! `try_*` functions report errors, the plain ones log a warning and
//! fall back to a safe default so a bad data file never stops a match.

use std::path::Path;

use horde_core::archetype::ArchetypeRegistry;
use horde_core::waves::WaveCatalog;

use crate::error::{ConfigError, ConfigResult};

/// Read a whole file as UTF-8.
///
/// # Errors
///
/// Returns [`ConfigError::IoError`] with the path on failure.
pub fn read_file(path: &Path) -> ConfigResult<String> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load a wave catalog from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or any wave is invalid.
pub fn try_load_wave_catalog(path: &Path) -> ConfigResult<WaveCatalog> {
    let text = read_file(path)?;
    let catalog = WaveCatalog::from_json_str(&path.display().to_string(), &text)?;
    tracing::info!(path = %path.display(), waves = catalog.len(), "Loaded wave catalog");
    Ok(catalog)
}

/// Load a wave catalog, degrading to an empty catalog on any error.
///
/// An empty catalog still plays: every wave is synthesized.
#[must_use]
pub fn load_wave_catalog(path: Option<&Path>) -> WaveCatalog {
    let Some(path) = path else {
        tracing::info!("No wave catalog configured, all waves synthesized");
        return WaveCatalog::empty();
    };
    try_load_wave_catalog(path).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Wave catalog unusable, falling back to synthesized waves");
        WaveCatalog::empty()
    })
}

/// Load archetype templates from a RON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn try_load_archetypes(path: &Path) -> ConfigResult<ArchetypeRegistry> {
    let text = read_file(path)?;
    let registry = ArchetypeRegistry::from_ron_str(&path.display().to_string(), &text)?;
    tracing::info!(path = %path.display(), archetypes = registry.len(), "Loaded archetypes");
    Ok(registry)
}

/// Load archetypes, degrading to the built-in set on any error.
#[must_use]
pub fn load_archetypes(path: Option<&Path>) -> ArchetypeRegistry {
    let Some(path) = path else {
        return ArchetypeRegistry::builtin();
    };
    match try_load_archetypes(path) {
        Ok(registry) if !registry.is_empty() => registry,
        Ok(_) => {
            tracing::warn!(path = %path.display(), "Archetype file is empty, using built-in archetypes");
            ArchetypeRegistry::builtin()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Archetypes unusable, using built-in archetypes");
            ArchetypeRegistry::builtin()
        }
    }
}

/// Warn about catalog waves naming archetypes the registry lacks.
///
/// Such spawns are skipped at runtime; this only surfaces them early.
pub fn report_unknown_archetypes(catalog: &WaveCatalog, registry: &ArchetypeRegistry) -> usize {
    let mut unknown = 0;
    for (index, wave) in catalog.waves().iter().enumerate() {
        for name in wave.composition.archetype_names() {
            if !registry.contains(name) {
                unknown += 1;
                tracing::warn!(wave = index, name = %wave.name, archetype = name, "Wave names an unknown archetype");
            }
        }
    }
    unknown
}
