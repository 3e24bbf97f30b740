//! Data validation utilities.
//!
//! Unlike the server, which falls back to defaults, validation is
//! strict: any unreadable or malformed file is an error, and every
//! archetype a wave names must exist.

use std::path::Path;

use horde_core::archetype::ArchetypeRegistry;
use horde_core::waves::{WaveCatalog, WaveComposition};

use crate::error::{ToolError, ToolResult};

/// File name of the wave catalog inside a data directory.
pub const WAVES_FILE: &str = "waves.json";

/// File name of the archetype registry inside a data directory.
pub const ARCHETYPES_FILE: &str = "archetypes.ron";

/// What a successful validation found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Authored waves.
    pub waves: usize,
    /// Registered archetypes.
    pub archetypes: usize,
    /// Non-fatal observations.
    pub warnings: Vec<String>,
}

fn read(path: &Path) -> ToolResult<String> {
    std::fs::read_to_string(path).map_err(|e| ToolError::IoError {
        path: path.display().to_string(),
        source: e,
    })
}

/// Parse a wave catalog file strictly.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_catalog(path: &Path) -> ToolResult<WaveCatalog> {
    let text = read(path)?;
    Ok(WaveCatalog::from_json_str(&path.display().to_string(), &text)?)
}

/// Parse an archetype file strictly.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_registry(path: &Path) -> ToolResult<ArchetypeRegistry> {
    let text = read(path)?;
    Ok(ArchetypeRegistry::from_ron_str(&path.display().to_string(), &text)?)
}

/// Check that a catalog only names archetypes the registry knows.
///
/// # Errors
///
/// Returns [`ToolError::Invalid`] listing every unknown name.
pub fn check_references(catalog: &WaveCatalog, registry: &ArchetypeRegistry) -> ToolResult<Vec<String>> {
    let mut problems = Vec::new();
    let mut warnings = Vec::new();

    for (index, wave) in catalog.waves().iter().enumerate() {
        for name in wave.composition.archetype_names() {
            if !registry.contains(name) {
                problems.push(format!(
                    "wave {} '{}' names unknown archetype '{name}'",
                    index + 1,
                    wave.name
                ));
            }
        }
        if wave.composition.total_count() == 0 {
            warnings.push(format!("wave {} '{}' spawns no enemies", index + 1, wave.name));
        }
        if let WaveComposition::Pool { archetypes, .. } = &wave.composition {
            if archetypes.is_empty() {
                warnings.push(format!(
                    "wave {} '{}' has no prefab list; picks from every archetype",
                    index + 1,
                    wave.name
                ));
            }
        }
    }

    if problems.is_empty() {
        Ok(warnings)
    } else {
        Err(ToolError::Invalid(problems))
    }
}

/// Validate the wave and archetype files in a directory.
///
/// A missing archetype file means the built-in archetypes; a missing
/// wave file is an error.
///
/// # Errors
///
/// Returns an error if any data file fails validation.
pub fn validate_data_directory(path: &Path) -> ToolResult<ValidationReport> {
    let catalog = load_catalog(&path.join(WAVES_FILE))?;

    let archetypes_path = path.join(ARCHETYPES_FILE);
    let registry = if archetypes_path.exists() {
        load_registry(&archetypes_path)?
    } else {
        tracing::info!(path = %archetypes_path.display(), "No archetype file, checking against built-ins");
        ArchetypeRegistry::builtin()
    };

    let mut warnings = check_references(&catalog, &registry)?;
    if catalog.is_empty() {
        warnings.push("catalog has no waves; every wave will be synthesized".to_string());
    }
    for warning in &warnings {
        tracing::warn!("{warning}");
    }

    tracing::info!(
        waves = catalog.len(),
        archetypes = registry.len(),
        "Data files valid"
    );
    Ok(ValidationReport {
        waves: catalog.len(),
        archetypes: registry.len(),
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, contents: &str) {
        std::fs::write(dir.path().join(name), contents).unwrap();
    }

    const WAVES: &str = r#"{
        "waves": [
            { "name": "Opening", "enemies": [ { "archetype": "slime", "count": 5 } ], "spawn_interval": 1.0 },
            { "WaveName": "Legacy", "MobsPrefab": ["Bomber", "Sniper"], "MobsCount": 4, "SpawnRate": 0.8 }
        ]
    }"#;

    #[test]
    fn test_valid_directory_with_builtins() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, WAVES_FILE, WAVES);

        let report = validate_data_directory(dir.path()).unwrap();
        assert_eq!(report.waves, 2);
        assert_eq!(report.archetypes, 3);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_unknown_archetype_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir,
            WAVES_FILE,
            r#"{ "waves": [ { "name": "Odd", "enemies": [ { "archetype": "dragon", "count": 1 } ], "spawn_interval": 1.0 } ] }"#,
        );
        match validate_data_directory(dir.path()) {
            Err(ToolError::Invalid(problems)) => {
                assert_eq!(problems.len(), 1);
                assert!(problems[0].contains("dragon"));
            }
            other => panic!("expected invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_custom_archetypes_are_used() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir,
            WAVES_FILE,
            r#"{ "waves": [ { "name": "Odd", "enemies": [ { "archetype": "dragon", "count": 1 } ], "spawn_interval": 1.0 } ] }"#,
        );
        write(&dir, ARCHETYPES_FILE, r#"(archetypes: [ (name: "Dragon", max_health: 40) ])"#);

        let report = validate_data_directory(dir.path()).unwrap();
        assert_eq!(report.archetypes, 1);
    }

    #[test]
    fn test_missing_waves_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            validate_data_directory(dir.path()),
            Err(ToolError::IoError { .. })
        ));
    }

    #[test]
    fn test_non_positive_interval_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir,
            WAVES_FILE,
            r#"{ "waves": [ { "name": "Zero", "enemies": [], "spawn_interval": 0.0 } ] }"#,
        );
        assert!(matches!(
            validate_data_directory(dir.path()),
            Err(ToolError::Game(_))
        ));
    }
}
