//! Models command - list model files in the configured directory.

use horde_launch::{list_models, name_lookup};
use std::path::Path;

use super::load_config;

pub(crate) fn run(config_path: Option<&Path>, names: bool) -> miette::Result<()> {
    let config = load_config(config_path)?;
    let defaults = config.defaults();

    let models = list_models(config.models_dir(), &defaults.model_extension)
        .map_err(|e| miette::miette!("Failed to list models: {}", e))?;

    if models.is_empty() {
        println!(
            "No .{} models found in {}",
            defaults.model_extension,
            config.models_dir().display()
        );
        return Ok(());
    }

    let lookup = name_lookup(&config);

    println!("Models in {}:", config.models_dir().display());
    for (i, path) in models.iter().enumerate() {
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        if !names {
            println!("  {:>2}) {}", i + 1, file);
            continue;
        }

        let name = match lookup.lookup(path, config.reference_db()) {
            Ok(name) if !name.is_empty() => name,
            Ok(_) => "(no match)".to_string(),
            Err(e) => {
                tracing::warn!("{}", e);
                "(lookup failed)".to_string()
            }
        };
        println!("  {:>2}) {}  ->  {}", i + 1, file, name);
    }

    Ok(())
}
