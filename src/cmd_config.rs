//! `classes` and `check-config` subcommands.

use std::path::Path;

use cadence_config::{ConfigLoader, ConfigValidator};

use crate::register::builtin_registry;

/// Print the registered job classes.
pub(crate) fn list_classes(format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let classes = builtin_registry()?.list();

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&classes)?),
        _ => {
            println!("{:<32} FULL NAME", "NAME");
            for class in &classes {
                println!("{:<32} {}", class.name, class.full_name);
            }
        }
    }
    Ok(())
}

/// Validate a configuration file and print its errors and warnings.
pub(crate) fn check_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load(path)?;
    let result = ConfigValidator::validate(&config)?;

    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }

    if result.is_valid() {
        println!(
            "{} is valid ({} seed job(s))",
            path.display(),
            config.jobs.len()
        );
        Ok(())
    } else {
        Err(format!("{} has {} error(s)", path.display(), result.errors.len()).into())
    }
}
