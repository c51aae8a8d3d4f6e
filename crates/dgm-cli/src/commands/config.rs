use anyhow::{Context, Result};
use dgm_etl::{config, Config};
use serde_json::Value;
use toml_edit::{Array, DocumentMut};

/// The config as a JSON object, for key lookups.
fn as_object(config: &Config) -> Result<serde_json::Map<String, Value>> {
    match serde_json::to_value(config)? {
        Value::Object(map) => Ok(map),
        _ => anyhow::bail!("Configuration did not serialize to a table"),
    }
}

fn valid_keys() -> Result<String> {
    Ok(as_object(&Config::default())?
        .keys()
        .cloned()
        .collect::<Vec<_>>()
        .join(", "))
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::from("<not set>"),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

/// Show the current effective configuration.
pub fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("Current Configuration");
    println!("=====================\n");

    println!("Config file: {}", config::config_file_path().display());

    let exists = config::config_file_path().exists();
    println!("File exists: {}\n", if exists { "yes" } else { "no (using defaults)" });

    println!("Settings:");
    for (key, value) in as_object(&config)? {
        let shown = match (key.as_str(), &value) {
            ("bot_token", Value::String(_)) => String::from("<set>"),
            _ => display_value(&value),
        };
        println!("  {key}: {shown}");
    }

    println!("\nPriority: CLI args > ENV vars (DGM_*) > Config file > Defaults");

    Ok(())
}

/// Get a specific config value.
pub fn get_config(key: Option<String>) -> Result<()> {
    if let Some(key) = key {
        let config = Config::load()?;
        let values = as_object(&config)?;

        let Some(value) = values.get(&key) else {
            anyhow::bail!("Unknown config key: {}\n\nValid keys: {}", key, valid_keys()?);
        };
        println!("{}", display_value(value));
    } else {
        // No key provided, show entire config file contents
        let config_path = config::config_file_path();

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            print!("{}", contents);
        } else {
            println!("Config file does not exist: {}", config_path.display());
            println!("\nRun 'dgm config init' to create it.");
        }
    }

    Ok(())
}

/// Set `key` in a TOML document, typed like the field it configures.
///
/// Numbers must parse as non-negative integers; list fields take
/// comma-separated values. Comments and layout are preserved.
fn set_value(contents: &str, key: &str, value: &str) -> Result<String> {
    let defaults = as_object(&Config::default())?;
    let Some(kind) = defaults.get(key) else {
        anyhow::bail!("Unknown config key: {}\n\nValid keys: {}", key, valid_keys()?);
    };

    let mut doc: DocumentMut = contents
        .parse()
        .context("Config file is not valid TOML")?;

    doc[key] = match kind {
        Value::Number(_) => {
            let n: u32 = value
                .parse()
                .with_context(|| format!("{key} must be a whole number, got '{value}'"))?;
            toml_edit::value(i64::from(n))
        }
        Value::Array(_) => {
            let mut items = Array::new();
            for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                items.push(item);
            }
            toml_edit::value(items)
        }
        _ => toml_edit::value(value),
    };

    Ok(doc.to_string())
}

/// Set a config value.
pub fn set_config(key: &str, value: &str) -> Result<()> {
    let config_path = config::config_file_path();

    // Ensure config file exists
    config::ensure_config_file()?;

    let contents = std::fs::read_to_string(&config_path)
        .context("Failed to read config file")?;
    let updated = set_value(&contents, key, value)?;

    std::fs::write(&config_path, updated)
        .context("Failed to write config file")?;

    // Catch values the loader would reject before the next run does
    Config::load_from(&config_path).context("Config file no longer loads")?;

    println!("✓ Updated {} = {}", key, value);
    println!("  in {}", config_path.display());

    Ok(())
}

/// Show the config file path.
pub fn show_path() -> Result<()> {
    let config_path = config::config_file_path();
    println!("{}", config_path.display());
    Ok(())
}

/// Show example configuration.
pub fn show_example() -> Result<()> {
    print!("{}", config::example_config());
    Ok(())
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let created = config::ensure_config_file()?;
    let config_path = config::config_file_path();

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to set bot_token and channels.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_string_keeps_comments() {
        let contents = "# Command prefix\nprefix = \"$\"\n";
        let updated = set_value(contents, "prefix", "!").unwrap();
        assert!(updated.contains("# Command prefix"));
        assert!(updated.contains("prefix = \"!\""));
    }

    #[test]
    fn test_set_number_and_list() {
        let updated = set_value("", "requests_per_second", "4").unwrap();
        assert!(updated.contains("requests_per_second = 4"));

        let updated = set_value(&updated, "channels", "123, 456").unwrap();
        assert!(updated.contains(r#"channels = ["123", "456"]"#));
        assert!(updated.contains("requests_per_second = 4"));
    }

    #[test]
    fn test_set_rejects_bad_input() {
        assert!(set_value("", "no_such_key", "1").is_err());
        assert!(set_value("", "last_id", "lots").is_err());
        assert!(set_value("prefix = ", "prefix", "!").is_err());
    }

    #[test]
    fn test_unset_token_displays_placeholder() {
        let values = as_object(&Config::default()).unwrap();
        assert_eq!(display_value(&values["bot_token"]), "<not set>");
        assert_eq!(display_value(&values["prefix"]), "$");
        assert_eq!(display_value(&values["last_id"]), "2231");
    }
}
