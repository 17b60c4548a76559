//! Config load validation tests for iac-forge-config.
// crates/iac-forge-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards (path, size, encoding, values).
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

use std::io::Write;
use std::path::Path;

use iac_forge_config::ConfigError;
use iac_forge_config::ConfigSource;
use iac_forge_config::DEFAULT_MAX_INPUT_BYTES;
use iac_forge_config::IacForgeConfig;
use iac_forge_config::LogFormat;
use iac_forge_config::LogLevel;
use tempfile::NamedTempFile;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<IacForgeConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

fn config_file(content: &str) -> Result<NamedTempFile, String> {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(content.as_bytes()).map_err(|err| err.to_string())?;
    Ok(file)
}

#[test]
fn load_reads_every_section() -> TestResult {
    let file = config_file(
        r#"
[logging]
level = "debug"
format = "json"

[generator]
input = "tree.json"
output = "main.tf"

[limits]
max_input_bytes = 4096
"#,
    )?;
    let (config, source) = IacForgeConfig::load_with_source(Some(file.path())).map_err(|err| err.to_string())?;
    if source != ConfigSource::File(file.path().to_path_buf()) {
        return Err("expected file source".to_string());
    }
    if config.logging.level != LogLevel::Debug || config.logging.format != LogFormat::Json {
        return Err("logging section not applied".to_string());
    }
    if config.generator.output.as_deref() != Some(Path::new("main.tf")) {
        return Err("generator output not applied".to_string());
    }
    if config.limits.max_input_bytes != 4096 {
        return Err("limits not applied".to_string());
    }
    Ok(())
}

#[test]
fn empty_file_yields_defaults() -> TestResult {
    let file = config_file("")?;
    let config = IacForgeConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config != IacForgeConfig::default() || config.limits.max_input_bytes != DEFAULT_MAX_INPUT_BYTES {
        return Err("empty config should equal defaults".to_string());
    }
    Ok(())
}

#[test]
fn explicit_missing_file_is_an_error() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let missing = dir.path().join("absent.toml");
    assert_invalid(IacForgeConfig::load(Some(&missing)), "config io error")
}

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    assert_invalid(IacForgeConfig::load(Some(Path::new(&long_path))), "config path exceeds max length")
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    assert_invalid(IacForgeConfig::load(Some(Path::new(&long_component))), "config path component too long")
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let payload = vec![b'#'; 1_048_577];
    file.write_all(&payload).map_err(|err| err.to_string())?;
    assert_invalid(IacForgeConfig::load(Some(file.path())), "config file exceeds size limit")
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(IacForgeConfig::load(Some(file.path())), "config file must be utf-8")
}

#[test]
fn unknown_keys_are_rejected() -> TestResult {
    assert_invalid(IacForgeConfig::from_toml("[logging]\ncolour = true\n"), "config parse error")?;
    assert_invalid(IacForgeConfig::from_toml("[server]\nport = 1\n"), "config parse error")
}

#[test]
fn unknown_log_level_is_rejected() -> TestResult {
    assert_invalid(IacForgeConfig::from_toml("[logging]\nlevel = \"loud\"\n"), "config parse error")
}

#[test]
fn input_limit_must_be_in_range() -> TestResult {
    assert_invalid(
        IacForgeConfig::from_toml("[limits]\nmax_input_bytes = 0\n"),
        "limits.max_input_bytes must be greater than zero",
    )?;
    assert_invalid(
        IacForgeConfig::from_toml("[limits]\nmax_input_bytes = 1073741824\n"),
        "limits.max_input_bytes must be at most",
    )
}

#[test]
fn blank_generator_paths_are_rejected() -> TestResult {
    assert_invalid(
        IacForgeConfig::from_toml("[generator]\noutput = \"  \"\n"),
        "generator.output must be non-empty",
    )
}
