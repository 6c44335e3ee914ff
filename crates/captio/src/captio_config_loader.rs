use std::path::Path;

use crate::captio_config::CaptioConfig;
use crate::common::{CaptionError, CaptionResult};

/// Load configuration with standard priority:
/// ./captio.toml > ~/.config/captio/config.toml > defaults
pub fn load_config() -> CaptionResult<CaptioConfig> {
    // Try local first
    if let Some(config) = try_load_from_path("./captio.toml")? {
        return Ok(config);
    }

    // Try user config
    if let Some(config_dir) = dirs::config_dir() {
        let user_config = config_dir.join("captio").join("config.toml");
        if let Some(config) = try_load_from_path(&user_config)? {
            return Ok(config);
        }
    }

    // Return defaults
    Ok(CaptioConfig::default())
}

/// Load from specific path.
pub fn load_config_from_path(path: impl AsRef<Path>) -> CaptionResult<CaptioConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| CaptionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: CaptioConfig = toml::from_str(&contents).map_err(|source| CaptionError::ConfigFile {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Loaded config from {}", path.display());
    Ok(config)
}

fn try_load_from_path(path: impl AsRef<Path>) -> CaptionResult<Option<CaptioConfig>> {
    let path = path.as_ref();
    if path.exists() {
        Ok(Some(load_config_from_path(path)?))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use captio_transformers::vision::{EncoderOutputMode, FeatureGeometry};
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captio.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[model]
num_beams = 3
max_output_length = 20

[model.feature_geometry]
channels = 64
height = 1
width = 1

[dataset]
apply_pixel_to_tensor_conversion = false

[encoder]
channels = 64
output_mode = "pooled"
"#
        )
        .unwrap();

        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.model.num_beams, 3);
        assert_eq!(config.model.max_output_length, 20);
        assert_eq!(config.model.hidden_dim, 768);
        assert_eq!(config.model.feature_geometry, FeatureGeometry::new(64, 1, 1));
        assert!(!config.dataset.apply_pixel_to_tensor_conversion);
        assert_eq!(config.dataset.resize, None);
        assert_eq!(config.encoder.output_mode, EncoderOutputMode::Pooled);
        assert_eq!(config.encoder.image_size, 224);
        assert_eq!(config.decoder.hidden_size, 768);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = CaptioConfig::default();
        config.model.num_beams = 2;
        config.decoder.vocab_size = 300;
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

        assert_eq!(load_config_from_path(&path).unwrap(), config);
    }

    #[test]
    fn test_bad_toml_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[model\nnum_beams = ").unwrap();

        let err = load_config_from_path(&path).unwrap_err();
        assert!(matches!(err, CaptionError::ConfigFile { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config_from_path("/nonexistent/captio.toml").unwrap_err();
        assert!(matches!(err, CaptionError::Io { .. }));
    }
}
