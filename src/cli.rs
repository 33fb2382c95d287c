//! Command-line overrides for the default scene
use clap::Parser;
use std::path::PathBuf;

use crate::{
    config::{Finish, SceneConfig},
    loader::{ModelDescriptor, ModelFormat},
};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum CliError {
    #[error("cannot tell the format of {0}; pass --format")]
    UnknownFormat(PathBuf),

    #[error("--format needs a --model path")]
    FormatWithoutModel,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "truffle-showcase")]
#[command(about = "Scroll-driven 3D product showcase", long_about = None)]
pub struct Cli {
    /// Model file to show instead of the default product model
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Format of --model; guessed from the extension when omitted
    #[arg(long, value_enum)]
    pub format: Option<ModelFormat>,

    /// Base material of the model
    #[arg(long, value_enum, default_value_t = Finish::Glossy)]
    pub finish: Finish,

    /// Keep the model still when the pointer moves
    #[arg(long = "no-tilt", default_value = "false")]
    pub no_tilt: bool,
}

impl Cli {
    /// Applies the overrides to the default scene
    pub fn scene_config(&self) -> Result<SceneConfig, CliError> {
        let mut config = SceneConfig::default();

        match (&self.model, self.format) {
            (Some(path), Some(format)) => {
                config = config.with_model(ModelDescriptor::new(path.clone(), format));
            }
            (Some(path), None) => {
                let format = ModelFormat::from_extension(path)
                    .ok_or_else(|| CliError::UnknownFormat(path.clone()))?;
                config = config.with_model(ModelDescriptor::new(path.clone(), format));
            }
            (None, Some(_)) => return Err(CliError::FormatWithoutModel),
            (None, None) => {}
        }

        config.animator.finish = self.finish;
        if self.no_tilt {
            config = config.without_tilt();
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("truffle-showcase").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_keep_main_scene() {
        let config = parse(&[]).scene_config().unwrap();
        assert_eq!(config.model, SceneConfig::default().model);
        assert!(config.animator.tilt.is_some());
        assert_eq!(config.animator.finish, Finish::Glossy);
    }

    #[test]
    fn test_finish_override() {
        let config = parse(&["--finish", "matcap"]).scene_config().unwrap();
        assert_eq!(config.animator.finish, Finish::Matcap);
        assert!(Cli::try_parse_from(["truffle-showcase", "--finish", "chrome"]).is_err());
    }

    #[test]
    fn test_model_override_with_explicit_format() {
        let config = parse(&["--model", "chair.bin", "--format", "fbx", "--no-tilt"])
            .scene_config()
            .unwrap();
        assert_eq!(config.model, ModelDescriptor::new("chair.bin", ModelFormat::Fbx));
        assert!(config.animator.tilt.is_none());
    }

    #[test]
    fn test_format_is_guessed_from_extension() {
        let config = parse(&["--model", "plate.usdz"]).scene_config().unwrap();
        assert_eq!(config.model.format, ModelFormat::Usdz);

        let err = parse(&["--model", "notes.txt"]).scene_config().unwrap_err();
        assert_eq!(err, CliError::UnknownFormat(PathBuf::from("notes.txt")));
    }

    #[test]
    fn test_format_alone_is_rejected() {
        let err = parse(&["--format", "obj"]).scene_config().unwrap_err();
        assert_eq!(err, CliError::FormatWithoutModel);
    }
}
