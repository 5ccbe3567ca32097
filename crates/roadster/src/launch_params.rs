//! Launch parameter parsing for the demo.
//!
//! On native, parameters are parsed from command-line arguments using clap.
//! On WASM, defaults are used (CLI argument parsing is not available).

use bevy::prelude::*;

use crate::error::{Error, Result};
use crate::terrain::TerrainKind;

/// Default car model, relative to the asset folder.
pub const DEFAULT_MODEL: &str = "classic_car/classic_muscle_car.glb";
/// Default height the car is dropped from (m).
const DEFAULT_SPAWN_HEIGHT: f32 = 4.0;
/// Default height below which the car respawns (m).
const DEFAULT_RESPAWN_HEIGHT: f32 = -10.0;

/// Launch parameters for the demo.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct LaunchParams {
    /// glTF model used for the car.
    pub model: String,
    /// Ground shape.
    pub terrain: TerrainKind,
    /// Height the car is spawned at.
    pub spawn_height: f32,
    /// The car respawns once its chassis drops below this height.
    pub respawn_height: f32,
    /// Whether collider wireframes are drawn at startup.
    pub physics_debug: bool,
}

impl Default for LaunchParams {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            terrain: TerrainKind::default(),
            spawn_height: DEFAULT_SPAWN_HEIGHT,
            respawn_height: DEFAULT_RESPAWN_HEIGHT,
            physics_debug: true,
        }
    }
}

impl LaunchParams {
    /// Check values that clap cannot check on its own.
    pub fn validate(self) -> Result<Self> {
        if self.model.trim().is_empty() {
            return Err(Error::InvalidParam {
                name: "model",
                detail: "path is empty".to_string(),
            });
        }
        if !self.spawn_height.is_finite() {
            return Err(Error::InvalidParam {
                name: "spawn-height",
                detail: format!("{} is not a finite number", self.spawn_height),
            });
        }
        if !self.respawn_height.is_finite() {
            return Err(Error::InvalidParam {
                name: "respawn-height",
                detail: format!("{} is not a finite number", self.respawn_height),
            });
        }
        if self.respawn_height >= self.spawn_height {
            return Err(Error::InvalidParam {
                name: "respawn-height",
                detail: format!(
                    "{} must be below the spawn height {}",
                    self.respawn_height, self.spawn_height
                ),
            });
        }
        Ok(self)
    }
}

#[cfg(not(target_family = "wasm"))]
mod native {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    #[command(about = "Drive a car around with raycast vehicle physics")]
    struct CliArgs {
        /// glTF model for the car, relative to the asset folder.
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,

        /// Ground shape.
        #[arg(long, value_enum, default_value_t = TerrainKind::default())]
        terrain: TerrainKind,

        /// Height the car is spawned at (m).
        #[arg(long, default_value_t = DEFAULT_SPAWN_HEIGHT, allow_negative_numbers = true)]
        spawn_height: f32,

        /// The car respawns once it falls below this height (m).
        #[arg(long, default_value_t = DEFAULT_RESPAWN_HEIGHT, allow_negative_numbers = true)]
        respawn_height: f32,

        /// Draw collider wireframes at startup.
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        physics_debug: bool,
    }

    pub fn parse() -> Result<LaunchParams> {
        let args = CliArgs::parse();
        LaunchParams {
            model: args.model,
            terrain: args.terrain,
            spawn_height: args.spawn_height,
            respawn_height: args.respawn_height,
            physics_debug: args.physics_debug,
        }
        .validate()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn parse_from(args: &[&str]) -> LaunchParams {
            let args = CliArgs::try_parse_from(args).unwrap();
            LaunchParams {
                model: args.model,
                terrain: args.terrain,
                spawn_height: args.spawn_height,
                respawn_height: args.respawn_height,
                physics_debug: args.physics_debug,
            }
        }

        #[test]
        fn test_cli_defaults() {
            assert_eq!(parse_from(&["roadster"]), LaunchParams::default());
        }

        #[test]
        fn test_cli_overrides() {
            let params = parse_from(&[
                "roadster",
                "--terrain",
                "hills",
                "--spawn-height",
                "8",
                "--respawn-height",
                "-25.5",
                "--physics-debug",
                "false",
            ]);
            assert_eq!(params.terrain, TerrainKind::Hills);
            assert_eq!(params.spawn_height, 8.0);
            assert_eq!(params.respawn_height, -25.5);
            assert!(!params.physics_debug);
        }
    }
}

/// Parse launch parameters from CLI args (native) or use defaults (WASM).
pub fn parse() -> Result<LaunchParams> {
    #[cfg(not(target_family = "wasm"))]
    {
        native::parse()
    }
    #[cfg(target_family = "wasm")]
    {
        LaunchParams::default().validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(LaunchParams::default().validate().is_ok());
    }

    #[test]
    fn test_respawn_must_be_below_spawn() {
        let params = LaunchParams {
            spawn_height: 4.0,
            respawn_height: 4.0,
            ..LaunchParams::default()
        };
        let err = params.validate().unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidParam {
                name: "respawn-height",
                ..
            }
        ));
    }

    #[test]
    fn test_empty_model_rejected() {
        let params = LaunchParams {
            model: "  ".to_string(),
            ..LaunchParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_non_finite_heights_rejected() {
        let params = LaunchParams {
            spawn_height: f32::NAN,
            ..LaunchParams::default()
        };
        assert!(params.validate().is_err());

        let params = LaunchParams {
            respawn_height: f32::NEG_INFINITY,
            ..LaunchParams::default()
        };
        assert!(params.validate().is_err());
    }
}
