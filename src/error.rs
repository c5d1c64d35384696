// Configuration errors: board files, robot parameters, sensor setup

use crate::geometry::models::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("board line {line}: {message}")]
    Board { line: usize, message: String },
    #[error("robot parameter {0} must be defined")]
    MissingParameter(String),
    #[error("robot parameter {name} must be a number, found {value:?}")]
    InvalidNumber { name: String, value: String },
    #[error("robot parameter {name} has an invalid value {value:?}")]
    InvalidParameter { name: String, value: String },
    #[error("robot type {0:?} is not enabled")]
    UnknownRobot(String),
    #[error("no robots are enabled")]
    NoRobots,
    #[error("port {0} reads from its sensor but no sensor is installed")]
    MissingSensor(usize),
    #[error("no robot has been placed on the board")]
    NoRobot,
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}
