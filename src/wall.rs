use crate::config::PIPE_WIDTH_MM;
use crate::error::ConfigError;
use crate::geometry::{Shape, SimObject};
use crate::types::Location;
use std::borrow::Cow;
use std::f64::consts::PI;
use std::sync::OnceLock;

/// Axis of a straight pipe section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StraightAxis {
    TopToBottom,
    LeftToRight,
}

impl StraightAxis {
    fn index(self) -> f64 {
        match self {
            StraightAxis::TopToBottom => 0.0,
            StraightAxis::LeftToRight => 1.0,
        }
    }
}

/// Which way a junction fitting points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compass {
    North,
    West,
    South,
    East,
}

impl Compass {
    fn index(self) -> f64 {
        match self {
            Compass::North => 0.0,
            Compass::West => 1.0,
            Compass::South => 2.0,
            Compass::East => 3.0,
        }
    }

    fn parse(word: &str) -> Self {
        match word {
            "right" | "east" => Compass::East,
            "down" | "south" => Compass::South,
            "left" | "west" => Compass::West,
            _ => Compass::North,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WallKind {
    Pvc { axis: StraightAxis, length: f64 },
    Corner(Compass),
    Tee(Compass),
    Cross(Compass),
}

/// A fixed piece of board geometry
#[derive(Debug, Clone)]
pub struct Wall {
    kind: WallKind,
    location: Location,
    collision: Shape,
    placed: OnceLock<Shape>, // World-space collision, rebuilt after a move
}

impl Wall {
    pub fn new(kind: WallKind, x: f64, y: f64) -> Self {
        let (collision, direction) = match kind {
            WallKind::Pvc { axis, length } => {
                (Shape::centered_rect(PIPE_WIDTH_MM, length), axis.index())
            }
            WallKind::Corner(c) | WallKind::Tee(c) | WallKind::Cross(c) => {
                (Shape::centered_rect(PIPE_WIDTH_MM, PIPE_WIDTH_MM), c.index())
            }
        };
        Wall {
            kind,
            location: Location::at(x, y, PI * direction / 2.0),
            collision,
            placed: OnceLock::new(),
        }
    }

    pub fn kind(&self) -> WallKind {
        self.kind
    }

    pub fn set_location(&mut self, location: Location) {
        self.location = location;
        self.placed = OnceLock::new();
    }
}

impl SimObject for Wall {
    fn collision(&self) -> &Shape {
        &self.collision
    }

    fn location(&self) -> &Location {
        &self.location
    }

    fn transformed_collision(&self) -> Cow<'_, Shape> {
        Cow::Borrowed(
            self.placed
                .get_or_init(|| self.collision.transformed(&self.location)),
        )
    }

    // Straight pipe lets movers slide along it; fittings stop them
    fn hit_direction(&self) -> Option<Location> {
        match self.kind {
            WallKind::Pvc { axis, .. } => Some(Location::heading(PI * (1.0 + axis.index()) / 2.0)),
            _ => None,
        }
    }
}

/// Parses one board line: `type, direction, length, x, y`.
/// Returns `Ok(None)` for comments, short lines and unknown piece types.
pub fn parse_wall(line: &str) -> Result<Option<Wall>, String> {
    let line = line.trim().to_lowercase();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let tokens: Vec<&str> = line.split(',').map(str::trim).collect();
    if tokens.len() < 5 {
        return Ok(None);
    }

    let number = |token: &str| {
        token
            .parse::<f64>()
            .map_err(|_| format!("invalid number {:?}", token))
    };
    let length = number(tokens[2])?;
    let x = number(tokens[3])?;
    let y = number(tokens[4])?;
    let direction = tokens[1];

    let kind = match tokens[0] {
        "pvc" | "wall" | "" => {
            let axis = if direction == "ttb" || direction.starts_with("vert") {
                StraightAxis::TopToBottom
            } else {
                StraightAxis::LeftToRight
            };
            WallKind::Pvc { axis, length }
        }
        "corner" | "right" | "2way" => WallKind::Corner(Compass::parse(direction)),
        "t" | "tee" | "3way" => WallKind::Tee(Compass::parse(direction)),
        "inter" | "cross" | "4way" => WallKind::Cross(Compass::parse(direction)),
        other => {
            log::warn!("Skipping unknown board piece {:?}", other);
            return Ok(None);
        }
    };
    Ok(Some(Wall::new(kind, x, y)))
}

pub fn parse_board(text: &str) -> Result<Vec<Wall>, ConfigError> {
    let mut walls = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        match parse_wall(line) {
            Ok(Some(wall)) => walls.push(wall),
            Ok(None) => {}
            Err(message) => {
                return Err(ConfigError::Board {
                    line: idx + 1,
                    message,
                });
            }
        }
    }
    log::info!("Loaded {} board pieces", walls.len());
    Ok(walls)
}
