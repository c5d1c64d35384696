use crate::error::ConfigError;
use crate::utils::double_equals;
use std::cmp::Ordering;
use std::fmt;

/// Pose of a simulated object: position in millimetres, velocity magnitude
/// and heading in radians. Heading is never normalized.
#[derive(Debug, Clone, Copy, Default)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub velocity: f64,
    pub theta: f64,
}

impl Location {
    pub fn new(x: f64, y: f64, velocity: f64, theta: f64) -> Self {
        Location {
            x,
            y,
            velocity,
            theta,
        }
    }

    pub fn at(x: f64, y: f64, theta: f64) -> Self {
        Location::new(x, y, 0.0, theta)
    }

    /// Unit vector pointing along `theta`
    pub fn heading(theta: f64) -> Self {
        Location::new(0.0, 0.0, 1.0, theta)
    }

    pub fn is_origin(&self) -> bool {
        double_equals(self.x, 0.0) && double_equals(self.y, 0.0) && double_equals(self.theta, 0.0)
    }

    /// Advances the position along the heading by `velocity * dt_ms / 1000`
    pub fn increment(&mut self, dt_ms: f64) {
        let distance = self.velocity * dt_ms / 1000.0;
        self.x += distance * self.theta.cos();
        self.y += distance * self.theta.sin();
    }

    pub fn heading_degrees(&self) -> f64 {
        self.theta.to_degrees()
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

// Lexicographic on x, y, velocity, theta with epsilon equality
impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let pairs = [
            (self.x, other.x),
            (self.y, other.y),
            (self.velocity, other.velocity),
            (self.theta, other.theta),
        ];
        for (a, b) in pairs {
            if !double_equals(a, b) {
                return a.partial_cmp(&b);
            }
        }
        Some(Ordering::Equal)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.1}, {:.1}) {:.1}deg v={:.1}",
            self.x,
            self.y,
            self.heading_degrees(),
            self.velocity
        )
    }
}

/// Controller generations, ordered oldest to newest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ControllerType {
    Rcx,
    Hb,
    Xbc,
    CbcV1,
    Cbc,
}

impl ControllerType {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "rcx" => Some(ControllerType::Rcx),
            "hb" => Some(ControllerType::Hb),
            "xbc" => Some(ControllerType::Xbc),
            "cbc" => Some(ControllerType::CbcV1),
            "cbc2" => Some(ControllerType::Cbc),
            _ => None,
        }
    }

    pub fn at_least(self, other: ControllerType) -> bool {
        self >= other
    }

    pub fn name(self) -> &'static str {
        match self {
            ControllerType::Rcx => "rcx",
            ControllerType::Hb => "hb",
            ControllerType::Xbc => "xbc",
            ControllerType::CbcV1 => "cbc",
            ControllerType::Cbc => "cbc2",
        }
    }
}

/// How commanded motion reaches the robot's wheels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMapping {
    /// Create drive commands set wheel speeds directly
    Create,
    /// Wheel speeds follow the power of two motor ports
    Motors { left: usize, right: usize },
    None,
}

impl DriveMapping {
    /// Parses `gc`, `none` or `motorL,R`
    pub fn parse(name: &str, value: &str) -> Result<Self, ConfigError> {
        let value = value.trim().to_lowercase();
        let invalid = || ConfigError::InvalidParameter {
            name: name.to_string(),
            value: value.clone(),
        };

        if value == "gc" {
            return Ok(DriveMapping::Create);
        }
        if value == "none" {
            return Ok(DriveMapping::None);
        }
        let ports = value.strip_prefix("motor").ok_or_else(invalid)?;
        let (left, right) = ports.split_once(',').ok_or_else(invalid)?;
        let left: usize = left.trim().parse().map_err(|_| invalid())?;
        let right: usize = right.trim().parse().map_err(|_| invalid())?;
        if left >= crate::config::NUM_MOTOR_PORTS || right >= crate::config::NUM_MOTOR_PORTS {
            return Err(invalid());
        }
        Ok(DriveMapping::Motors { left, right })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_location_epsilon_equality() {
        let a = Location::new(1.0, 2.0, 3.0, 0.5);
        let b = Location::new(1.0 + 1e-13, 2.0, 3.0, 0.5 - 1e-13);
        assert_eq!(a, b);
        assert!(Location::at(1.0, 0.0, 0.0) < Location::at(1.0, 0.5, 0.0));
        assert!(Location::at(2.0, 0.0, 0.0) > Location::at(1.0, 9.0, 0.0));
    }

    #[test]
    fn test_location_increment() {
        let mut loc = Location::new(0.0, 0.0, 100.0, PI / 2.0);
        loc.increment(500.0);
        assert_approx_eq!(loc.x, 0.0);
        assert_approx_eq!(loc.y, 50.0);
    }

    #[test]
    fn test_controller_order() {
        assert!(ControllerType::Cbc.at_least(ControllerType::CbcV1));
        assert!(ControllerType::Xbc.at_least(ControllerType::Hb));
        assert!(!ControllerType::Hb.at_least(ControllerType::Xbc));
        assert_eq!(ControllerType::parse("CBC"), Some(ControllerType::CbcV1));
        assert_eq!(ControllerType::parse("cbc2"), Some(ControllerType::Cbc));
        assert_eq!(ControllerType::parse("vex"), None);
    }

    #[test]
    fn test_drive_mapping_parse() {
        assert_eq!(DriveMapping::parse("m", "gc").unwrap(), DriveMapping::Create);
        assert_eq!(DriveMapping::parse("m", "None").unwrap(), DriveMapping::None);
        assert_eq!(
            DriveMapping::parse("m", "motor0,3").unwrap(),
            DriveMapping::Motors { left: 0, right: 3 }
        );
        assert!(DriveMapping::parse("m", "motor0").is_err());
        assert!(DriveMapping::parse("m", "motor0,9").is_err());
        assert!(DriveMapping::parse("m", "tank").is_err());
    }
}
