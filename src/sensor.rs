use crate::arena::Arena;
use crate::config::{
    COLOR_SENSOR_VALUE, DEFAULT_SENSOR_RANGE, DIGITAL_OFF_VALUE, DIGITAL_ON_VALUE,
    DIGITAL_THRESHOLD, DISTANCE_SENSOR_VALUE, LIGHT_OFF_RANGE, LIGHT_ON_RANGE, NUM_CREATE_SENSORS,
    NUM_SENSOR_SLOTS,
};
use crate::geometry::models::{ModelError, ModelSource, load_model};
use crate::geometry::{Shape, SimObject};
use crate::types::Location;
use crate::utils::random_in;

/// Raw value reported for a digital state
pub fn create_digital_value(on: bool) -> i32 {
    if on { DIGITAL_ON_VALUE } else { DIGITAL_OFF_VALUE }
}

pub fn is_digital_on(value: i32) -> bool {
    value < DIGITAL_THRESHOLD
}

#[derive(Debug, Clone, PartialEq)]
pub enum SensorKind {
    /// Touch sensor: pressed while its footprint (or mount point) overlaps the board
    Button { geometry: Option<Shape> },
    Distance,
    Light,
    Color,
    Default,
}

/// A sensor mounted on the robot. `location` is relative to the robot center;
/// `None` marks a sensor with no physical placement.
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    pub kind: SensorKind,
    pub location: Option<Location>,
}

impl Sensor {
    pub fn new(kind: SensorKind, location: Option<Location>) -> Self {
        Sensor { kind, location }
    }

    pub fn button(location: Location) -> Self {
        Sensor::new(SensorKind::Button { geometry: None }, Some(location))
    }

    /// Bumper whose footprint is given in robot coordinates
    pub fn bumper(geometry: Shape) -> Self {
        Sensor::new(
            SensorKind::Button {
                geometry: Some(geometry),
            },
            Some(Location::default()),
        )
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            SensorKind::Button { .. } => "Collision Touch Sensor",
            SensorKind::Distance => "ET Distance Sensor",
            SensorKind::Light => "Light Sensor",
            SensorKind::Color => "Reflectance Sensor",
            SensorKind::Default => "Default Sensor",
        }
    }

    /// Sensor pose on the board for a robot at `robot`
    pub fn world_location(&self, robot: &Location) -> Option<Location> {
        let offset = self.location?;
        if offset.is_origin() {
            return Some(*robot);
        }
        let (sin_t, cos_t) = robot.theta.sin_cos();
        Some(Location::new(
            robot.x - sin_t * offset.y + cos_t * offset.x,
            robot.y + cos_t * offset.y + sin_t * offset.x,
            robot.velocity,
            robot.theta + offset.theta,
        ))
    }

    /// Synthesized reading in `[0, 1023]`
    pub fn value(&self, robot: &Location, arena: &Arena) -> i32 {
        match &self.kind {
            SensorKind::Button { geometry } => {
                let Some(loc) = self.world_location(robot) else {
                    return create_digital_value(false);
                };
                // The arena holds a single robot, so its walls are every other object
                let hit = match geometry {
                    Some(shape) => {
                        let placed = shape.transformed(&loc);
                        arena
                            .walls()
                            .iter()
                            .any(|w| placed.overlaps(&w.transformed_collision()))
                    }
                    None => arena
                        .walls()
                        .iter()
                        .any(|w| w.transformed_collision().contains_point(loc.x, loc.y)),
                };
                create_digital_value(hit)
            }
            SensorKind::Distance => DISTANCE_SENSOR_VALUE,
            SensorKind::Light => {
                let (low, high) = if arena.light_on() {
                    LIGHT_ON_RANGE
                } else {
                    LIGHT_OFF_RANGE
                };
                random_in(low, high)
            }
            SensorKind::Color => COLOR_SENSOR_VALUE,
            SensorKind::Default => random_in(DEFAULT_SENSOR_RANGE.0, DEFAULT_SENSOR_RANGE.1),
        }
    }

    pub fn digital_value(&self, robot: &Location, arena: &Arena) -> bool {
        is_digital_on(self.value(robot, arena))
    }
}

/// Sensor slots and starting pose for one robot
#[derive(Debug, Clone, PartialEq)]
pub struct RobotConfig {
    pub name: String,
    pub start: Location,
    sensors: Vec<Option<Sensor>>,
}

impl RobotConfig {
    pub fn new(name: &str, slots: usize) -> Self {
        RobotConfig {
            name: name.to_string(),
            start: Location::default(),
            sensors: vec![None; slots],
        }
    }

    /// Controller configuration: analog ports 0-7 and digital ports 8-15
    pub fn controller(name: &str) -> Self {
        RobotConfig::new(name, NUM_SENSOR_SLOTS)
    }

    /// The Create's own bumpers and cliff sensors
    pub fn create_sensors(models: &dyn ModelSource) -> Result<Self, ModelError> {
        let mut config = RobotConfig::new("create", NUM_CREATE_SENSORS);
        config.set_sensor(0, Some(Sensor::bumper(load_model(models, "create-lbump")?)));
        config.set_sensor(1, Some(Sensor::bumper(load_model(models, "create-rbump")?)));
        for port in 2..NUM_CREATE_SENSORS {
            config.set_sensor(port, Some(Sensor::new(SensorKind::Color, None)));
        }
        Ok(config)
    }

    pub fn with_start(mut self, start: Location) -> Self {
        self.start = start;
        self
    }

    pub fn with_sensor(mut self, port: usize, sensor: Sensor) -> Self {
        self.set_sensor(port, Some(sensor));
        self
    }

    pub fn sensor(&self, port: usize) -> Option<&Sensor> {
        self.sensors.get(port).and_then(Option::as_ref)
    }

    /// Out-of-range ports are ignored
    pub fn set_sensor(&mut self, port: usize, sensor: Option<Sensor>) {
        if let Some(slot) = self.sensors.get_mut(port) {
            *slot = sensor;
        }
    }

    pub fn slots(&self) -> usize {
        self.sensors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wall::{Compass, Wall, WallKind};
    use assert_approx_eq::assert_approx_eq;
    use std::f64::consts::PI;

    fn arena_with_junction_at(x: f64, y: f64) -> Arena {
        Arena::new(vec![Wall::new(WallKind::Cross(Compass::North), x, y)])
    }

    #[test]
    fn test_digital_encoding_is_consistent() {
        assert!(is_digital_on(create_digital_value(true)));
        assert!(!is_digital_on(create_digital_value(false)));
        assert!(is_digital_on(511));
        assert!(!is_digital_on(512));
    }

    #[test]
    fn test_world_location_rotates_offset() {
        let sensor = Sensor::button(Location::at(100.0, 0.0, 0.0));
        let robot = Location::at(10.0, 20.0, PI / 2.0);
        let loc = sensor.world_location(&robot).unwrap();
        assert_approx_eq!(loc.x, 10.0);
        assert_approx_eq!(loc.y, 120.0);
        assert_approx_eq!(loc.theta, PI / 2.0);

        let centered = Sensor::button(Location::default());
        assert_eq!(centered.world_location(&robot), Some(robot));
        assert_eq!(Sensor::new(SensorKind::Color, None).world_location(&robot), None);
    }

    #[test]
    fn test_button_point_contact() {
        let arena = arena_with_junction_at(100.0, 0.0);
        let sensor = Sensor::button(Location::at(100.0, 0.0, 0.0));
        assert_eq!(sensor.value(&Location::default(), &arena), DIGITAL_ON_VALUE);
        assert!(!sensor.digital_value(&Location::at(0.0, 0.0, PI), &arena));

        let unplaced = Sensor::new(SensorKind::Button { geometry: None }, None);
        assert_eq!(unplaced.value(&Location::at(100.0, 0.0, 0.0), &arena), DIGITAL_OFF_VALUE);
    }

    #[test]
    fn test_bumper_geometry_follows_robot() {
        let arena = arena_with_junction_at(0.0, 200.0);
        let bumper = Sensor::bumper(Shape::rect(150.0, -20.0, 40.0, 40.0));
        assert!(!bumper.digital_value(&Location::default(), &arena));
        assert!(bumper.digital_value(&Location::at(0.0, 0.0, PI / 2.0), &arena));
    }

    #[test]
    fn test_light_and_constant_sensors() {
        let mut arena = Arena::new(Vec::new());
        let light = Sensor::new(SensorKind::Light, None);
        let here = Location::default();
        for _ in 0..50 {
            let v = light.value(&here, &arena);
            assert!((920..=1015).contains(&v), "dark reading {}", v);
        }
        arena.set_light(true);
        for _ in 0..50 {
            let v = light.value(&here, &arena);
            assert!((5..=100).contains(&v), "lit reading {}", v);
        }
        assert_eq!(Sensor::new(SensorKind::Color, None).value(&here, &arena), 200);
        assert_eq!(Sensor::new(SensorKind::Distance, None).value(&here, &arena), 0);
        let d = Sensor::new(SensorKind::Default, None).value(&here, &arena);
        assert!((1020..=1023).contains(&d));
    }

    #[test]
    fn test_config_slots() {
        let mut config = RobotConfig::controller("cbc")
            .with_sensor(3, Sensor::new(SensorKind::Light, None));
        assert_eq!(config.slots(), 16);
        assert!(config.sensor(3).is_some());
        assert!(config.sensor(4).is_none());
        config.set_sensor(40, Some(Sensor::new(SensorKind::Color, None)));
        assert!(config.sensor(40).is_none());
    }
}
