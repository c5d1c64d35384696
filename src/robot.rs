use crate::arena::Arena;
use crate::collision::{self, Contact, ContactPolicy};
use crate::config::{NUM_ANALOG_PORTS, NUM_SENSOR_SLOTS, RANDOM_MODE_SPREAD, SENSOR_MAX};
use crate::debug_motion;
use crate::error::ConfigError;
use crate::geometry::models::{ModelSource, load_model};
use crate::geometry::{Shape, SimObject};
use crate::kinematics::{self, WheelMotion};
use crate::panel::{ControlPanel, InputMode};
use crate::properties::Properties;
use crate::sensor::RobotConfig;
use crate::types::{ControllerType, DriveMapping, Location};
use crate::utils::random_in;
use crate::wall::Wall;

/// Physical description of a robot type, read from the robots file
#[derive(Debug, Clone, PartialEq)]
pub struct RobotParams {
    pub name: String,
    pub icon: String,
    pub controller: ControllerType,
    pub drive: DriveMapping,
    pub radius: f64, // Wheel-to-center distance, mm
    pub factor: f64, // Wheel command to mm/s
    pub model: String,
}

fn parameter(props: &Properties, name: &str) -> Result<String, ConfigError> {
    props
        .get(name)
        .map(str::to_string)
        .ok_or_else(|| ConfigError::MissingParameter(name.to_string()))
}

fn parameter_number(props: &Properties, name: &str) -> Result<f64, ConfigError> {
    let value = parameter(props, name)?;
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(ConfigError::InvalidNumber {
            name: name.to_string(),
            value,
        })
}

impl RobotParams {
    pub fn from_properties(props: &Properties, robot_type: &str) -> Result<Self, ConfigError> {
        let key = |field: &str| format!("{}.{}", robot_type, field);

        let controller_name = parameter(props, &key("type"))?;
        let controller =
            ControllerType::parse(&controller_name).ok_or_else(|| ConfigError::InvalidParameter {
                name: key("type"),
                value: controller_name.clone(),
            })?;
        let drive = DriveMapping::parse(&key("map"), &parameter(props, &key("map"))?)?;

        // Create drive units are already mm/s
        let (radius, factor) = match drive {
            DriveMapping::Create => (parameter_number(props, "create.radius")?, 1.0),
            _ => (
                parameter_number(props, &key("radius"))?,
                parameter_number(props, &key("factor"))?,
            ),
        };

        Ok(RobotParams {
            name: robot_type.to_string(),
            icon: props.get(&key("icon")).unwrap_or(robot_type).to_string(),
            controller,
            drive,
            radius,
            factor,
            model: parameter(props, &key("model"))?,
        })
    }

    /// Robot types listed under `enable`
    pub fn enabled(props: &Properties) -> Vec<String> {
        props
            .get("enable")
            .unwrap_or("")
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// The simulated robot body
#[derive(Debug, Clone)]
pub struct SimRobot {
    params: RobotParams,
    shape: Shape,
    location: Location,
    left: i32,
    right: i32,
    setup: RobotConfig,
    aux: Option<RobotConfig>,
}

impl SimRobot {
    pub fn new(
        params: RobotParams,
        setup: RobotConfig,
        models: &dyn ModelSource,
    ) -> Result<Self, ConfigError> {
        let shape = load_model(models, &params.model)?;
        let aux = match params.drive {
            DriveMapping::Create => Some(RobotConfig::create_sensors(models)?),
            _ => None,
        };
        Ok(SimRobot::with_shape(params, shape, setup, aux))
    }

    pub fn with_shape(
        params: RobotParams,
        shape: Shape,
        setup: RobotConfig,
        aux: Option<RobotConfig>,
    ) -> Self {
        let location = setup.start;
        SimRobot {
            params,
            shape,
            location,
            left: 0,
            right: 0,
            setup,
            aux,
        }
    }

    /// Back to the start pose with the wheels stopped
    pub fn reset(&mut self) {
        self.location = self.setup.start;
        self.left = 0;
        self.right = 0;
    }

    pub fn params(&self) -> &RobotParams {
        &self.params
    }

    pub fn controller(&self) -> ControllerType {
        self.params.controller
    }

    pub fn drive(&self) -> DriveMapping {
        self.params.drive
    }

    pub fn setup(&self) -> &RobotConfig {
        &self.setup
    }

    pub fn setup_mut(&mut self) -> &mut RobotConfig {
        &mut self.setup
    }

    pub fn aux_setup(&self) -> Option<&RobotConfig> {
        self.aux.as_ref()
    }

    pub fn set_location(&mut self, location: Location) {
        self.location = location;
    }

    pub fn set_speeds(&mut self, left: i32, right: i32) {
        self.left = left;
        self.right = right;
    }

    pub fn speeds(&self) -> (i32, i32) {
        (self.left, self.right)
    }

    fn motion(&self) -> WheelMotion {
        kinematics::wheel_motion(self.left, self.right, self.params.factor, self.params.radius)
    }

    /// Pose after `dt_ms` if nothing were in the way
    pub fn candidate_location(&self, dt_ms: f64) -> Location {
        let motion = self.motion();
        kinematics::integrate(&self.location, motion.force, motion.omega, dt_ms)
    }

    /// Contacts the robot would make by moving for `dt_ms`
    pub fn collide(&self, dt_ms: f64, walls: &[Wall]) -> Vec<Contact> {
        let moved = self.shape.transformed(&self.candidate_location(dt_ms));
        collision::find_contacts(&moved, walls)
    }

    /// Commits a move. Contacts reduce the forward force; the heading always turns.
    pub fn advance(&mut self, dt_ms: f64, contacts: &[Contact], policy: ContactPolicy) {
        let motion = self.motion();
        let force = collision::resolve_force(motion.force, self.location.theta, contacts, policy);
        self.location = kinematics::integrate(&self.location, force, motion.omega, dt_ms);
        if !contacts.is_empty() {
            debug_motion!(
                "{} contact(s), force {:.1} -> {:.1}, now {}",
                contacts.len(),
                motion.force,
                force,
                self.location
            );
        }
    }

    /// Reading for analog port 0-7, or accelerometer panel port 8-10
    pub fn analog(&self, port: usize, panel: &dyn ControlPanel, arena: &Arena) -> i32 {
        let input = panel.analog_input(port);
        let value = match input.mode {
            InputMode::Set => input.value,
            InputMode::Random => input.value + random_in(-RANDOM_MODE_SPREAD, RANDOM_MODE_SPREAD),
            InputMode::Real => match self.setup.sensor(port).filter(|_| port < NUM_ANALOG_PORTS) {
                Some(sensor) => sensor.value(&self.location, arena),
                None => input.value,
            },
        };
        value.clamp(0, SENSOR_MAX)
    }

    /// Reading for digital port 8-15
    pub fn digital(&self, port: usize, panel: &dyn ControlPanel, arena: &Arena) -> bool {
        let input = panel.digital_input(port);
        match (input.mode, self.setup.sensor(port)) {
            (InputMode::Real, Some(sensor)) => sensor.digital_value(&self.location, arena),
            _ => input.pressed,
        }
    }

    /// Reading from the auxiliary (Create) sensors; 1023 when absent
    pub fn extra_analog(&self, port: usize, arena: &Arena) -> i32 {
        match self.aux.as_ref().and_then(|aux| aux.sensor(port)) {
            Some(sensor) => sensor.value(&self.location, arena),
            None => SENSOR_MAX,
        }
    }

    pub fn extra_digital(&self, port: usize, arena: &Arena) -> bool {
        match self.aux.as_ref().and_then(|aux| aux.sensor(port)) {
            Some(sensor) => sensor.digital_value(&self.location, arena),
            None => false,
        }
    }

    /// Every port reading from its sensor must have one installed
    pub fn validate_inputs(&self, panel: &dyn ControlPanel) -> Result<(), ConfigError> {
        for port in 0..NUM_SENSOR_SLOTS {
            let real = if port < NUM_ANALOG_PORTS {
                panel.analog_input(port).mode == InputMode::Real
            } else {
                panel.digital_input(port).mode == InputMode::Real
            };
            if real && self.setup.sensor(port).is_none() {
                return Err(ConfigError::MissingSensor(port));
            }
        }
        Ok(())
    }
}

impl SimObject for SimRobot {
    fn collision(&self) -> &Shape {
        &self.shape
    }

    fn location(&self) -> &Location {
        &self.location
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::HeadlessPanel;
    use crate::sensor::{Sensor, SensorKind};
    use crate::wall::{Compass, StraightAxis, WallKind};
    use assert_approx_eq::assert_approx_eq;
    use std::f64::consts::PI;

    fn params() -> RobotParams {
        RobotParams {
            name: "test".to_string(),
            icon: "test".to_string(),
            controller: ControllerType::Cbc,
            drive: DriveMapping::Motors { left: 0, right: 3 },
            radius: 100.0,
            factor: 1.0,
            model: "test".to_string(),
        }
    }

    fn robot_at(start: Location) -> SimRobot {
        SimRobot::with_shape(
            params(),
            Shape::centered_rect(100.0, 100.0),
            RobotConfig::controller("test").with_start(start),
            None,
        )
    }

    fn step(robot: &mut SimRobot, walls: &[Wall], dt: f64) {
        let contacts = robot.collide(dt, walls);
        robot.advance(dt, &contacts, ContactPolicy::Sequential);
    }

    #[test]
    fn test_params_from_properties() {
        let props = Properties::parse(
            "enable = cbc, Create\n\
             create.radius = 130\n\
             create.type = cbc2\ncreate.map = gc\ncreate.model = create\n\
             cbc.type = cbc\ncbc.map = motor0,3\ncbc.radius = 75\ncbc.factor = 0.2\ncbc.model = cbc\n",
        );
        assert_eq!(RobotParams::enabled(&props), vec!["cbc", "create"]);

        let cbc = RobotParams::from_properties(&props, "cbc").unwrap();
        assert_eq!(cbc.controller, ControllerType::CbcV1);
        assert_eq!(cbc.drive, DriveMapping::Motors { left: 0, right: 3 });
        assert_approx_eq!(cbc.factor, 0.2);
        assert_eq!(cbc.icon, "cbc");

        let create = RobotParams::from_properties(&props, "create").unwrap();
        assert_eq!(create.drive, DriveMapping::Create);
        assert_approx_eq!(create.radius, 130.0);
        assert_approx_eq!(create.factor, 1.0);
    }

    #[test]
    fn test_params_errors() {
        let props = Properties::parse("x.type = cbc\nx.map = motor0,1\nx.radius = wide\nx.factor = 1\nx.model = m\n");
        assert!(matches!(
            RobotParams::from_properties(&props, "x"),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(
            RobotParams::from_properties(&props, "y"),
            Err(ConfigError::MissingParameter(name)) if name == "y.type"
        ));
    }

    #[test]
    fn test_free_driving() {
        let mut robot = robot_at(Location::default());
        robot.set_speeds(100, 100);
        for _ in 0..100 {
            step(&mut robot, &[], 10.0);
        }
        assert_approx_eq!(robot.location().x, 100.0, 1e-6);
        assert_approx_eq!(robot.location().y, 0.0);
    }

    #[test]
    fn test_stops_at_straight_wall_ahead() {
        // Robot front edge starts 150mm from the wall face
        let wall = Wall::new(
            WallKind::Pvc {
                axis: StraightAxis::TopToBottom,
                length: 2000.0,
            },
            200.0 + crate::config::PIPE_WIDTH_MM / 2.0,
            0.0,
        );
        let walls = [wall];
        let mut robot = robot_at(Location::default());
        robot.set_speeds(100, 100);
        for _ in 0..300 {
            step(&mut robot, &walls, 10.0);
        }
        let stopped = *robot.location();
        assert!(stopped.x < 150.0 + 1e-6, "robot passed into the wall: {}", stopped);
        assert!(stopped.x > 148.0, "robot stopped early: {}", stopped);
        assert_approx_eq!(stopped.y, 0.0);

        for _ in 0..50 {
            step(&mut robot, &walls, 10.0);
        }
        assert_approx_eq!(robot.location().x, stopped.x, 1e-9);
        assert_approx_eq!(robot.location().y, 0.0);
    }

    #[test]
    fn test_junction_blocks_but_robot_still_turns() {
        let walls = [Wall::new(WallKind::Cross(Compass::North), 60.0, 0.0)];
        let mut robot = robot_at(Location::default());
        robot.set_speeds(0, 100);
        let contacts = robot.collide(10.0, &walls);
        assert_eq!(contacts, vec![Contact::Stop]);
        robot.advance(10.0, &contacts, ContactPolicy::Sequential);
        assert_approx_eq!(robot.location().x, 0.0);
        assert_approx_eq!(robot.location().y, 0.0);
        assert_approx_eq!(robot.location().theta, 0.5 * 10.0 / 1000.0);
    }

    #[test]
    fn test_junction_stops_approach_from_any_heading() {
        for degrees in [0.0_f64, 45.0, 90.0, 135.0, 210.0] {
            let theta = degrees.to_radians();
            let walls = [Wall::new(
                WallKind::Cross(Compass::North),
                120.0 * theta.cos(),
                120.0 * theta.sin(),
            )];
            for policy in [ContactPolicy::Sequential, ContactPolicy::Minimum] {
                let mut robot = robot_at(Location::at(0.0, 0.0, theta));
                robot.set_speeds(100, 100);
                for _ in 0..150 {
                    let contacts = robot.collide(10.0, &walls);
                    robot.advance(10.0, &contacts, policy);
                    assert!(
                        !robot
                            .transformed_collision()
                            .overlaps(&walls[0].transformed_collision()),
                        "robot entered the junction heading {} degrees",
                        degrees
                    );
                }
                let travelled = robot.location().x.hypot(robot.location().y);
                assert!(travelled > 20.0, "only travelled {} at {} degrees", travelled, degrees);
                assert!(travelled < 120.0);
            }
        }
    }

    #[test]
    fn test_reset_restores_start() {
        let start = Location::at(50.0, -20.0, PI);
        let mut robot = robot_at(start);
        robot.set_speeds(10, 40);
        step(&mut robot, &[], 500.0);
        robot.reset();
        assert_eq!(*robot.location(), start);
        assert_eq!(robot.speeds(), (0, 0));
    }

    #[test]
    fn test_port_reads_follow_mode() {
        let panel = HeadlessPanel::new();
        let arena = Arena::new(Vec::new());
        let mut robot = robot_at(Location::default());
        robot
            .setup_mut()
            .set_sensor(2, Some(Sensor::new(SensorKind::Color, None)));

        panel.set_analog(2, 700, InputMode::Set);
        assert_eq!(robot.analog(2, &panel, &arena), 700);
        panel.set_analog(2, 700, InputMode::Real);
        assert_eq!(robot.analog(2, &panel, &arena), 200);
        panel.set_analog(2, 1020, InputMode::Random);
        let noisy = robot.analog(2, &panel, &arena);
        assert!((1012..=1023).contains(&noisy), "noisy reading {}", noisy);

        panel.set_digital(9, true, InputMode::Set);
        assert!(robot.digital(9, &panel, &arena));
        assert_eq!(robot.extra_analog(0, &arena), 1023);
        assert!(!robot.extra_digital(0, &arena));
    }

    #[test]
    fn test_validate_inputs_requires_sensor() {
        let panel = HeadlessPanel::new();
        let robot = robot_at(Location::default());
        assert!(robot.validate_inputs(&panel).is_ok());
        panel.set_analog(5, 0, InputMode::Real);
        assert!(matches!(
            robot.validate_inputs(&panel),
            Err(ConfigError::MissingSensor(5))
        ));
        panel.set_analog(5, 0, InputMode::Set);
        panel.set_digital(12, false, InputMode::Real);
        assert!(matches!(
            robot.validate_inputs(&panel),
            Err(ConfigError::MissingSensor(12))
        ));
    }
}
