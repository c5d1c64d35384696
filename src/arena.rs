use crate::collision::ContactPolicy;
use crate::robot::SimRobot;
use crate::wall::Wall;

/// The board: fixed walls, the starting light and the single active robot
#[derive(Debug, Clone)]
pub struct Arena {
    walls: Vec<Wall>,
    robot: Option<SimRobot>,
    light_on: bool,
    policy: ContactPolicy,
}

impl Arena {
    pub fn new(walls: Vec<Wall>) -> Self {
        Arena {
            walls,
            robot: None,
            light_on: false,
            policy: ContactPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ContactPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    pub fn light_on(&self) -> bool {
        self.light_on
    }

    pub fn set_light(&mut self, on: bool) {
        self.light_on = on;
    }

    pub fn toggle_light(&mut self) -> bool {
        self.light_on = !self.light_on;
        self.light_on
    }

    pub fn place_robot(&mut self, robot: SimRobot) {
        self.robot = Some(robot);
    }

    pub fn robot(&self) -> Option<&SimRobot> {
        self.robot.as_ref()
    }

    pub fn robot_mut(&mut self) -> Option<&mut SimRobot> {
        self.robot.as_mut()
    }

    /// Moves the robot by `dt_ms` against the walls
    pub fn step_robot(&mut self, dt_ms: f64) {
        let Some(robot) = self.robot.as_mut() else {
            return;
        };
        let contacts = robot.collide(dt_ms, &self.walls);
        robot.advance(dt_ms, &contacts, self.policy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Shape, SimObject};
    use crate::robot::RobotParams;
    use crate::sensor::RobotConfig;
    use crate::types::{ControllerType, DriveMapping, Location};
    use crate::wall::{StraightAxis, WallKind};
    use assert_approx_eq::assert_approx_eq;
    use std::f64::consts::PI;

    fn robot(theta: f64) -> SimRobot {
        let params = RobotParams {
            name: "disc".to_string(),
            icon: "disc".to_string(),
            controller: ControllerType::Cbc,
            drive: DriveMapping::None,
            radius: 80.0,
            factor: 1.0,
            model: "disc".to_string(),
        };
        SimRobot::with_shape(
            params,
            Shape::ellipse(-50.0, -50.0, 100.0, 100.0),
            RobotConfig::controller("disc").with_start(Location::at(0.0, 0.0, theta)),
            None,
        )
    }

    #[test]
    fn test_step_without_robot_is_noop() {
        let mut arena = Arena::new(Vec::new());
        arena.step_robot(10.0);
        assert!(arena.robot().is_none());
    }

    #[test]
    fn test_light_toggle() {
        let mut arena = Arena::new(Vec::new());
        assert!(!arena.light_on());
        assert!(arena.toggle_light());
        assert!(arena.light_on());
    }

    #[test]
    fn test_grazing_contact_slides_with_reduced_force() {
        // Pipe running along x just touching the robot's left side
        let wall = Wall::new(
            WallKind::Pvc {
                axis: StraightAxis::LeftToRight,
                length: 3000.0,
            },
            0.0,
            60.0,
        );
        let heading = PI / 6.0;
        let mut arena = Arena::new(vec![wall]);
        arena.place_robot(robot(heading));
        if let Some(r) = arena.robot_mut() {
            r.set_speeds(100, 100);
        }

        arena.step_robot(10.0);
        let loc = *arena.robot().unwrap().location();
        // Slide axis points along -x, so the forward force is scaled by cos(30deg - 180deg)
        let force = 100.0 * (heading - PI).cos();
        assert_approx_eq!(loc.x, force * heading.cos() * 0.01);
        assert_approx_eq!(loc.y, force * heading.sin() * 0.01);
    }
}
