use crate::arena::Arena;
use crate::config::{DRIVER_SLEEP_MS, MOVE_INTERVAL_MS, STATUS_INTERVAL_MS};
use crate::error::ConfigError;
use crate::panel::ControlPanel;
use crate::program::{ProgramRegistry, Runtime};
use log::info;
use parking_lot::RwLock;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How a bounded run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every user process returned
    Finished,
    /// The time limit passed with the program still going
    TimedOut,
}

/// Converts a run time in seconds into a time limit for `Simulator::run`
pub fn run_limit(seconds: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(seconds).map_err(|_| ConfigError::InvalidParameter {
        name: "seconds".to_string(),
        value: seconds.to_string(),
    })
}

/// Owns the board and the program runtime and plays the operator's role:
/// start/pause, emergency stop, the starting light, and advancing the robot.
pub struct Simulator {
    runtime: Arc<Runtime>,
}

impl Simulator {
    /// Starts paused with no program running
    pub fn new(
        arena: Arena,
        panel: Arc<dyn ControlPanel>,
        registry: ProgramRegistry,
    ) -> Result<Self, ConfigError> {
        let runtime = Runtime::new(Arc::new(RwLock::new(arena)), panel, registry)?;
        runtime.timing().pause();
        Ok(Simulator { runtime })
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    pub fn arena(&self) -> &Arc<RwLock<Arena>> {
        self.runtime.arena()
    }

    pub fn is_paused(&self) -> bool {
        self.runtime.timing().is_paused()
    }

    pub fn is_running(&self) -> bool {
        self.runtime.is_running()
    }

    /// Play/pause toggle. From a stopped state this resets the robot, clears
    /// the LCD and starts `main`.
    pub fn play(&self) -> Result<(), ConfigError> {
        if !self.is_paused() {
            self.pause();
            return Ok(());
        }
        if !self.runtime.is_running() {
            if let Some(robot) = self.arena().write().robot_mut() {
                robot.reset();
            }
            self.runtime.panel().clear_display();
            let id = self.runtime.invoke_main()?;
            info!("Program started as process {}", id);
        }
        self.runtime.timing().resume();
        Ok(())
    }

    pub fn pause(&self) {
        self.runtime.timing().pause();
    }

    pub fn e_stop(&self) {
        info!("Emergency stop");
        self.runtime.emergency_stop();
    }

    /// Returns the new state of the starting light
    pub fn toggle_light(&self) -> bool {
        self.arena().write().toggle_light()
    }

    /// Moves the robot by `dt_ms` unless paused
    pub fn tick(&self, dt_ms: f64) {
        if !self.is_paused() {
            self.arena().write().step_robot(dt_ms);
        }
    }

    /// Drives the simulation in real time until the program ends or `limit`
    /// passes. A finished program leaves the simulator paused.
    pub fn run(&self, limit: Duration) -> RunOutcome {
        let started = Instant::now();
        let mut last_move = started;
        let mut last_status = started;
        loop {
            let now = Instant::now();
            if now - last_status >= Duration::from_millis(STATUS_INTERVAL_MS) {
                last_status = now;
                if !self.runtime.is_running() {
                    if !self.is_paused() {
                        self.pause();
                    }
                    return RunOutcome::Finished;
                }
            }
            if now - last_move >= Duration::from_millis(MOVE_INTERVAL_MS) {
                self.tick((now - last_move).as_secs_f64() * 1000.0);
                last_move = now;
            }
            if now - started >= limit {
                return RunOutcome::TimedOut;
            }
            thread::sleep(Duration::from_millis(DRIVER_SLEEP_MS));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Shape, SimObject};
    use crate::panel::{HeadlessPanel, InputMode};
    use crate::robot::{RobotParams, SimRobot};
    use crate::sensor::RobotConfig;
    use crate::types::{ControllerType, DriveMapping, Location};
    use crate::wall::{StraightAxis, Wall, WallKind};

    fn simulator(
        walls: Vec<Wall>,
        drive: DriveMapping,
        registry: ProgramRegistry,
    ) -> (Simulator, Arc<HeadlessPanel>) {
        let params = RobotParams {
            name: "cbc".to_string(),
            icon: "cbc".to_string(),
            controller: ControllerType::Cbc,
            drive,
            radius: 75.0,
            factor: 1.0,
            model: "cbc".to_string(),
        };
        let robot = SimRobot::with_shape(
            params,
            Shape::centered_rect(150.0, 150.0),
            RobotConfig::controller("cbc").with_start(Location::at(0.0, 0.0, 0.0)),
            None,
        );
        let mut arena = Arena::new(walls);
        arena.place_robot(robot);
        let panel = Arc::new(HeadlessPanel::new());
        let sim = Simulator::new(arena, panel.clone(), registry).unwrap();
        (sim, panel)
    }

    #[test]
    fn test_starts_paused_and_ticks_only_when_playing() {
        let registry = ProgramRegistry::new().with("main", |bb| {
            bb.fd(0)?;
            bb.fd(3)?;
            bb.msleep(5000)
        });
        let (sim, _panel) = simulator(Vec::new(), DriveMapping::Motors { left: 0, right: 3 }, registry);
        assert!(sim.is_paused());
        sim.arena().write().robot_mut().unwrap().set_speeds(100, 100);
        sim.tick(10.0);
        assert!(sim.arena().read().robot().unwrap().location().is_origin());

        sim.play().unwrap();
        assert!(!sim.is_paused());
        thread::sleep(Duration::from_millis(30));
        sim.tick(100.0);
        assert!(sim.arena().read().robot().unwrap().location().x > 0.0);

        sim.play().unwrap();
        assert!(sim.is_paused());
        sim.e_stop();
        assert!(sim.runtime().wait_until_idle(Duration::from_secs(1)));
    }

    #[test]
    fn test_play_refuses_missing_sensor() {
        let (sim, panel) = simulator(Vec::new(), DriveMapping::None, ProgramRegistry::new());
        panel.set_analog(4, 0, InputMode::Real);
        assert!(matches!(sim.play(), Err(ConfigError::MissingSensor(4))));
        assert!(sim.is_paused());
    }

    #[test]
    fn test_run_until_program_ends() {
        let registry = ProgramRegistry::new().with("main", |bb| {
            bb.msleep(50)?;
            bb.print("done\n")
        });
        let (sim, panel) = simulator(Vec::new(), DriveMapping::None, registry);
        sim.play().unwrap();
        assert_eq!(sim.run(Duration::from_secs(5)), RunOutcome::Finished);
        assert!(sim.is_paused());
        assert_eq!(panel.lcd_text(), "done\n");
    }

    #[test]
    fn test_run_times_out_and_estop_kills() {
        let registry = ProgramRegistry::new().with("main", |bb| loop {
            bb.msleep(20)?;
        });
        let (sim, panel) = simulator(Vec::new(), DriveMapping::None, registry);
        sim.play().unwrap();
        assert_eq!(sim.run(Duration::from_millis(100)), RunOutcome::TimedOut);
        sim.e_stop();
        assert!(sim.is_paused());
        assert!(sim.runtime().wait_until_idle(Duration::from_secs(1)));
        assert!(panel.lcd_text().contains("Program Stopped!"));
    }

    #[test]
    fn test_robot_drives_into_wall_and_stops() {
        // Pipe across the robot's path, 400 mm ahead
        let wall = Wall::new(
            WallKind::Pvc {
                axis: StraightAxis::TopToBottom,
                length: 2000.0,
            },
            400.0,
            0.0,
        );
        let registry = ProgramRegistry::new().with("main", |bb| {
            bb.motor(0, 100)?;
            bb.motor(3, 100)?;
            bb.msleep(3000)
        });
        let (sim, _panel) = simulator(vec![wall], DriveMapping::Motors { left: 0, right: 3 }, registry);
        sim.play().unwrap();
        sim.run(Duration::from_millis(1500));
        sim.e_stop();
        let arena = sim.arena().read();
        let robot = arena.robot().unwrap();
        let x = robot.location().x;
        assert!(x > 200.0, "robot only reached {}", x);
        assert!(!robot.transformed_collision().overlaps(&arena.walls()[0].transformed_collision()));
    }

    #[test]
    fn test_toggle_light() {
        let (sim, _panel) = simulator(Vec::new(), DriveMapping::None, ProgramRegistry::new());
        assert!(sim.toggle_light());
        assert!(!sim.toggle_light());
    }

    #[test]
    fn test_run_limit_rejects_non_finite() {
        assert_eq!(run_limit(1.5).unwrap(), Duration::from_millis(1500));
        assert_eq!(run_limit(0.0).unwrap(), Duration::ZERO);
        for bad in [f64::INFINITY, f64::NAN, -1.0] {
            assert!(matches!(
                run_limit(bad),
                Err(ConfigError::InvalidParameter { .. })
            ));
        }
    }
}
