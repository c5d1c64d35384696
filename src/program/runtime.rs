use super::clock::Timing;
use super::create::CreateState;
use super::error::{Fault, ProgramResult};
use super::library::Botball;
use super::motors::MotorBank;
use super::process::{CancelToken, ProcessInfo, ProcessTable};
use super::registry::{ProgramFn, ProgramRegistry};
use crate::arena::Arena;
use crate::config::{DRIVE_MOTOR_SCALE, PID_LOOP_PERIOD_MS};
use crate::debug_process;
use crate::error::ConfigError;
use crate::panel::ControlPanel;
use crate::types::{ControllerType, DriveMapping};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Shared state behind every user thread, the control loop and the driver
pub struct Runtime {
    arena: Arc<RwLock<Arena>>,
    panel: Arc<dyn ControlPanel>,
    registry: ProgramRegistry,
    timing: Timing,
    motors: Mutex<MotorBank>,
    create: Mutex<CreateState>,
    processes: ProcessTable,
    pid: Mutex<Option<(CancelToken, JoinHandle<()>)>>,
    controller: ControllerType,
    drive: DriveMapping,
    axle_radius: f64,
}

impl Runtime {
    /// The arena must already hold the robot
    pub fn new(
        arena: Arc<RwLock<Arena>>,
        panel: Arc<dyn ControlPanel>,
        registry: ProgramRegistry,
    ) -> Result<Arc<Self>, ConfigError> {
        let (controller, drive, axle_radius) = {
            let guard = arena.read();
            let robot = guard.robot().ok_or(ConfigError::NoRobot)?;
            (robot.controller(), robot.drive(), robot.params().radius)
        };
        Ok(Arc::new(Runtime {
            arena,
            panel,
            registry,
            timing: Timing::new(),
            motors: Mutex::new(MotorBank::new()),
            create: Mutex::new(CreateState::new()),
            processes: ProcessTable::new(),
            pid: Mutex::new(None),
            controller,
            drive,
            axle_radius,
        }))
    }

    pub fn arena(&self) -> &Arc<RwLock<Arena>> {
        &self.arena
    }

    pub fn panel(&self) -> &dyn ControlPanel {
        self.panel.as_ref()
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn motors(&self) -> &Mutex<MotorBank> {
        &self.motors
    }

    pub fn create(&self) -> &Mutex<CreateState> {
        &self.create
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    pub fn controller(&self) -> ControllerType {
        self.controller
    }

    pub fn drive(&self) -> DriveMapping {
        self.drive
    }

    pub fn axle_radius(&self) -> f64 {
        self.axle_radius
    }

    pub fn set_wheel_speeds(&self, left: i32, right: i32) {
        if let Some(robot) = self.arena.write().robot_mut() {
            robot.set_speeds(left, right);
        }
    }

    /// Checks that every port reading from a sensor has one installed
    pub fn validate_inputs(&self) -> Result<(), ConfigError> {
        let arena = self.arena.read();
        let robot = arena.robot().ok_or(ConfigError::NoRobot)?;
        robot.validate_inputs(self.panel())
    }

    /// Starts the registered function `name` on its own thread and returns its id.
    /// Unknown names are reported on the display; the id is still consumed.
    pub fn start_process(self: &Arc<Self>, name: &str) -> i32 {
        let info = self.processes.allocate(name);
        match self.registry.get(name) {
            Some(body) => self.spawn(info, body),
            None => {
                let fault = Fault::FunctionNotFound(name.to_string());
                self.report_fault(&info.thread_name(), &fault.to_string());
                info.id
            }
        }
    }

    /// Starts an unregistered body as a user process
    pub fn start_task(self: &Arc<Self>, name: &str, body: ProgramFn) -> i32 {
        let info = self.processes.allocate(name);
        self.spawn(info, body)
    }

    fn spawn(self: &Arc<Self>, info: ProcessInfo, body: ProgramFn) -> i32 {
        let id = info.id;
        let thread_name = info.thread_name();
        let handle = Botball::new(Arc::clone(self), info.token.clone(), id);
        let runtime = Arc::clone(self);
        let tracked = info.clone();
        self.processes.insert(info.clone());

        let name = thread_name.clone();
        let spawned = thread::Builder::new().name(thread_name).spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&handle)));
            runtime.report_exit(&name, outcome);
            tracked.mark_finished();
        });
        match spawned {
            Ok(_) => debug_process!(id, "started {}", info.name),
            Err(e) => {
                log::error!("Failed to start thread for {}: {}", info.name, e);
                info.mark_finished();
            }
        }
        id
    }

    fn report_exit(&self, thread_name: &str, outcome: thread::Result<ProgramResult>) {
        match outcome {
            Ok(Ok(())) => debug_process!("{} finished", thread_name),
            Ok(Err(Fault::Killed)) => debug_process!("{} killed", thread_name),
            Ok(Err(fault)) => self.report_fault(thread_name, &fault.to_string()),
            Err(payload) => {
                let fault = Fault::Panicked(panic_message(payload.as_ref()));
                self.report_fault(thread_name, &fault.to_string());
            }
        }
    }

    fn report_fault(&self, thread_name: &str, message: &str) {
        log::error!("Run-time error in {}: {}", thread_name, message);
        self.panel
            .print(&format!("Run-time Error, in thread {}: {}\n", thread_name, message));
    }

    /// Signals one process. True if it was being tracked.
    pub fn kill_process(&self, id: i32) -> bool {
        let found = self.processes.kill(id);
        if found {
            debug_process!(id, "kill requested");
        }
        found
    }

    /// Signals every user process and stops the control loop
    pub fn kill_all(&self) {
        self.processes.kill_all();
        self.stop_pid();
    }

    /// True while any user process is running. Once none are, the control
    /// loop is stopped as well.
    pub fn is_running(&self) -> bool {
        let alive = self.processes.prune();
        if !alive {
            self.stop_pid();
        }
        alive
    }

    /// Polls until every user process has ended or `timeout` passes
    pub fn wait_until_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if !self.is_running() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        !self.is_running()
    }

    /// Fresh program run: stop anything left over, zero the clock, start the
    /// control loop and `main`
    pub fn invoke_main(self: &Arc<Self>) -> Result<i32, ConfigError> {
        self.validate_inputs()?;
        self.kill_all();
        self.timing.restart();
        self.start_pid();
        Ok(self.start_process("main"))
    }

    pub fn start_pid(self: &Arc<Self>) {
        let mut pid = self.pid.lock();
        if pid.is_some() {
            return;
        }
        let token = CancelToken::new();
        let runtime = Arc::clone(self);
        let loop_token = token.clone();
        match thread::Builder::new()
            .name("pid".to_string())
            .spawn(move || runtime.control_loop(&loop_token))
        {
            Ok(handle) => *pid = Some((token, handle)),
            Err(e) => log::error!("Failed to start motor control loop: {}", e),
        }
    }

    /// Returns once the loop has made its last update
    pub fn stop_pid(&self) {
        let running = self.pid.lock().take();
        if let Some((token, handle)) = running {
            token.cancel();
            if handle.join().is_err() {
                log::error!("Motor control loop panicked");
            }
        }
    }

    pub fn pid_running(&self) -> bool {
        self.pid.lock().is_some()
    }

    fn control_loop(&self, token: &CancelToken) {
        let motors_enabled = self.controller.at_least(ControllerType::Xbc);
        let servos_enabled = self.controller.at_least(ControllerType::Hb);
        let freeze_on_arrival = self.controller.at_least(ControllerType::CbcV1);
        let mut last = self.timing.now_ms();

        loop {
            if !self.timing.wait_while_paused(|| token.is_cancelled()) {
                break;
            }
            let now = self.timing.now_ms();
            let elapsed = (now - last).max(0) as f64;
            last = now;

            let powers = {
                let mut motors = self.motors.lock();
                if motors_enabled {
                    motors.step_motors(elapsed, freeze_on_arrival, self.panel());
                }
                if servos_enabled {
                    motors.step_servos(self.panel());
                }
                motors.powers()
            };
            if let DriveMapping::Motors { left, right } = self.drive {
                self.set_wheel_speeds(
                    (powers[left] as f64 * DRIVE_MOTOR_SCALE) as i32,
                    (powers[right] as f64 * DRIVE_MOTOR_SCALE) as i32,
                );
            }
            thread::sleep(Duration::from_millis(PID_LOOP_PERIOD_MS));
        }
        debug_process!("motor control loop stopped");
    }

    /// Emergency stop: kill everything, pause, and leave all actuators idle
    pub fn emergency_stop(&self) {
        if self.is_running() {
            self.kill_all();
            self.panel.print("Program Stopped!\n");
        }
        self.stop_pid();
        self.timing.pause();
        {
            let mut motors = self.motors.lock();
            motors.set_servos_enabled(false, self.panel());
            motors.all_off(self.panel());
        }
        self.create.lock().disconnect();
        self.set_wheel_speeds(0, 0);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Shape;
    use crate::panel::HeadlessPanel;
    use crate::robot::{RobotParams, SimRobot};
    use crate::sensor::RobotConfig;
    use crate::types::Location;

    pub(crate) fn test_runtime(
        controller: ControllerType,
        drive: DriveMapping,
        registry: ProgramRegistry,
    ) -> (Arc<Runtime>, Arc<HeadlessPanel>) {
        let params = RobotParams {
            name: "test".to_string(),
            icon: "test".to_string(),
            controller,
            drive,
            radius: 100.0,
            factor: 1.0,
            model: "test".to_string(),
        };
        let robot = SimRobot::with_shape(
            params,
            Shape::centered_rect(100.0, 100.0),
            RobotConfig::controller("test").with_start(Location::default()),
            None,
        );
        let mut arena = Arena::new(Vec::new());
        arena.place_robot(robot);
        let panel = Arc::new(HeadlessPanel::new());
        let runtime = Runtime::new(
            Arc::new(RwLock::new(arena)),
            panel.clone(),
            registry,
        )
        .unwrap();
        (runtime, panel)
    }

    #[test]
    fn test_runtime_requires_robot() {
        let result = Runtime::new(
            Arc::new(RwLock::new(Arena::new(Vec::new()))),
            Arc::new(HeadlessPanel::new()),
            ProgramRegistry::new(),
        );
        assert!(matches!(result, Err(ConfigError::NoRobot)));
    }

    #[test]
    fn test_main_runs_to_completion() {
        let registry = ProgramRegistry::new().with("main", |bb| {
            bb.print("hello\n")?;
            Ok(())
        });
        let (runtime, panel) = test_runtime(ControllerType::Cbc, DriveMapping::None, registry);
        assert_eq!(runtime.invoke_main().unwrap(), 0);
        assert!(runtime.wait_until_idle(Duration::from_secs(2)));
        assert_eq!(panel.lcd_text(), "hello\n");
        assert!(!runtime.pid_running());
    }

    #[test]
    fn test_missing_function_is_reported() {
        let (runtime, panel) =
            test_runtime(ControllerType::Cbc, DriveMapping::None, ProgramRegistry::new());
        let id = runtime.start_process("nowhere");
        assert_eq!(id, 0);
        assert!(!runtime.is_running());
        assert!(panel.lcd_text().contains("Function nowhere not found"));
        assert_eq!(runtime.start_process("nowhere"), 1);
    }

    #[test]
    fn test_faults_are_contained() {
        let registry = ProgramRegistry::new()
            .with("bad", |_| Err(Fault::Runtime("division by zero".to_string())))
            .with("boom", |_| panic!("index out of bounds"))
            .with("steady", |bb| {
                bb.msleep(150)?;
                bb.print("steady done\n")
            });
        let (runtime, panel) = test_runtime(ControllerType::Cbc, DriveMapping::None, registry);
        runtime.start_process("steady");
        runtime.start_process("bad");
        runtime.start_process("boom");
        assert!(runtime.wait_until_idle(Duration::from_secs(3)));
        let lcd = panel.lcd_text();
        assert!(lcd.contains("Run-time Error, in thread User Thread #1 (bad): division by zero"));
        assert!(lcd.contains("Run-time Error, in thread User Thread #2 (boom): panic: index out of bounds"));
        assert!(lcd.contains("steady done"));
    }

    #[test]
    fn test_killed_thread_leaves_running_set() {
        let registry = ProgramRegistry::new().with("loop_forever", |bb| loop {
            bb.msleep(10)?;
        });
        let (runtime, _panel) = test_runtime(ControllerType::Cbc, DriveMapping::None, registry);
        let id = runtime.start_process("loop_forever");
        thread::sleep(Duration::from_millis(30));
        assert_eq!(runtime.processes().running_ids(), vec![id]);
        assert!(runtime.kill_process(id));
        assert!(!runtime.kill_process(id));
        assert!(runtime.processes().running_ids().is_empty());
        assert!(runtime.wait_until_idle(Duration::from_secs(1)));
    }

    #[test]
    fn test_motor_mapped_drive_follows_power() {
        let registry = ProgramRegistry::new().with("main", |bb| {
            bb.motor(0, 50)?;
            bb.motor(3, -20)?;
            bb.msleep(60)
        });
        let (runtime, _panel) = test_runtime(
            ControllerType::Cbc,
            DriveMapping::Motors { left: 0, right: 3 },
            registry,
        );
        runtime.invoke_main().unwrap();
        thread::sleep(Duration::from_millis(40));
        let speeds = runtime.arena().read().robot().unwrap().speeds();
        assert_eq!(speeds, (450, -180));
        runtime.kill_all();
    }

    #[test]
    fn test_emergency_stop() {
        let registry = ProgramRegistry::new().with("main", |bb| {
            bb.set_servo_position(0, 2000)?;
            bb.fd(1)?;
            loop {
                bb.defer()?;
            }
        });
        let (runtime, panel) = test_runtime(
            ControllerType::Cbc,
            DriveMapping::Motors { left: 1, right: 1 },
            registry,
        );
        runtime.invoke_main().unwrap();
        thread::sleep(Duration::from_millis(30));
        runtime.emergency_stop();
        assert!(runtime.timing().is_paused());
        assert!(runtime.wait_until_idle(Duration::from_secs(1)));
        assert_eq!(runtime.motors().lock().power(1), 0);
        assert!(!panel.servo_view(0).unwrap().enabled);
        assert_eq!(runtime.arena().read().robot().unwrap().speeds(), (0, 0));
        assert!(panel.lcd_text().ends_with("Program Stopped!\n"));
    }
}
