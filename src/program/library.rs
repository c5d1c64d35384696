//! The controller library as seen by user code. Every call first checks the
//! calling thread's kill flag and blocks while the simulator is paused, so a
//! program unwinds through `?` as soon as it next touches the library.

use super::error::{Fault, ProgramResult};
use super::motors::{MotorBank, port_index};
use super::process::CancelToken;
use super::runtime::Runtime;
use crate::config::{
    FIRST_DIGITAL_PORT, MOTOR_DONE_POLL_MS, MSLEEP_DIRECT_MS, MSLEEP_SETTLE_POLLS,
    NUM_ANALOG_PORTS, NUM_SENSOR_SLOTS, POWER_LEVEL, RUN_FOR_POLL_MS, SONAR_NO_READING,
    XBC_SERVO_SCALE,
};
use crate::debug_sensor;
use crate::types::ControllerType;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const A_BUTTON: u16 = 0x0001;
pub const B_BUTTON: u16 = 0x0002;
pub const RIGHT_BUTTON: u16 = 0x0010;
pub const LEFT_BUTTON: u16 = 0x0020;
pub const UP_BUTTON: u16 = 0x0040;
pub const DOWN_BUTTON: u16 = 0x0080;
pub const R_BUTTON: u16 = 0x0100;
pub const L_BUTTON: u16 = 0x0200;
pub const ALL_BUTTONS: u16 = 0x03F3;

/// Handle passed to every user process
pub struct Botball {
    runtime: Arc<Runtime>,
    token: CancelToken,
    id: i32,
}

impl Botball {
    pub(crate) fn new(runtime: Arc<Runtime>, token: CancelToken, id: i32) -> Self {
        Botball { runtime, token, id }
    }

    /// Process id, as returned by `start_process`
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    pub(crate) fn checkpoint(&self) -> ProgramResult {
        if self.token.is_cancelled() {
            return Err(Fault::Killed);
        }
        if self.runtime.timing().wait_while_paused(|| self.token.is_cancelled()) {
            Ok(())
        } else {
            Err(Fault::Killed)
        }
    }

    fn controller(&self) -> ControllerType {
        self.runtime.controller()
    }

    fn has_pid(&self) -> bool {
        self.controller().at_least(ControllerType::Xbc)
    }

    fn servo_scale(&self) -> i32 {
        if self.controller() == ControllerType::Xbc {
            XBC_SERVO_SCALE
        } else {
            1
        }
    }

    fn with_motor(&self, port: i32, pid_only: bool, f: impl FnOnce(&mut MotorBank, usize)) -> ProgramResult {
        self.checkpoint()?;
        if pid_only && !self.has_pid() {
            return Ok(());
        }
        if let Some(p) = port_index(port) {
            f(&mut self.runtime.motors().lock(), p);
        }
        Ok(())
    }

    // Motors

    /// Open-loop power, -100 to 100
    pub fn motor(&self, port: i32, power: i32) -> ProgramResult {
        let panel = self.runtime.panel();
        self.with_motor(port, false, |m, p| m.set_power(p, power, panel))
    }

    pub fn off(&self, port: i32) -> ProgramResult {
        self.motor(port, 0)
    }

    pub fn ao(&self) -> ProgramResult {
        (0..4).try_for_each(|port| self.off(port))
    }

    pub fn alloff(&self) -> ProgramResult {
        self.ao()
    }

    pub fn fd(&self, port: i32) -> ProgramResult {
        self.motor(port, 100)
    }

    pub fn bk(&self, port: i32) -> ProgramResult {
        self.motor(port, -100)
    }

    /// Raw PWM, 0-255 scaled to power
    pub fn setpwm(&self, port: i32, pwm: i32) -> ProgramResult {
        self.motor(port, pwm * 100 / 255)
    }

    /// Velocity in ticks per second
    pub fn mav(&self, port: i32, speed: i32) -> ProgramResult {
        let panel = self.runtime.panel();
        self.with_motor(port, true, |m, p| m.move_at_velocity(p, speed, panel))
    }

    /// Absolute move; a destination of 0 turns the motor off
    pub fn mtp(&self, port: i32, speed: i32, position: i64) -> ProgramResult {
        let panel = self.runtime.panel();
        self.with_motor(port, true, |m, p| m.move_to_position(p, speed, position, panel))
    }

    pub fn move_to_position(&self, port: i32, speed: i32, position: i64) -> ProgramResult {
        self.mtp(port, speed, position)
    }

    pub fn mrp(&self, port: i32, speed: i32, delta: i64) -> ProgramResult {
        let panel = self.runtime.panel();
        self.with_motor(port, true, |m, p| m.move_relative(p, speed, delta, panel))
    }

    pub fn move_relative_position(&self, port: i32, speed: i32, delta: i64) -> ProgramResult {
        self.mrp(port, speed, delta)
    }

    pub fn freeze(&self, port: i32) -> ProgramResult {
        let panel = self.runtime.panel();
        self.with_motor(port, true, |m, p| m.freeze(p, panel))
    }

    pub fn get_motor_done(&self, port: i32) -> ProgramResult<bool> {
        self.checkpoint()?;
        let Some(p) = port_index(port) else {
            return Ok(false);
        };
        if !self.has_pid() {
            return Ok(true);
        }
        Ok(self.runtime.motors().lock().is_done(p))
    }

    /// Blocks until the last position command on `port` completes
    pub fn bmd(&self, port: i32) -> ProgramResult {
        if !self.has_pid() || port_index(port).is_none() {
            return self.checkpoint();
        }
        while !self.get_motor_done(port)? {
            self.msleep(MOTOR_DONE_POLL_MS)?;
        }
        Ok(())
    }

    pub fn block_motor_done(&self, port: i32) -> ProgramResult {
        self.bmd(port)
    }

    /// Truncated to 32 bits like the controller's counter
    pub fn get_motor_position_counter(&self, port: i32) -> ProgramResult<i32> {
        self.checkpoint()?;
        match port_index(port) {
            Some(p) if self.has_pid() => Ok(self.runtime.motors().lock().position(p) as i32),
            _ => Ok(0),
        }
    }

    pub fn clear_motor_position_counter(&self, port: i32) -> ProgramResult {
        let panel = self.runtime.panel();
        self.with_motor(port, true, |m, p| m.clear_position(p, panel))
    }

    /// Accepted for compatibility; the simulated loop has no gains
    pub fn set_pid_gains(&self, _port: i32, _p: i32, _i: i32, _d: i32, _pd: i32, _id: i32, _dd: i32) -> ProgramResult {
        self.checkpoint()
    }

    // Servos

    /// Position in controller units; -1 disables the servo
    pub fn set_servo_position(&self, port: i32, position: i32) -> ProgramResult {
        self.checkpoint()?;
        if !self.controller().at_least(ControllerType::Hb) {
            return Ok(());
        }
        let position = if position == -1 {
            -1
        } else {
            position.saturating_mul(self.servo_scale())
        };
        if let Some(p) = port_index(port) {
            self.runtime
                .motors()
                .lock()
                .set_servo(p, position, self.runtime.panel());
        }
        Ok(())
    }

    /// The requested position, not where the horn is right now
    pub fn get_servo_position(&self, port: i32) -> ProgramResult<i32> {
        self.checkpoint()?;
        match port_index(port) {
            Some(p) if self.controller().at_least(ControllerType::Hb) => {
                Ok(self.runtime.motors().lock().servo_target(p) / self.servo_scale())
            }
            _ => Ok(-1),
        }
    }

    pub fn enable_servos(&self) -> ProgramResult {
        self.checkpoint()?;
        self.runtime
            .motors()
            .lock()
            .set_servos_enabled(true, self.runtime.panel());
        Ok(())
    }

    pub fn disable_servos(&self) -> ProgramResult {
        self.checkpoint()?;
        self.runtime
            .motors()
            .lock()
            .set_servos_enabled(false, self.runtime.panel());
        Ok(())
    }

    // Timing

    /// Sleeps in simulated time. Waits longer than a few milliseconds poll the
    /// program clock, so time spent paused does not count.
    pub fn msleep(&self, ms: i64) -> ProgramResult {
        let target = self
            .runtime
            .timing()
            .now_ms()
            .saturating_add(ms)
            .saturating_sub(MSLEEP_DIRECT_MS);
        self.checkpoint()?;
        if ms <= MSLEEP_DIRECT_MS {
            thread::sleep(Duration::from_millis(ms.max(0) as u64));
            return Ok(());
        }
        // Require a few consecutive polls past the target so a pause/resume
        // transition cannot end the wait early
        let mut settled = 0;
        loop {
            let time = self.runtime.timing().now_ms();
            if time >= target && settled >= MSLEEP_SETTLE_POLLS {
                return Ok(());
            }
            self.defer()?;
            settled = if time < target { 0 } else { settled + 1 };
        }
    }

    pub fn sleep(&self, seconds: f64) -> ProgramResult {
        self.msleep((seconds * 1000.0).round() as i64)
    }

    /// Yields for about a millisecond
    pub fn defer(&self) -> ProgramResult {
        self.checkpoint()?;
        thread::sleep(Duration::from_millis(1));
        Ok(())
    }

    /// Program time in seconds
    pub fn seconds(&self) -> ProgramResult<f64> {
        self.checkpoint()?;
        Ok(self.runtime.timing().now_ms() as f64 / 1000.0)
    }

    pub fn mseconds(&self) -> ProgramResult<i64> {
        self.checkpoint()?;
        Ok(self.runtime.timing().now_ms())
    }

    // Sensors

    /// Digital port 8-15. The first-generation CBC numbers them from 0.
    pub fn digital(&self, port: i32) -> ProgramResult<bool> {
        self.defer()?;
        let port = if self.controller() == ControllerType::CbcV1 { port + 8 } else { port };
        let Some(p) = usize::try_from(port)
            .ok()
            .filter(|p| (FIRST_DIGITAL_PORT..NUM_SENSOR_SLOTS).contains(p))
        else {
            return Ok(false);
        };
        let arena = self.runtime.arena().read();
        let value = arena
            .robot()
            .is_some_and(|robot| robot.digital(p, self.runtime.panel(), &arena));
        debug_sensor!(p, "digital {}", value);
        Ok(value)
    }

    /// 10-bit reading from analog port 0-7. The first-generation CBC numbers
    /// them from 8.
    pub fn analog10(&self, port: i32) -> ProgramResult<i32> {
        self.defer()?;
        let port = if self.controller() == ControllerType::CbcV1 { port - 8 } else { port };
        let Some(p) = usize::try_from(port).ok().filter(|&p| p < NUM_ANALOG_PORTS) else {
            return Ok(0);
        };
        let value = self.read_analog(p);
        debug_sensor!(p, "analog {}", value);
        Ok(value)
    }

    /// 8-bit reading
    pub fn analog(&self, port: i32) -> ProgramResult<i32> {
        Ok(self.analog10(port)? / 4)
    }

    /// 12-bit reading
    pub fn analog12(&self, port: i32) -> ProgramResult<i32> {
        Ok(4 * self.analog10(port)?)
    }

    fn read_analog(&self, port: usize) -> i32 {
        let arena = self.runtime.arena().read();
        arena
            .robot()
            .map_or(0, |robot| robot.analog(port, self.runtime.panel(), &arena))
    }

    fn accel(&self, axis: usize) -> ProgramResult<i32> {
        self.checkpoint()?;
        if !self.controller().at_least(ControllerType::CbcV1) {
            return Ok(0);
        }
        Ok(4 * (self.read_analog(NUM_ANALOG_PORTS + axis) - 512))
    }

    pub fn accel_x(&self) -> ProgramResult<i32> {
        self.accel(0)
    }

    pub fn accel_y(&self) -> ProgramResult<i32> {
        self.accel(1)
    }

    pub fn accel_z(&self) -> ProgramResult<i32> {
        self.accel(2)
    }

    /// Distance in mm; the simulator has no sonar so it never sees anything
    pub fn sonar(&self, port: i32) -> ProgramResult<i32> {
        self.checkpoint()?;
        Ok(if (0..NUM_ANALOG_PORTS as i32).contains(&port) {
            SONAR_NO_READING
        } else {
            0
        })
    }

    pub fn button_mask(&self) -> ProgramResult<u16> {
        self.defer()?;
        Ok(self.runtime.panel().button_mask())
    }

    fn button(&self, mask: u16) -> ProgramResult<bool> {
        Ok(self.button_mask()? & mask != 0)
    }

    pub fn a_button(&self) -> ProgramResult<bool> {
        self.button(A_BUTTON)
    }

    pub fn b_button(&self) -> ProgramResult<bool> {
        self.button(B_BUTTON)
    }

    pub fn left_button(&self) -> ProgramResult<bool> {
        self.button(LEFT_BUTTON)
    }

    pub fn right_button(&self) -> ProgramResult<bool> {
        self.button(RIGHT_BUTTON)
    }

    pub fn up_button(&self) -> ProgramResult<bool> {
        self.button(UP_BUTTON)
    }

    pub fn down_button(&self) -> ProgramResult<bool> {
        self.button(DOWN_BUTTON)
    }

    pub fn choose_button(&self) -> ProgramResult<bool> {
        self.button(A_BUTTON)
    }

    pub fn cancel_button(&self) -> ProgramResult<bool> {
        self.button(B_BUTTON)
    }

    pub fn black_button(&self) -> ProgramResult<bool> {
        self.checkpoint()?;
        Ok(self.runtime.panel().black_button())
    }

    // Display and sound

    /// Writes to the LCD. The RCX has none.
    pub fn print(&self, text: impl AsRef<str>) -> ProgramResult {
        self.checkpoint()?;
        if self.controller() != ControllerType::Rcx {
            self.runtime.panel().print(text.as_ref());
        }
        Ok(())
    }

    pub fn display_clear(&self) -> ProgramResult {
        self.checkpoint()?;
        match self.controller() {
            ControllerType::Rcx => {}
            c if c.at_least(ControllerType::CbcV1) => self.runtime.panel().print("\n\n\n\n\n\n\n\n"),
            _ => self.runtime.panel().clear_display(),
        }
        Ok(())
    }

    pub fn beep(&self) -> ProgramResult {
        self.tone(500.0, 0.07)?;
        self.sleep(0.03)
    }

    pub fn tone(&self, frequency: f64, seconds: f64) -> ProgramResult {
        self.set_beeper_pitch(frequency)?;
        self.beeper_on()?;
        self.sleep(seconds)?;
        self.beeper_off()
    }

    /// The beeper has a single pitch
    pub fn set_beeper_pitch(&self, _frequency: f64) -> ProgramResult {
        self.checkpoint()
    }

    pub fn beeper_on(&self) -> ProgramResult {
        self.checkpoint()?;
        self.runtime.panel().set_beeper(true);
        Ok(())
    }

    pub fn beeper_off(&self) -> ProgramResult {
        self.checkpoint()?;
        self.runtime.panel().set_beeper(false);
        Ok(())
    }

    // Miscellaneous

    /// Battery voltage
    pub fn power_level(&self) -> ProgramResult<f64> {
        self.checkpoint()?;
        Ok(POWER_LEVEL)
    }

    /// Uniform in `0..limit`
    pub fn random(&self, limit: i32) -> ProgramResult<i32> {
        self.checkpoint()?;
        Ok((limit as f64 * rand::random::<f64>()) as i32)
    }

    /// Floating analog inputs are managed by the simulator
    pub fn set_each_analog_state(&self, _states: [i32; 8]) -> ProgramResult {
        self.checkpoint()
    }

    // Processes

    pub fn start_process(&self, name: &str) -> ProgramResult<i32> {
        self.checkpoint()?;
        Ok(self.runtime.start_process(name))
    }

    /// 1 if the process was found
    pub fn kill_process(&self, id: i32) -> ProgramResult<i32> {
        self.checkpoint()?;
        Ok(i32::from(self.runtime.kill_process(id)))
    }

    /// Runs `name` for at most `seconds`, killing it if it is still going
    pub fn run_for(&self, name: &str, seconds: f64) -> ProgramResult {
        let id = self.start_process(name)?;
        let until = self.seconds()? + seconds;
        while self.seconds()? < until {
            if !self.runtime.processes().is_alive(id) {
                return Ok(());
            }
            self.msleep(RUN_FOR_POLL_MS)?;
        }
        self.kill_process(id)?;
        Ok(())
    }

    /// Ends the game after `seconds`, from a separate process
    pub fn shut_down_in(&self, seconds: f64) -> ProgramResult<i32> {
        self.print(format!("shut_down_in {:.6}\n", seconds))?;
        Ok(self.runtime.start_task(
            "shut_down_task",
            Arc::new(move |bb: &Botball| bb.shut_down_task(seconds)),
        ))
    }

    fn shut_down_task(&self, seconds: f64) -> ProgramResult {
        self.sleep(seconds)?;
        self.print("Game over")?;
        self.runtime.processes().kill_all_except(Some(self.id));
        self.ao()?;
        self.beeper_off()?;
        self.disable_servos()?;
        if self.create_connected() {
            self.create_stop()?;
            self.create_passive()?;
            self.create_disconnect()?;
        }
        self.print(".\n")
    }

    /// Interactive light calibration, then blocks until the starting light
    /// comes on
    pub fn wait_for_light(&self, port: i32) -> ProgramResult {
        let cbc = self.controller().at_least(ControllerType::CbcV1);
        let read = |bb: &Botball| if cbc { bb.analog10(port) } else { bb.analog(port) };
        let (limit, on_label, off_label) = if cbc {
            (512, "Left", "Right")
        } else {
            (128, "A", "B")
        };
        loop {
            self.print(format!("Calibrate with sensor on port {}\n", port))?;
            self.msleep(500)?;
            self.print(format!("Press {} when light on\n", on_label))?;
            while !(if cbc { self.left_button()? } else { self.a_button()? }) {
                self.defer()?;
            }
            let on = read(self)?;
            self.beep()?;
            self.print(format!("Light on value is {}\n", on))?;
            self.msleep(500)?;
            self.beep()?;
            self.print(format!("Press {} when light off\n", off_label))?;
            while !(if cbc { self.right_button()? } else { self.b_button()? }) {
                self.defer()?;
            }
            let off = read(self)?;
            self.beep()?;
            self.print(format!("Light off value is {}\n", off))?;
            self.msleep(500)?;

            let difference = off - on;
            let center = (off + on) / 2;
            if difference > limit {
                self.print(format!("Good Calibration\nDifference is {}\nWaiting...\n", difference))?;
                self.beep()?;
                while read(self)? > center {
                    self.defer()?;
                }
                if cbc {
                    let going = read(self)?;
                    self.print(format!("Going value is {}\n", going))?;
                }
                return Ok(());
            }
            self.beep()?;
            self.print("Bad Calibration\n")?;
            if on > limit {
                self.print("Aim Sensor!\n")?;
            } else {
                self.print("Add Shielding!\n")?;
            }
            if !cbc {
                // Older controllers lock up until reset
                loop {
                    self.beep()?;
                }
            }
            self.msleep(500)?;
        }
    }

    /// Pauses the whole simulation from inside the program
    pub fn kiss_sim_pause(&self) -> ProgramResult {
        self.checkpoint()?;
        self.runtime.timing().pause();
        Ok(())
    }

    pub fn kiss_sim_enable_pause(&self) -> ProgramResult {
        self.checkpoint()
    }
}
