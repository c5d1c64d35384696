//! Motor and servo state for the four controller ports, and the control
//! loop step that advances them.
//!
//! A motor is idle while its PID speed is 0. Position commands give it a
//! speed and a destination; the control loop advances the position counter
//! in proportion to power and elapsed time until the counter crosses the
//! destination, then lands it there and stops (or freezes) the motor.

use crate::config::{
    FROZEN_DISPLAY_POWER, MOTOR_ARRIVAL_JITTER, MOTOR_MAX_POWER, MOTOR_MAX_SPEED,
    MOTOR_MS_PER_TICK, MOTOR_TICKS_PER_REV, NUM_MOTOR_PORTS, SERVO_CENTER, SERVO_MAX,
    SERVO_SLEW_STEP,
};
use crate::debug_pid;
use crate::panel::ControlPanel;
use crate::utils::random_in;

/// Maps a user port number to an index, rejecting anything outside 0-3
pub fn port_index(port: i32) -> Option<usize> {
    usize::try_from(port).ok().filter(|&p| p < NUM_MOTOR_PORTS)
}

#[derive(Debug, Clone)]
pub struct MotorBank {
    power: [i32; NUM_MOTOR_PORTS],
    speed: [i32; NUM_MOTOR_PORTS], // PID speed, 0 when done
    dest: [i64; NUM_MOTOR_PORTS],
    counts: [i64; NUM_MOTOR_PORTS],
    residue: [f64; NUM_MOTOR_PORTS], // Fractional ticks not yet counted
    servo_target: [i32; NUM_MOTOR_PORTS],
    servo_pos: [i32; NUM_MOTOR_PORTS],
    servo_enabled: [bool; NUM_MOTOR_PORTS],
    jitter: i64,
}

impl MotorBank {
    pub fn new() -> Self {
        MotorBank {
            power: [0; NUM_MOTOR_PORTS],
            speed: [0; NUM_MOTOR_PORTS],
            dest: [i64::MIN; NUM_MOTOR_PORTS],
            counts: [0; NUM_MOTOR_PORTS],
            residue: [0.0; NUM_MOTOR_PORTS],
            servo_target: [SERVO_CENTER; NUM_MOTOR_PORTS],
            servo_pos: [SERVO_CENTER; NUM_MOTOR_PORTS],
            servo_enabled: [false; NUM_MOTOR_PORTS],
            jitter: MOTOR_ARRIVAL_JITTER,
        }
    }

    /// Exact arrivals, for deterministic runs
    pub fn without_jitter(mut self) -> Self {
        self.jitter = 0;
        self
    }

    fn show_motor(&self, port: usize, panel: &dyn ControlPanel) {
        panel.set_motor_power(port, self.power[port]);
        panel.set_motor_shaft_angle(
            port,
            (self.counts[port].saturating_mul(360) / MOTOR_TICKS_PER_REV).rem_euclid(360) as i32,
        );
        panel.set_motor_destination(port, self.dest[port]);
        panel.set_motor_position(port, self.counts[port]);
    }

    /// Open-loop power in -100..=100. Clears any position goal.
    pub fn set_power(&mut self, port: usize, power: i32, panel: &dyn ControlPanel) {
        let power = power.clamp(-MOTOR_MAX_POWER, MOTOR_MAX_POWER);
        self.dest[port] = if power > 0 { i64::MAX } else { i64::MIN };
        self.power[port] = power;
        self.speed[port] = 0;
        self.show_motor(port, panel);
    }

    pub fn off(&mut self, port: usize, panel: &dyn ControlPanel) {
        self.set_power(port, 0, panel);
    }

    pub fn all_off(&mut self, panel: &dyn ControlPanel) {
        for port in 0..NUM_MOTOR_PORTS {
            self.off(port, panel);
        }
    }

    /// Closed-loop velocity in ticks per second, -1000..=1000. Power is
    /// `speed / 10`, so below 10 the motor holds still and never arrives.
    pub fn move_at_velocity(&mut self, port: usize, speed: i32, panel: &dyn ControlPanel) {
        let speed = speed.clamp(-MOTOR_MAX_SPEED, MOTOR_MAX_SPEED);
        self.set_power(port, speed / 10, panel);
        self.speed[port] = speed;
    }

    /// Drives toward an absolute position. A destination of 0 turns the motor off.
    pub fn move_to_position(&mut self, port: usize, speed: i32, target: i64, panel: &dyn ControlPanel) {
        if target == 0 {
            self.off(port, panel);
            return;
        }
        let direction = target.saturating_sub(self.counts[port]).signum() as i32;
        self.move_at_velocity(port, speed.saturating_mul(direction), panel);
        self.dest[port] = target;
        panel.set_motor_destination(port, target);
        debug_pid!(port, "moving to {} from {}", target, self.counts[port]);
    }

    pub fn move_relative(&mut self, port: usize, speed: i32, delta: i64, panel: &dyn ControlPanel) {
        let target = self.counts[port].saturating_add(delta);
        self.move_to_position(port, speed, target, panel);
    }

    /// Holds the shaft where it is. The port stays busy until commanded again.
    pub fn freeze(&mut self, port: usize, panel: &dyn ControlPanel) {
        self.off(port, panel);
        self.speed[port] = 1;
        self.power[port] = 0;
        self.dest[port] = self.counts[port];
        panel.set_motor_power(port, FROZEN_DISPLAY_POWER);
        panel.set_motor_destination(port, self.dest[port]);
        panel.set_motor_position(port, self.counts[port]);
    }

    pub fn is_done(&self, port: usize) -> bool {
        self.speed[port] == 0
    }

    pub fn position(&self, port: usize) -> i64 {
        self.counts[port]
    }

    pub fn power(&self, port: usize) -> i32 {
        self.power[port]
    }

    pub fn powers(&self) -> [i32; NUM_MOTOR_PORTS] {
        self.power
    }

    pub fn clear_position(&mut self, port: usize, panel: &dyn ControlPanel) {
        self.counts[port] = 0;
        self.residue[port] = 0.0;
        self.show_motor(port, panel);
    }

    /// Servo goal in 0..=2047; -1 disables the servo
    pub fn set_servo(&mut self, port: usize, position: i32, panel: &dyn ControlPanel) {
        if position == -1 {
            self.servo_enabled[port] = false;
            panel.set_servo_enabled(port, false);
            return;
        }
        if !(0..=SERVO_MAX).contains(&position) {
            return;
        }
        self.servo_target[port] = position;
        self.servo_enabled[port] = true;
        panel.set_servo_destination(port, position);
        panel.set_servo_enabled(port, true);
    }

    pub fn servo_target(&self, port: usize) -> i32 {
        self.servo_target[port]
    }

    pub fn servo_position(&self, port: usize) -> i32 {
        self.servo_pos[port]
    }

    pub fn servo_enabled(&self, port: usize) -> bool {
        self.servo_enabled[port]
    }

    pub fn set_servos_enabled(&mut self, enabled: bool, panel: &dyn ControlPanel) {
        for port in 0..NUM_MOTOR_PORTS {
            self.servo_enabled[port] = enabled;
            panel.set_servo_enabled(port, enabled);
        }
    }

    /// Advances every motor by `elapsed_ms`. Arrived motors freeze when
    /// `freeze_on_arrival` is set and switch off otherwise.
    pub fn step_motors(&mut self, elapsed_ms: f64, freeze_on_arrival: bool, panel: &dyn ControlPanel) {
        for port in 0..NUM_MOTOR_PORTS {
            let power = self.power[port];
            let counts = self.counts[port];
            let dest = self.dest[port];
            if (power > 0 && counts > dest) || (power < 0 && counts < dest) {
                let jitter = random_in(-self.jitter as i32, self.jitter as i32) as i64;
                self.counts[port] = dest.saturating_add(jitter);
                self.residue[port] = 0.0;
                if freeze_on_arrival {
                    self.freeze(port, panel);
                } else {
                    self.off(port, panel);
                }
                self.speed[port] = 0;
                debug_pid!(port, "arrived at {}", self.counts[port]);
            } else if power != 0 {
                self.residue[port] += power as f64 * elapsed_ms / MOTOR_MS_PER_TICK;
                let whole = self.residue[port].trunc();
                self.counts[port] = self.counts[port].saturating_add(whole as i64);
                self.residue[port] -= whole;
                self.show_motor(port, panel);
            }
        }
    }

    /// Moves enabled servos one slew step toward their targets
    pub fn step_servos(&mut self, panel: &dyn ControlPanel) {
        for port in 0..NUM_MOTOR_PORTS {
            let (pos, target) = (self.servo_pos[port], self.servo_target[port]);
            if !self.servo_enabled[port] || pos == target {
                continue;
            }
            let step = (target - pos).clamp(-SERVO_SLEW_STEP, SERVO_SLEW_STEP);
            self.servo_pos[port] = pos + step;
            panel.set_servo_position(port, self.servo_pos[port]);
            panel.set_servo_shaft_angle(port, 180 * self.servo_pos[port] / 2048 - 90);
        }
    }
}

impl Default for MotorBank {
    fn default() -> Self {
        MotorBank::new()
    }
}
