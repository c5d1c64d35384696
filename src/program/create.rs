//! iRobot Create serial library. Only available when the robot's drive is
//! mapped to the Create and the controller is an XBC or newer.

use super::error::ProgramResult;
use super::library::Botball;
use crate::config::{
    ARC_STRAIGHT_MAX, CREATE_BATTERY_CHARGE, CREATE_BATTERY_TEMP, CREATE_BATTERY_VOLTAGE,
    CREATE_MAX_SPEED,
};
use crate::geometry::SimObject;
use crate::kinematics::arc_drive;
use crate::types::{ControllerType, DriveMapping, Location};
use std::f64::consts::PI;

const MODE_OFF: i32 = 0;
const MODE_PASSIVE: i32 = 1;
const MODE_SAFE: i32 = 2;
const MODE_FULL: i32 = 3;

const LED_POWER: usize = 0;
const LED_PLAY: usize = 1;
const LED_ADVANCE: usize = 2;

const SPIN_POLL_MS: i64 = 30;

/// Values the sensor update calls copy out of the simulation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateSensors {
    pub lbump: i32,
    pub rbump: i32,
    pub ldrop: i32,
    pub rdrop: i32,
    pub fdrop: i32,
    pub lcliff: i32,
    pub lfcliff: i32,
    pub rfcliff: i32,
    pub rcliff: i32,
    pub lcliff_amt: i32,
    pub lfcliff_amt: i32,
    pub rfcliff_amt: i32,
    pub rcliff_amt: i32,
    pub distance: i32,
    pub angle: i32,
    pub total_angle: i32,
    pub advance_button: i32,
    pub play_button: i32,
    pub wall: i32,
    pub wall_amt: i32,
    pub wall_hb: i32,
    pub ir: i32,
    pub vel: i32,
    pub radius: i32,
    pub lvel: i32,
    pub rvel: i32,
    pub overcurrents: i32,
    pub batt_charge: i32,
    pub batt_capacity: i32,
    pub charge_state: i32,
    pub batt_voltage: i32,
    pub current_flow: i32,
    pub batt_temp: i32,
    pub digital_in: i32,
    pub analog_in: i32,
}

#[derive(Debug, Clone, Default)]
pub struct CreateState {
    connected: bool,
    mode: i32,
    leds: [i32; 3],
    wheels: (i32, i32), // mm/s
    pub sensors: CreateSensors,
    odometry: Option<Location>, // Pose at the last angle/distance update
    angle_residue: f64,
    distance_residue: f64,
}

impl CreateState {
    pub fn new() -> Self {
        CreateState::default()
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn mode(&self) -> i32 {
        if self.connected { self.mode } else { MODE_OFF }
    }

    /// Power LED (color + 65536 * brightness), play LED, advance LED
    pub fn leds(&self) -> [i32; 3] {
        self.leds
    }

    pub fn wheels(&self) -> (i32, i32) {
        self.wheels
    }

    /// Drops the connection and stops the wheels
    pub fn disconnect(&mut self) {
        self.leds = [0; 3];
        self.wheels = (0, 0);
        self.mode = MODE_OFF;
        self.connected = false;
        self.odometry = None;
    }

    /// Degrees turned since the last call, rounded, with the remainder carried
    fn take_angle(&mut self, pose: &Location) -> i32 {
        let last = self.odometry.get_or_insert(*pose);
        let mut turned = pose.theta - last.theta;
        turned = (turned + PI).rem_euclid(2.0 * PI) - PI;
        let total = turned.to_degrees() + self.angle_residue;
        let whole = total.round();
        self.angle_residue = total - whole;
        last.theta = pose.theta;
        whole as i32
    }

    /// Signed millimetres travelled along the heading since the last call
    fn take_distance(&mut self, pose: &Location) -> i32 {
        let last = self.odometry.get_or_insert(*pose);
        let (dx, dy) = (pose.x - last.x, pose.y - last.y);
        let along = dx * pose.theta.cos() + dy * pose.theta.sin();
        let total = dx.hypot(dy).copysign(along) + self.distance_residue;
        let whole = total.round();
        self.distance_residue = total - whole;
        last.x = pose.x;
        last.y = pose.y;
        whole as i32
    }
}

impl Botball {
    fn create_available(&self) -> bool {
        let runtime = self.runtime();
        runtime.drive() == DriveMapping::Create && runtime.controller().at_least(ControllerType::Xbc)
    }

    pub(crate) fn create_connected(&self) -> bool {
        self.runtime().create().lock().connected()
    }

    /// Checks the connection, complaining on the LCD when there is none
    fn require_create(&self) -> ProgramResult<bool> {
        self.checkpoint()?;
        let panel = self.runtime().panel();
        if !self.create_available() {
            panel.print("Create not available\n");
            return Ok(false);
        }
        if !self.create_connected() {
            panel.print("No Create connection mode is 0\n");
            return Ok(false);
        }
        Ok(true)
    }

    fn robot_pose(&self) -> Option<Location> {
        self.runtime().arena().read().robot().map(|r| *r.location())
    }

    /// Snapshot of the Create state for user code
    pub fn create_state(&self) -> CreateState {
        self.runtime().create().lock().clone()
    }

    /// 0 on success, -1 if already connected or unavailable
    pub fn create_connect(&self) -> ProgramResult<i32> {
        self.checkpoint()?;
        if !self.create_available() {
            self.runtime().panel().print("Create not available\n");
            return Ok(-1);
        }
        {
            let mut create = self.runtime().create().lock();
            if create.connected {
                return Ok(-1);
            }
            create.connected = true;
            create.odometry = None;
        }
        self.create_start()?;
        self.create_advance_led(1)?;
        self.create_safe()?;
        Ok(0)
    }

    pub fn create_disconnect(&self) -> ProgramResult {
        if self.require_create()? {
            self.create_power_led(0, 255)?;
            self.create_stop()?;
            self.runtime().create().lock().disconnect();
        }
        Ok(())
    }

    pub fn create_mode(&self) -> ProgramResult<i32> {
        self.checkpoint()?;
        Ok(self.runtime().create().lock().mode())
    }

    fn set_create_mode(&self, mode: i32, color: i32) -> ProgramResult {
        if self.require_create()? {
            self.runtime().create().lock().mode = mode;
            self.create_power_led(color, 255)?;
        }
        Ok(())
    }

    pub fn create_passive(&self) -> ProgramResult {
        self.set_create_mode(MODE_PASSIVE, 0)
    }

    pub fn create_safe(&self) -> ProgramResult {
        self.set_create_mode(MODE_SAFE, 64)
    }

    pub fn create_full(&self) -> ProgramResult {
        self.set_create_mode(MODE_FULL, 227)
    }

    pub fn create_start(&self) -> ProgramResult {
        self.create_passive()
    }

    /// Built-in cleaning demos are not simulated
    pub fn create_demo(&self, _demo: i32) -> ProgramResult {
        if self.require_create()? {
            self.runtime().panel().print("Simulator doesn't currently support demos\n");
        }
        Ok(())
    }

    // Sensor updates. Each returns 0, or -1 without a connection.

    pub fn create_sensor_update(&self) -> ProgramResult<i32> {
        if !self.require_create()? {
            return Ok(-1);
        }
        self.create_buttons()?;
        self.create_wall()?;
        self.create_bumpdrop()?;
        self.create_angle()?;
        self.create_distance()?;
        self.create_velocity()?;
        self.create_battery_charge()?;
        self.create_read_ir()?;
        self.create_cargo_bay_inputs()?;
        self.create_cliffs()?;
        Ok(0)
    }

    fn update_sensors(&self, f: impl FnOnce(&mut CreateSensors)) -> ProgramResult<i32> {
        if !self.require_create()? {
            return Ok(-1);
        }
        f(&mut self.runtime().create().lock().sensors);
        Ok(0)
    }

    /// Bumpers from the bumper sensors; the wheels never drop
    pub fn create_bumpdrop(&self) -> ProgramResult<i32> {
        let (left, right) = {
            let arena = self.runtime().arena().read();
            arena.robot().map_or((false, false), |r| {
                (r.extra_digital(0, &arena), r.extra_digital(1, &arena))
            })
        };
        self.update_sensors(|s| {
            s.lbump = i32::from(left);
            s.rbump = i32::from(right);
            s.ldrop = 0;
            s.rdrop = 0;
            s.fdrop = 0;
        })
    }

    /// The floor is flat so cliffs never trigger, but the cliff sensors
    /// report floor reflectance
    pub fn create_cliffs(&self) -> ProgramResult<i32> {
        let amounts: [i32; 4] = {
            let arena = self.runtime().arena().read();
            match arena.robot() {
                Some(r) => std::array::from_fn(|i| r.extra_analog(2 + i, &arena)),
                None => [0; 4],
            }
        };
        self.update_sensors(|s| {
            s.lcliff = 0;
            s.lfcliff = 0;
            s.rfcliff = 0;
            s.rcliff = 0;
            s.lcliff_amt = amounts[0];
            s.lfcliff_amt = amounts[1];
            s.rfcliff_amt = amounts[2];
            s.rcliff_amt = amounts[3];
        })
    }

    /// Degrees turned since the previous update, counter-clockwise positive
    pub fn create_angle(&self) -> ProgramResult<i32> {
        if !self.require_create()? {
            return Ok(-1);
        }
        if let Some(pose) = self.robot_pose() {
            let mut create = self.runtime().create().lock();
            let angle = create.take_angle(&pose);
            create.sensors.angle = angle;
            create.sensors.total_angle += angle;
        }
        Ok(0)
    }

    /// Millimetres driven since the previous update
    pub fn create_distance(&self) -> ProgramResult<i32> {
        if !self.require_create()? {
            return Ok(-1);
        }
        if let Some(pose) = self.robot_pose() {
            let mut create = self.runtime().create().lock();
            create.sensors.distance = create.take_distance(&pose);
        }
        Ok(0)
    }

    /// Requested velocities are always current
    pub fn create_velocity(&self) -> ProgramResult<i32> {
        self.update_sensors(|_| {})
    }

    pub fn create_battery_charge(&self) -> ProgramResult<i32> {
        self.update_sensors(|s| {
            s.charge_state = 0;
            s.batt_voltage = CREATE_BATTERY_VOLTAGE;
            s.current_flow = 0;
            s.batt_temp = CREATE_BATTERY_TEMP;
            s.batt_charge = CREATE_BATTERY_CHARGE;
            s.batt_capacity = CREATE_BATTERY_CHARGE;
        })
    }

    pub fn create_buttons(&self) -> ProgramResult<i32> {
        self.update_sensors(|s| {
            s.advance_button = 0;
            s.play_button = 0;
        })
    }

    /// No virtual walls or home base on the board
    pub fn create_wall(&self) -> ProgramResult<i32> {
        self.update_sensors(|s| {
            s.wall = 0;
            s.wall_amt = 0;
            s.wall_hb = 0;
        })
    }

    pub fn create_read_ir(&self) -> ProgramResult<i32> {
        self.update_sensors(|s| s.ir = -1)
    }

    pub fn create_cargo_bay_inputs(&self) -> ProgramResult<i32> {
        self.update_sensors(|s| {
            s.digital_in = 0;
            s.analog_in = 0;
        })
    }

    // Driving

    fn drive_wheels(&self, left: i32, right: i32) {
        self.runtime().create().lock().wheels = (left, right);
        self.runtime().set_wheel_speeds(left, right);
    }

    pub fn create_stop(&self) -> ProgramResult {
        if self.require_create()? {
            self.create_drive(0, 1)?;
        }
        Ok(())
    }

    /// Arc at `velocity` mm/s around a centre `radius` mm to the left
    /// (negative: right). 32767 drives straight, 1 and -1 spin in place.
    pub fn create_drive(&self, velocity: i32, radius: i32) -> ProgramResult {
        if !self.require_create()? {
            return Ok(());
        }
        let velocity = velocity.clamp(-CREATE_MAX_SPEED, CREATE_MAX_SPEED);
        let (left, right) = arc_drive(velocity, radius, self.runtime().axle_radius());
        {
            let mut create = self.runtime().create().lock();
            create.sensors.vel = velocity;
            create.sensors.radius = radius;
            create.sensors.lvel = 0;
            create.sensors.rvel = 0;
        }
        self.drive_wheels(left, right);
        Ok(())
    }

    pub fn create_drive_direct(&self, left: i32, right: i32) -> ProgramResult {
        if !self.require_create()? {
            return Ok(());
        }
        let left = left.clamp(-CREATE_MAX_SPEED, CREATE_MAX_SPEED);
        let right = right.clamp(-CREATE_MAX_SPEED, CREATE_MAX_SPEED);
        {
            let mut create = self.runtime().create().lock();
            create.sensors.vel = 0;
            create.sensors.radius = 0;
            create.sensors.lvel = left;
            create.sensors.rvel = right;
        }
        self.drive_wheels(left, right);
        Ok(())
    }

    pub fn create_drive_straight(&self, velocity: i32) -> ProgramResult {
        if self.require_create()? {
            self.create_drive(velocity, ARC_STRAIGHT_MAX)?;
        }
        Ok(())
    }

    pub fn create_spin_cw(&self, velocity: i32) -> ProgramResult {
        if self.require_create()? {
            self.create_drive(velocity, -1)?;
        }
        Ok(())
    }

    pub fn create_spin_ccw(&self, velocity: i32) -> ProgramResult {
        if self.require_create()? {
            self.create_drive(velocity, 1)?;
        }
        Ok(())
    }

    /// Spins until roughly `degrees` have been turned, then stops.
    /// Positive is counter-clockwise.
    pub fn create_spin_block(&self, velocity: i32, degrees: i32) -> ProgramResult {
        if !self.require_create()? || velocity == 0 || degrees == 0 {
            return Ok(());
        }
        if degrees > 0 {
            self.create_spin_ccw(velocity)?;
        } else {
            self.create_spin_cw(velocity)?;
        }
        self.create_angle()?;
        let target = self.create_state().sensors.total_angle + degrees;
        loop {
            let turned = self.create_state().sensors.total_angle;
            if (degrees > 0 && turned >= target) || (degrees < 0 && turned <= target) {
                break;
            }
            self.msleep(SPIN_POLL_MS)?;
            self.create_angle()?;
        }
        self.create_stop()
    }

    // LEDs

    pub fn create_advance_led(&self, on: i32) -> ProgramResult {
        if self.require_create()? {
            self.runtime().create().lock().leds[LED_ADVANCE] = on;
        }
        Ok(())
    }

    pub fn create_play_led(&self, on: i32) -> ProgramResult {
        if self.require_create()? {
            self.runtime().create().lock().leds[LED_PLAY] = on;
        }
        Ok(())
    }

    pub fn create_power_led(&self, color: i32, brightness: i32) -> ProgramResult {
        if self.require_create()? {
            self.runtime().create().lock().leds[LED_POWER] = color + 65536 * brightness;
        }
        Ok(())
    }

    /// Songs are not simulated
    pub fn create_play_song(&self, _song: i32) -> ProgramResult {
        if self.require_create()? {
            self.runtime().panel().print("Simulator doesn't support create music\n");
        }
        Ok(())
    }
}
