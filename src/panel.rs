//! Operator-facing controller panel: input sliders and buttons on one side,
//! motor/servo indicators and the LCD on the other.

use crate::config::{
    ACCEL_REST, NUM_MOTOR_PORTS, NUM_PANEL_ANALOGS, NUM_SENSOR_SLOTS, FIRST_DIGITAL_PORT,
    SENSOR_MAX,
};
use parking_lot::Mutex;

/// Where a port's reading comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// The operator's slider or button
    #[default]
    Set,
    /// The slider value with a little noise
    Random,
    /// The sensor installed on the port
    Real,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalogInput {
    pub value: i32,
    pub mode: InputMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DigitalInput {
    pub pressed: bool,
    pub mode: InputMode,
}

/// Interface between the simulation core and whatever displays it.
/// Setters are display-only; the core never reads them back.
pub trait ControlPanel: Send + Sync {
    /// Analog ports 0-7 and accelerometer axes 8-10
    fn analog_input(&self, port: usize) -> AnalogInput;
    /// Digital ports 8-15
    fn digital_input(&self, port: usize) -> DigitalInput;
    fn button_mask(&self) -> u16;
    fn black_button(&self) -> bool;

    fn set_motor_power(&self, port: usize, power: i32);
    fn set_motor_position(&self, port: usize, position: i64);
    fn set_motor_destination(&self, port: usize, destination: i64);
    fn set_motor_shaft_angle(&self, port: usize, degrees: i32);

    fn set_servo_position(&self, port: usize, position: i32);
    fn set_servo_destination(&self, port: usize, destination: i32);
    fn set_servo_shaft_angle(&self, port: usize, degrees: i32);
    fn set_servo_enabled(&self, port: usize, enabled: bool);

    fn set_beeper(&self, on: bool);
    fn print(&self, text: &str);
    fn clear_display(&self);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotorView {
    pub power: i32,
    pub position: i64,
    pub destination: i64,
    pub shaft_angle: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServoView {
    pub position: i32,
    pub destination: i32,
    pub shaft_angle: i32,
    pub enabled: bool,
}

#[derive(Debug)]
struct PanelState {
    analogs: [AnalogInput; NUM_PANEL_ANALOGS],
    digitals: [DigitalInput; NUM_SENSOR_SLOTS - FIRST_DIGITAL_PORT],
    buttons: u16,
    black: bool,
    motors: [MotorView; NUM_MOTOR_PORTS],
    servos: [ServoView; NUM_MOTOR_PORTS],
    beeper: bool,
    lcd: String,
}

/// Panel with no window behind it. Inputs are set programmatically and
/// outputs are kept for inspection.
#[derive(Debug)]
pub struct HeadlessPanel {
    state: Mutex<PanelState>,
}

impl HeadlessPanel {
    pub fn new() -> Self {
        let mut analogs = [AnalogInput {
            value: SENSOR_MAX,
            mode: InputMode::Set,
        }; NUM_PANEL_ANALOGS];
        for (axis, rest) in ACCEL_REST.iter().enumerate() {
            analogs[8 + axis] = AnalogInput {
                value: *rest,
                mode: InputMode::Random,
            };
        }
        HeadlessPanel {
            state: Mutex::new(PanelState {
                analogs,
                digitals: [DigitalInput::default(); NUM_SENSOR_SLOTS - FIRST_DIGITAL_PORT],
                buttons: 0,
                black: false,
                motors: [MotorView::default(); NUM_MOTOR_PORTS],
                servos: [ServoView::default(); NUM_MOTOR_PORTS],
                beeper: false,
                lcd: String::new(),
            }),
        }
    }

    /// Slider values are clamped to the sensor range
    pub fn set_analog(&self, port: usize, value: i32, mode: InputMode) {
        if let Some(input) = self.state.lock().analogs.get_mut(port) {
            *input = AnalogInput {
                value: value.clamp(0, SENSOR_MAX),
                mode,
            };
        }
    }

    pub fn set_digital(&self, port: usize, pressed: bool, mode: InputMode) {
        let mut state = self.state.lock();
        if let Some(input) = port
            .checked_sub(FIRST_DIGITAL_PORT)
            .and_then(|i| state.digitals.get_mut(i))
        {
            *input = DigitalInput { pressed, mode };
        }
    }

    pub fn set_buttons(&self, mask: u16) {
        self.state.lock().buttons = mask;
    }

    pub fn set_black_button(&self, pressed: bool) {
        self.state.lock().black = pressed;
    }

    pub fn lcd_text(&self) -> String {
        self.state.lock().lcd.clone()
    }

    pub fn motor_view(&self, port: usize) -> Option<MotorView> {
        self.state.lock().motors.get(port).copied()
    }

    pub fn servo_view(&self, port: usize) -> Option<ServoView> {
        self.state.lock().servos.get(port).copied()
    }

    pub fn beeper(&self) -> bool {
        self.state.lock().beeper
    }

    fn with_motor(&self, port: usize, f: impl FnOnce(&mut MotorView)) {
        if let Some(view) = self.state.lock().motors.get_mut(port) {
            f(view);
        }
    }

    fn with_servo(&self, port: usize, f: impl FnOnce(&mut ServoView)) {
        if let Some(view) = self.state.lock().servos.get_mut(port) {
            f(view);
        }
    }
}

impl Default for HeadlessPanel {
    fn default() -> Self {
        HeadlessPanel::new()
    }
}

impl ControlPanel for HeadlessPanel {
    fn analog_input(&self, port: usize) -> AnalogInput {
        self.state
            .lock()
            .analogs
            .get(port)
            .copied()
            .unwrap_or(AnalogInput {
                value: SENSOR_MAX,
                mode: InputMode::Set,
            })
    }

    fn digital_input(&self, port: usize) -> DigitalInput {
        port.checked_sub(FIRST_DIGITAL_PORT)
            .and_then(|i| self.state.lock().digitals.get(i).copied())
            .unwrap_or_default()
    }

    fn button_mask(&self) -> u16 {
        self.state.lock().buttons
    }

    fn black_button(&self) -> bool {
        self.state.lock().black
    }

    fn set_motor_power(&self, port: usize, power: i32) {
        self.with_motor(port, |m| m.power = power);
    }

    fn set_motor_position(&self, port: usize, position: i64) {
        self.with_motor(port, |m| m.position = position);
    }

    fn set_motor_destination(&self, port: usize, destination: i64) {
        self.with_motor(port, |m| m.destination = destination);
    }

    fn set_motor_shaft_angle(&self, port: usize, degrees: i32) {
        self.with_motor(port, |m| m.shaft_angle = degrees);
    }

    fn set_servo_position(&self, port: usize, position: i32) {
        self.with_servo(port, |s| s.position = position);
    }

    fn set_servo_destination(&self, port: usize, destination: i32) {
        self.with_servo(port, |s| s.destination = destination);
    }

    fn set_servo_shaft_angle(&self, port: usize, degrees: i32) {
        self.with_servo(port, |s| s.shaft_angle = degrees);
    }

    fn set_servo_enabled(&self, port: usize, enabled: bool) {
        self.with_servo(port, |s| s.enabled = enabled);
    }

    fn set_beeper(&self, on: bool) {
        self.state.lock().beeper = on;
    }

    fn print(&self, text: &str) {
        log::info!(target: "lcd", "{}", text.trim_end());
        self.state.lock().lcd.push_str(text);
    }

    fn clear_display(&self) {
        self.state.lock().lcd.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_inputs() {
        let panel = HeadlessPanel::new();
        assert_eq!(panel.analog_input(0).value, 1023);
        assert_eq!(panel.analog_input(0).mode, InputMode::Set);
        assert_eq!(panel.analog_input(10).value, 640);
        assert_eq!(panel.analog_input(9).mode, InputMode::Random);
        assert!(!panel.digital_input(8).pressed);
        assert!(!panel.digital_input(3).pressed);
    }

    #[test]
    fn test_inputs_are_clamped_and_ranged() {
        let panel = HeadlessPanel::new();
        panel.set_analog(2, 5000, InputMode::Set);
        assert_eq!(panel.analog_input(2).value, 1023);
        panel.set_analog(2, -3, InputMode::Real);
        assert_eq!(panel.analog_input(2), AnalogInput { value: 0, mode: InputMode::Real });
        panel.set_analog(99, 10, InputMode::Set);

        panel.set_digital(15, true, InputMode::Set);
        assert!(panel.digital_input(15).pressed);
        panel.set_digital(16, true, InputMode::Set);
        assert!(!panel.digital_input(16).pressed);
    }

    #[test]
    fn test_lcd_accumulates_until_cleared() {
        let panel = HeadlessPanel::new();
        panel.print("hello ");
        panel.print("world\n");
        assert_eq!(panel.lcd_text(), "hello world\n");
        panel.clear_display();
        assert_eq!(panel.lcd_text(), "");
    }

    #[test]
    fn test_output_views() {
        let panel = HeadlessPanel::new();
        panel.set_motor_power(1, -40);
        panel.set_servo_enabled(3, true);
        panel.set_motor_power(7, 10);
        assert_eq!(panel.motor_view(1).unwrap().power, -40);
        assert!(panel.servo_view(3).unwrap().enabled);
        assert!(panel.motor_view(7).is_none());
    }
}
