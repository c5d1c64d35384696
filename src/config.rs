//! Configuration constants for the controller simulator.

// Simulation driver
pub const MOVE_INTERVAL_MS: u64 = 10; // Robot pose is integrated at most this often
pub const STATUS_INTERVAL_MS: u64 = 33; // Program liveness checks
pub const DRIVER_SLEEP_MS: u64 = 2;
pub const DEFAULT_RUN_SECONDS: f64 = 30.0;

// Geometry
pub const FPE_D: f64 = 1e-11; // Epsilon for Location equality and ordering
pub const PIXELS_TO_MM: f64 = 330.0 / 64.0; // Board grid is drawn at 64 px per 330 mm
pub const PIPE_WIDTH_MM: f64 = 5.0 * PIXELS_TO_MM; // Collision width of PVC pipe and junctions
pub const ELLIPSE_SEGMENTS: usize = 64; // Polygon vertices used for ellipse primitives
pub const FULL_EXTENT_MM: f64 = 1.0e6; // Half-size of the "full" primitive
pub const OVERLAP_EPSILON: f64 = 1e-9; // Intersection area (mm^2) below which shapes only touch

// Create drive
pub const ARC_STRAIGHT_MAX: i32 = 32767;
pub const ARC_STRAIGHT_MIN: i32 = -32768;
pub const CREATE_MAX_SPEED: i32 = 500; // mm/s
pub const CREATE_BATTERY_VOLTAGE: i32 = 16500; // mV
pub const CREATE_BATTERY_CHARGE: i32 = 2075; // mAh, reported as both charge and capacity
pub const CREATE_BATTERY_TEMP: i32 = 20; // degrees C

// Motor and servo control loop
pub const NUM_MOTOR_PORTS: usize = 4;
pub const PID_LOOP_PERIOD_MS: u64 = 6;
pub const MOTOR_MS_PER_TICK: f64 = 78.0; // power * elapsed_ms / this = encoder ticks
pub const MOTOR_ARRIVAL_JITTER: i64 = 4; // Counter lands within +/- this of its destination
pub const MOTOR_TICKS_PER_REV: i64 = 1300; // Used for the displayed shaft angle
pub const MOTOR_MAX_POWER: i32 = 100;
pub const MOTOR_MAX_SPEED: i32 = 1000;
pub const FROZEN_DISPLAY_POWER: i32 = 500; // Power shown on the panel while a motor is braking
pub const DRIVE_MOTOR_SCALE: f64 = 9.0; // Motor power to robot wheel speed
pub const SERVO_CENTER: i32 = 1023;
pub const SERVO_MAX: i32 = 2047;
pub const SERVO_SLEW_STEP: i32 = 10; // Counts per control loop iteration
pub const XBC_SERVO_SCALE: i32 = 8;

// User thread timing
pub const CHECKPOINT_POLL_MS: u64 = 1; // Sleep between pause checks
pub const MSLEEP_DIRECT_MS: i64 = 10; // Shorter sleeps skip the polling loop
pub const MSLEEP_SETTLE_POLLS: u32 = 6;
pub const MOTOR_DONE_POLL_MS: i64 = 3;
pub const RUN_FOR_POLL_MS: i64 = 100;

// Sensors
pub const NUM_SENSOR_SLOTS: usize = 16; // 0-7 analog, 8-15 digital
pub const NUM_ANALOG_PORTS: usize = 8;
pub const NUM_PANEL_ANALOGS: usize = 11; // Analog ports plus three accelerometer axes
pub const FIRST_DIGITAL_PORT: usize = 8;
pub const NUM_CREATE_SENSORS: usize = 6; // Two bumpers, four cliff sensors
pub const SENSOR_MAX: i32 = 1023;
pub const DIGITAL_THRESHOLD: i32 = 512; // Values below read as digital "on"
pub const DIGITAL_ON_VALUE: i32 = 1;
pub const DIGITAL_OFF_VALUE: i32 = 1022;
pub const LIGHT_ON_RANGE: (i32, i32) = (5, 100);
pub const LIGHT_OFF_RANGE: (i32, i32) = (920, 1015);
pub const DEFAULT_SENSOR_RANGE: (i32, i32) = (1020, 1023);
pub const COLOR_SENSOR_VALUE: i32 = 200;
pub const DISTANCE_SENSOR_VALUE: i32 = 0;
pub const RANDOM_MODE_SPREAD: i32 = 8; // Noise added to panel values in Random mode
pub const ACCEL_REST: [i32; 3] = [512, 512, 640]; // Panel defaults for the accelerometer axes
pub const SONAR_NO_READING: i32 = -32767;

// Controller
pub const POWER_LEVEL: f64 = 9.0; // Battery voltage reported to user code
