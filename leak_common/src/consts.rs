//! Machine constants and configuration defaults.
//!
//! Values describe the reference station: ADS1115 pressure channel,
//! stepper-driven actuator with limit switches, M100 drive.

/// Default service identifier.
pub const DEFAULT_SERVICE_NAME: &str = "leak-station";

// ─── ADC / pressure sensor ──────────────────────────────────────────

/// Positive full-scale count of the 16-bit ADC.
pub const ADC_FULL_SCALE_COUNTS: f64 = 32767.0;

/// Voltage at positive full scale (PGA gain 2/3).
pub const ADC_FULL_SCALE_VOLTS: f64 = 6.144;

/// Sensor transfer slope in bar per volt.
pub const PRESSURE_MULTIPLIER: f64 = 1.286;

/// Sensor zero offset plus installation adjustment, in bar.
pub const PRESSURE_OFFSET_BAR: f64 = -0.579 - 0.2;

// ─── Drive ──────────────────────────────────────────────────────────

/// Lowest non-zero frequency accepted by the drive.
pub const DRIVE_MIN_HZ: f64 = 0.5;

/// Highest frequency accepted by the drive.
pub const DRIVE_MAX_HZ: f64 = 60.0;

// ─── Actuator ───────────────────────────────────────────────────────

/// Stepper resolution.
pub const STEPS_PER_MM: f64 = 380.95;

/// Position reported when the home limit switch is active.
pub const HOME_POSITION_MM: f64 = 40.0;

/// Position of the far limit switch.
pub const MAX_TRAVEL_MM: f64 = 205.0;

/// Upper bound on step pulse rate.
pub const MAX_PULSE_HZ: f64 = 4000.0;

// ─── Timing ─────────────────────────────────────────────────────────

/// Safety monitor cadence (10 Hz).
pub const MONITOR_CADENCE_MS: u64 = 100;

/// Default digital input debounce window.
pub const DEFAULT_DEBOUNCE_MS: u16 = 15;

/// Homing timeout.
pub const HOME_TIMEOUT_S: f64 = 120.0;

/// Positioning timeout.
pub const MOVE_TIMEOUT_S: f64 = 60.0;

/// Time allowed for pressure to reach target.
pub const PRESSURE_RAMP_TIMEOUT_S: f64 = 30.0;

/// Time allowed for venting.
pub const VENT_TIMEOUT_S: f64 = 30.0;

/// Hardware watchdog: maximum age of the last successful read.
pub const WATCHDOG_TIMEOUT_S: f64 = 10.0;

/// Minimum delay between an emergency and an accepted reset.
pub const EMERGENCY_COOLDOWN_S: f64 = 5.0;

// ─── Safety thresholds ──────────────────────────────────────────────

/// Pressure above which an emergency stop is forced.
pub const EMERGENCY_PRESSURE_BAR: f64 = 4.8;

/// Pressure above which a warning is raised.
pub const WARNING_PRESSURE_BAR: f64 = 4.6;
