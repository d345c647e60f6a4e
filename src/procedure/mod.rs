//! Procedure orchestrators: the set-point calibration sweep and the
//! scheduled draw test.

pub mod calibration;
pub mod draw;
pub mod schedule;

pub use calibration::setpoint_calibration;
pub use draw::{draw, run_draw_test, target_weight, DrawHardware};
pub use schedule::{parse_schedule, ScheduleEntry};
