//! Servo control stub
//!
//! Logs moves only; no GPIO is driven yet.

/// Head/arm servos on the robot
#[derive(Debug, Default, Clone, Copy)]
pub struct Servo;

impl Servo {
    /// Move `servo` to `angle` degrees
    pub fn move_to(self, servo: &str, angle: i32) {
        println!("Moving {servo} to {angle} degrees");
        tracing::debug!(servo, angle, "servo move");
    }
}
