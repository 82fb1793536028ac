//! PID controller for the player's banking roll
//!
//! Gains are tuned to the fixed tick: the derivative uses a constant time
//! step rather than measured frame time.

/// Errors at or below this magnitude do not accumulate into the integral
pub const DEADBAND: f32 = 0.01;
/// Nominal time step used for the integral and derivative terms
pub const DT: f32 = 0.06;
/// Output saturation bound (applied to both signs)
pub const OUTPUT_LIMIT: f32 = 4.0;
/// Proportional gain
pub const KP: f32 = 0.1;
/// Derivative gain
pub const KD: f32 = 0.01;
/// Integral gain
pub const KI: f32 = 0.005;

/// Controller memory carried between ticks
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidState {
    /// Error from the previous step
    pub pre_error: f32,
    /// Accumulated error
    pub integral: f32,
}

/// One controller step towards `setpoint` from `actual`; output is clamped to
/// `[-OUTPUT_LIMIT, OUTPUT_LIMIT]`.
pub fn step(setpoint: f32, actual: f32, state: &mut PidState) -> f32 {
    let error = setpoint - actual;

    if error.abs() > DEADBAND {
        state.integral += error * DT;
    }
    let derivative = (error - state.pre_error) / DT;
    let output = KP * error + KI * state.integral + KD * derivative;

    state.pre_error = error;
    output.clamp(-OUTPUT_LIMIT, OUTPUT_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_output_is_clamped() {
        let mut state = PidState::default();
        assert_relative_eq!(step(1.0e6, 0.0, &mut state), OUTPUT_LIMIT);

        let mut state = PidState::default();
        assert_relative_eq!(step(-1.0e6, 0.0, &mut state), -OUTPUT_LIMIT);

        let mut state = PidState {
            pre_error: 0.0,
            integral: 1.0e9,
        };
        assert_relative_eq!(step(0.0, 0.0, &mut state), OUTPUT_LIMIT);
    }

    #[test]
    fn test_integral_holds_inside_deadband() {
        let mut state = PidState {
            pre_error: 0.0,
            integral: 0.3,
        };
        for actual in [0.195, 0.2, 0.205, 0.21] {
            step(0.2, actual, &mut state);
            assert_relative_eq!(state.integral, 0.3);
        }
    }

    #[test]
    fn test_first_step_terms() {
        let mut state = PidState::default();
        let output = step(0.2, 0.0, &mut state);
        // P = 0.02, I = 0.005 * 0.012, D = 0.01 * 0.2 / 0.06
        let expected = 0.1 * 0.2 + 0.005 * (0.2 * 0.06) + 0.01 * (0.2 / 0.06);
        assert_relative_eq!(output, expected, epsilon = 1e-6);
        assert_relative_eq!(state.pre_error, 0.2);
        assert_relative_eq!(state.integral, 0.012, epsilon = 1e-7);
    }

    #[test]
    fn test_roll_settles_on_target() {
        let mut state = PidState::default();
        let mut roll = 0.0;
        for _ in 0..400 {
            roll += step(0.2, roll, &mut state) / 2.0;
        }
        assert_relative_eq!(roll, 0.2, epsilon = 0.02);
    }
}
