//! Easing curves
//!
//! Every curve is monotonic on `[0, 1]` with `apply(0) == 0` and
//! `apply(1) == 1`; inputs outside the range are clamped.

/// Timing function for scroll animations
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Easing {
    Linear,
    /// Quadratic ease-in-out
    #[default]
    EaseInOutQuad,
    /// Cubic ease-in-out
    EaseInOutCubic,
    /// Cubic ease-out
    EaseOutCubic,
}

impl Easing {
    /// Map normalized progress `t` to eased progress
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 4] = [
        Easing::Linear,
        Easing::EaseInOutQuad,
        Easing::EaseInOutCubic,
        Easing::EaseOutCubic,
    ];

    #[test]
    fn test_endpoints() {
        for easing in ALL {
            assert_eq!(easing.apply(0.0), 0.0, "{easing:?}");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-6, "{easing:?}");
        }
    }

    #[test]
    fn test_monotonic() {
        for easing in ALL {
            let mut previous = easing.apply(0.0);
            for i in 1..=200 {
                let value = easing.apply(i as f32 / 200.0);
                assert!(value >= previous, "{easing:?} not monotonic at step {i}");
                previous = value;
            }
        }
    }

    #[test]
    fn test_clamps_input() {
        assert_eq!(Easing::EaseInOutQuad.apply(-1.0), 0.0);
        assert_eq!(Easing::EaseInOutQuad.apply(3.0), 1.0);
    }

    #[test]
    fn test_ease_in_out_is_symmetric_at_midpoint() {
        assert!((Easing::EaseInOutQuad.apply(0.5) - 0.5).abs() < 1e-6);
        assert!((Easing::EaseInOutCubic.apply(0.5) - 0.5).abs() < 1e-6);
    }
}
