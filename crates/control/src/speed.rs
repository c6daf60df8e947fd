use contracts::SpeedTiers;

/// Speed tier for a steering angle: the sharper the turn, the slower.
pub fn speed_for_steer(tiers: &SpeedTiers, steer_deg: f64) -> f64 {
    let s = steer_deg.abs();
    if s > tiers.sharp_deg {
        tiers.sharp_speed
    } else if s > tiers.moderate_deg {
        tiers.moderate_speed
    } else {
        tiers.straight_speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tiers() {
        let t = SpeedTiers::default();
        assert_eq!(speed_for_steer(&t, 0.0), 255.0);
        assert_eq!(speed_for_steer(&t, 15.0), 255.0);
        assert_eq!(speed_for_steer(&t, -20.0), 250.0);
        assert_eq!(speed_for_steer(&t, 30.0), 250.0);
        assert_eq!(speed_for_steer(&t, 44.0), 150.0);
    }

    #[test]
    fn test_monotonic_non_increasing() {
        let t = SpeedTiers::default();
        let mut last = f64::INFINITY;
        for i in 0..=450 {
            let v = speed_for_steer(&t, i as f64 / 10.0);
            assert!(v <= last);
            last = v;
        }
    }
}
