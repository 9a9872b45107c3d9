use crate::error::{AttendError, AttendResult};

pub const DEFAULT_THRESHOLD: u32 = 75;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shortfall {
    /// No classes recorded yet; nothing to compute.
    NoData,
    Evaluated(Evaluation),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub percent: f64,
    pub meets_threshold: bool,
    /// Consecutive fully attended classes still required; `None` once the threshold is met.
    pub classes_needed: Option<u64>,
}

impl Evaluation {
    /// Colour band for the attendance gauge.
    pub fn gauge(&self) -> &'static str {
        if self.meets_threshold {
            "green"
        } else {
            "red"
        }
    }
}

pub fn validate_threshold(threshold: u32) -> AttendResult<()> {
    if threshold == 0 || threshold >= 100 {
        return Err(AttendError::InvalidConfiguration(format!(
            "threshold must be between 1 and 99, got {}",
            threshold
        )));
    }
    Ok(())
}

pub fn evaluate(total: u32, attended: u32, threshold: u32) -> AttendResult<Shortfall> {
    validate_threshold(threshold)?;
    if total == 0 {
        return Ok(Shortfall::NoData);
    }

    let percent = 100.0 * f64::from(attended) / f64::from(total);
    let required = u64::from(threshold) * u64::from(total);
    let have = 100 * u64::from(attended);
    let meets_threshold = have >= required;

    // floor((t*T - 100*A) / (100 - t)) + 1; the +1 lands strictly above the line.
    let classes_needed = if meets_threshold {
        None
    } else {
        Some((required - have) / u64::from(100 - threshold) + 1)
    };

    Ok(Shortfall::Evaluated(Evaluation {
        percent,
        meets_threshold,
        classes_needed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluated(total: u32, attended: u32) -> Evaluation {
        match evaluate(total, attended, DEFAULT_THRESHOLD).expect("evaluate") {
            Shortfall::Evaluated(e) => e,
            Shortfall::NoData => panic!("expected evaluation"),
        }
    }

    #[test]
    fn half_attendance_needs_twenty_one() {
        let e = evaluated(20, 10);
        assert_eq!(e.percent, 50.0);
        assert!(!e.meets_threshold);
        assert_eq!(e.classes_needed, Some(21));
        assert_eq!(e.gauge(), "red");
    }

    #[test]
    fn exactly_on_threshold_is_met() {
        let e = evaluated(4, 3);
        assert_eq!(e.percent, 75.0);
        assert!(e.meets_threshold);
        assert_eq!(e.classes_needed, None);
        assert_eq!(e.gauge(), "green");
    }

    #[test]
    fn no_classes_is_no_data() {
        assert_eq!(evaluate(0, 0, DEFAULT_THRESHOLD).unwrap(), Shortfall::NoData);
    }

    #[test]
    fn attending_the_suggested_classes_reaches_threshold() {
        for (total, attended) in [(20u32, 10u32), (7, 0), (13, 9), (100, 74), (1, 0)] {
            let needed = evaluated(total, attended)
                .classes_needed
                .expect("below threshold") as u32;
            assert!(evaluated(total + needed, attended + needed).meets_threshold);
        }
    }

    #[test]
    fn threshold_bounds_are_configuration_errors() {
        for t in [0, 100, 150] {
            assert!(matches!(
                evaluate(10, 5, t),
                Err(AttendError::InvalidConfiguration(_))
            ));
        }
        assert!(evaluate(10, 5, 99).is_ok());
    }

    #[test]
    fn custom_threshold_changes_outcome() {
        match evaluate(10, 6, 50).unwrap() {
            Shortfall::Evaluated(e) => {
                assert!(e.meets_threshold);
                assert_eq!(e.classes_needed, None);
            }
            Shortfall::NoData => panic!("expected evaluation"),
        }
        match evaluate(10, 6, 80).unwrap() {
            Shortfall::Evaluated(e) => {
                // (800 - 600) / 20 + 1
                assert_eq!(e.classes_needed, Some(11));
            }
            Shortfall::NoData => panic!("expected evaluation"),
        }
    }
}
