// THEORY:
// The `SeverityClassifier` turns one number (the diff percentage) into one decision.
//
// With classification enabled, everything at or below the pass threshold passes and
// everything at or above the fail threshold fails. The space in between is split into
// three equal-ish bands by the position of the percentage between the two thresholds
// (the "severity ratio"):
//
//     ratio <  0.33          MinorDeviation
//     0.33 <= ratio < 0.67   ModerateDeviation
//     0.67 <= ratio          Critical
//
// A ratio of exactly 0.33 is Moderate and exactly 0.67 is Critical. The quotient is
// compared with a small slack so that ratios such as 3.3 / 10, which land a hair
// below 0.33 in binary, still fall on the upper side of the boundary. When the two
// thresholds coincide there is no band to divide; anything above the threshold fails.

use crate::config::ComparisonConfig;
use serde::{Deserialize, Serialize};

pub const MINOR_BAND_END: f64 = 0.33;
pub const MODERATE_BAND_END: f64 = 0.67;

/// Slack for band boundaries. Far below the spacing of two-decimal percentages.
const BAND_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    MinorDeviation,
    ModerateDeviation,
    Critical,
    Fail,
    /// Threshold classification is switched off.
    Unclassified,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::MinorDeviation => "MINOR",
            Verdict::ModerateDeviation => "MODERATE",
            Verdict::Critical => "CRITICAL",
            Verdict::Fail => "FAIL",
            Verdict::Unclassified => "UNCLASSIFIED",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Verdict::Fail)
    }

    /// A one-line, human readable explanation of the verdict, given the thresholds it
    /// was decided with.
    pub fn message(&self, diff_percent: f64, pass: f64, fail: f64) -> String {
        match self {
            Verdict::Pass => format!("PASS: {diff_percent}% is within your {pass}% limit."),
            Verdict::MinorDeviation => {
                format!("MINOR: {diff_percent}% is slightly above {pass}%. Small tweaks detected.")
            }
            Verdict::ModerateDeviation => {
                format!("MODERATE: {diff_percent}% is midway to {fail}%. Noticeable changes.")
            }
            Verdict::Critical => {
                format!("CRITICAL: {diff_percent}% is close to {fail}%. Urgent review needed.")
            }
            Verdict::Fail => {
                format!("FAIL: {diff_percent}% reaches your {fail}% limit. Major issues detected.")
            }
            Verdict::Unclassified => {
                "Thresholds are off: enable them to get a pass/fail verdict.".to_string()
            }
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Where `diff_percent` sits between the pass and fail thresholds, or `None` when it
/// is outside the open interval between them.
pub fn severity_ratio(diff_percent: f64, pass_threshold: f64, fail_threshold: f64) -> Option<f64> {
    if diff_percent <= pass_threshold || diff_percent >= fail_threshold {
        return None;
    }
    Some((diff_percent - pass_threshold) / (fail_threshold - pass_threshold))
}

pub fn classify(diff_percent: f64, config: &ComparisonConfig) -> Verdict {
    if !config.use_thresholds {
        return Verdict::Unclassified;
    }
    let pass = config.pass_threshold;
    let fail = config.fail_threshold;

    if pass == fail {
        return if diff_percent > pass {
            Verdict::Fail
        } else {
            Verdict::Pass
        };
    }
    if diff_percent <= pass {
        return Verdict::Pass;
    }
    if diff_percent >= fail {
        return Verdict::Fail;
    }

    match severity_ratio(diff_percent, pass, fail).map(|ratio| ratio + BAND_EPSILON) {
        Some(ratio) if ratio < MINOR_BAND_END => Verdict::MinorDeviation,
        Some(ratio) if ratio < MODERATE_BAND_END => Verdict::ModerateDeviation,
        Some(_) => Verdict::Critical,
        // Unreachable: both ends were handled above.
        None => Verdict::Fail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds(pass: f64, fail: f64) -> ComparisonConfig {
        ComparisonConfig::with_thresholds(pass, fail).unwrap()
    }

    #[test]
    fn disabled_thresholds_are_unclassified() {
        let config = ComparisonConfig::default();
        assert_eq!(classify(0.0, &config), Verdict::Unclassified);
        assert_eq!(classify(99.0, &config), Verdict::Unclassified);
    }

    #[test]
    fn pass_threshold_is_inclusive() {
        assert_eq!(classify(10.0, &thresholds(10.0, 70.0)), Verdict::Pass);
        assert_eq!(classify(0.0, &thresholds(10.0, 70.0)), Verdict::Pass);
    }

    #[test]
    fn fail_threshold_is_inclusive() {
        assert_eq!(classify(70.0, &thresholds(10.0, 70.0)), Verdict::Fail);
        assert_eq!(classify(100.0, &thresholds(10.0, 70.0)), Verdict::Fail);
    }

    #[test]
    fn thirty_percent_is_moderate() {
        // (30 - 10) / (70 - 10) = 0.333..
        assert_eq!(
            classify(30.0, &thresholds(10.0, 70.0)),
            Verdict::ModerateDeviation
        );
    }

    #[test]
    fn ratio_of_exactly_033_is_moderate() {
        let config = thresholds(0.0, 100.0);
        assert_eq!(severity_ratio(33.0, 0.0, 100.0), Some(0.33));
        assert_eq!(classify(33.0, &config), Verdict::ModerateDeviation);
        assert_eq!(classify(32.99, &config), Verdict::MinorDeviation);
    }

    #[test]
    fn ratio_of_exactly_067_is_critical() {
        let config = thresholds(0.0, 100.0);
        assert_eq!(classify(67.0, &config), Verdict::Critical);
        assert_eq!(classify(66.99, &config), Verdict::ModerateDeviation);
    }

    #[test]
    fn boundaries_hold_when_the_quotient_is_inexact() {
        // 3.3 / 10 evaluates to 0.32999999999999996
        assert_eq!(
            classify(3.3, &thresholds(0.0, 10.0)),
            Verdict::ModerateDeviation
        );
        assert_eq!(classify(3.29, &thresholds(0.0, 10.0)), Verdict::MinorDeviation);
        // 2.01 / 3 evaluates to 0.6699999999999999
        assert_eq!(classify(2.01, &thresholds(0.0, 3.0)), Verdict::Critical);
        assert_eq!(
            classify(2.0, &thresholds(0.0, 3.0)),
            Verdict::ModerateDeviation
        );
    }

    #[test]
    fn boundaries_hold_for_every_two_decimal_ratio() {
        for pass in 0..20u32 {
            for span in 1..40u32 {
                let pass = f64::from(pass);
                let fail = pass + f64::from(span);
                let config = thresholds(pass, fail);
                for (band_end, expected) in [
                    (33.0, Verdict::ModerateDeviation),
                    (67.0, Verdict::Critical),
                ] {
                    // pass + band_end% of an integer span always has two decimals.
                    let diff = ((pass + band_end * f64::from(span) / 100.0) * 100.0).round() / 100.0;
                    assert_eq!(classify(diff, &config), expected, "pass {pass} fail {fail} diff {diff}");
                }
            }
        }
    }

    #[test]
    fn bands_between_thresholds() {
        let config = thresholds(10.0, 70.0);
        assert_eq!(classify(10.01, &config), Verdict::MinorDeviation);
        assert_eq!(classify(50.0, &config), Verdict::ModerateDeviation);
        assert_eq!(classify(69.99, &config), Verdict::Critical);
    }

    #[test]
    fn equal_thresholds_never_divide_by_zero() {
        let config = thresholds(25.0, 25.0);
        assert_eq!(classify(25.0, &config), Verdict::Pass);
        assert_eq!(classify(24.0, &config), Verdict::Pass);
        assert_eq!(classify(25.01, &config), Verdict::Fail);
    }

    #[test]
    fn messages_carry_the_label() {
        for verdict in [
            Verdict::Pass,
            Verdict::MinorDeviation,
            Verdict::ModerateDeviation,
            Verdict::Critical,
            Verdict::Fail,
        ] {
            assert!(verdict.message(42.0, 10.0, 70.0).starts_with(verdict.label()));
        }
        assert!(Verdict::Fail.is_failure());
        assert!(!Verdict::Critical.is_failure());
    }
}
