//! Stateless risk rules
//!
//! Each rule is a pure function of the transaction (and, for the time rule,
//! the evaluation hour). Tiered rules are expressed as ordered tables scanned
//! top-down; the first tier whose predicate holds decides the score. Overlaps
//! between tiers are resolved purely by table order.

/// One row of an ordered rule table
#[derive(Debug, Clone, Copy)]
pub struct RuleTier<I: Copy> {
    /// Short name of the band, logged with each scored transaction
    pub label: &'static str,
    pub score: u32,
    pub applies: fn(I) -> bool,
}

/// First tier in `tiers` whose predicate holds for `input`
pub fn first_match<I: Copy>(tiers: &[RuleTier<I>], input: I) -> Option<&RuleTier<I>> {
    tiers.iter().find(|tier| (tier.applies)(input))
}

/// Label of the matching tier, `"none"` when no tier applies
pub fn band<I: Copy>(tiers: &[RuleTier<I>], input: I) -> &'static str {
    first_match(tiers, input)
        .map(|tier| tier.label)
        .unwrap_or("none")
}

fn score_of<I: Copy>(tiers: &[RuleTier<I>], input: I) -> u32 {
    first_match(tiers, input).map(|tier| tier.score).unwrap_or(0)
}

// ============================================================================
// Amount magnitude
// ============================================================================

pub const AMOUNT_TIERS: &[RuleTier<f64>] = &[
    RuleTier {
        label: "over_1m",
        score: 50,
        applies: |a| a > 1_000_000.0,
    },
    RuleTier {
        label: "over_500k",
        score: 40,
        applies: |a| a > 500_000.0,
    },
    RuleTier {
        label: "over_200k",
        score: 25,
        applies: |a| a > 200_000.0,
    },
    RuleTier {
        label: "over_100k",
        score: 15,
        applies: |a| a > 100_000.0,
    },
];

/// Risk from the absolute transaction amount: 0, 15, 25, 40 or 50
pub fn amount_risk(amount: f64) -> u32 {
    score_of(AMOUNT_TIERS, amount)
}

// ============================================================================
// Round-amount pattern
// ============================================================================

/// Evaluated on the integer part of the amount
pub const ROUND_AMOUNT_TIERS: &[RuleTier<i64>] = &[
    RuleTier {
        label: "multiple_of_100k",
        score: 20,
        applies: |a| a >= 100_000 && a % 100_000 == 0,
    },
    RuleTier {
        label: "multiple_of_50k",
        score: 15,
        applies: |a| a >= 50_000 && a % 50_000 == 0,
    },
    RuleTier {
        label: "multiple_of_10k",
        score: 10,
        applies: |a| a >= 10_000 && a % 10_000 == 0,
    },
];

/// Risk from suspiciously round amounts. Fractions are truncated first.
pub fn round_amount_risk(amount: f64) -> u32 {
    score_of(ROUND_AMOUNT_TIERS, amount.trunc() as i64)
}

// ============================================================================
// Time of day
// ============================================================================

/// Hour 2 falls in both of the first two bands; the earlier row wins.
pub const TIME_OF_DAY_TIERS: &[RuleTier<u32>] = &[
    RuleTier {
        label: "early_morning",
        score: 30,
        applies: |h| (2..=6).contains(&h),
    },
    RuleTier {
        label: "late_night",
        score: 20,
        applies: |h| h >= 23 || h <= 2,
    },
    RuleTier {
        label: "dawn",
        score: 10,
        applies: |h| (6..=7).contains(&h),
    },
];

/// Risk from the local hour (0-23) at which the transaction is evaluated
pub fn time_risk(hour: u32) -> u32 {
    score_of(TIME_OF_DAY_TIERS, hour)
}

// ============================================================================
// Transaction type
// ============================================================================

pub const TRANSACTION_TYPE_RISK: &[(&str, u32)] = &[
    ("WITHDRAWAL", 10),
    ("MPESA_WITHDRAWAL", 15),
    ("INTERNAL_TRANSFER", 5),
];

/// Exact, case-sensitive lookup; unknown and empty types score 0
pub fn type_risk(transaction_type: &str) -> u32 {
    TRANSACTION_TYPE_RISK
        .iter()
        .find(|(name, _)| *name == transaction_type)
        .map(|(_, score)| *score)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_risk_tiers() {
        assert_eq!(amount_risk(50_000.0), 0);
        assert_eq!(amount_risk(100_000.0), 0);
        assert_eq!(amount_risk(100_000.01), 15);
        assert_eq!(amount_risk(200_001.0), 25);
        assert_eq!(amount_risk(500_001.0), 40);
        assert_eq!(amount_risk(1_000_000.0), 40);
        assert_eq!(amount_risk(1_000_001.0), 50);
    }

    #[test]
    fn test_amount_risk_is_monotonic() {
        let mut previous = 0;
        let mut amount = 1.0;
        while amount < 3_000_000.0 {
            let risk = amount_risk(amount);
            assert!(risk >= previous, "risk dropped at {}", amount);
            assert!([0, 15, 25, 40, 50].contains(&risk));
            previous = risk;
            amount += 7_919.0;
        }
    }

    #[test]
    fn test_round_amount_first_match_wins() {
        assert_eq!(round_amount_risk(100_000.0), 20);
        assert_eq!(round_amount_risk(200_000.0), 20);
        assert_eq!(round_amount_risk(150_000.0), 15);
        assert_eq!(round_amount_risk(50_000.0), 15);
        assert_eq!(round_amount_risk(30_000.0), 10);
        assert_eq!(round_amount_risk(99_999.0), 0);
        assert_eq!(round_amount_risk(5_000.0), 0);
    }

    #[test]
    fn test_round_amount_truncates_fraction() {
        assert_eq!(round_amount_risk(100_000.75), 20);
        assert_eq!(round_amount_risk(9_999.99), 0);
    }

    #[test]
    fn test_time_risk_bands() {
        assert_eq!(time_risk(0), 20);
        assert_eq!(time_risk(1), 20);
        // Overlapping hour resolves to the first band
        assert_eq!(time_risk(2), 30);
        assert_eq!(time_risk(5), 30);
        assert_eq!(time_risk(6), 30);
        assert_eq!(time_risk(7), 10);
        assert_eq!(time_risk(8), 0);
        assert_eq!(time_risk(12), 0);
        assert_eq!(time_risk(22), 0);
        assert_eq!(time_risk(23), 20);
    }

    #[test]
    fn test_first_match_reports_band() {
        let tier = first_match(TIME_OF_DAY_TIERS, 2).unwrap();
        assert_eq!(tier.label, "early_morning");
        assert!(first_match(TIME_OF_DAY_TIERS, 12).is_none());
    }

    #[test]
    fn test_band_labels() {
        assert_eq!(band(AMOUNT_TIERS, 750_000.0), "over_500k");
        assert_eq!(band(AMOUNT_TIERS, 10.0), "none");
        assert_eq!(band(ROUND_AMOUNT_TIERS, 150_000), "multiple_of_50k");
        assert_eq!(band(TIME_OF_DAY_TIERS, 23), "late_night");
        assert_eq!(band(TIME_OF_DAY_TIERS, 6), "early_morning");
    }

    #[test]
    fn test_type_risk_lookup() {
        assert_eq!(type_risk("WITHDRAWAL"), 10);
        assert_eq!(type_risk("MPESA_WITHDRAWAL"), 15);
        assert_eq!(type_risk("INTERNAL_TRANSFER"), 5);
        assert_eq!(type_risk("UNKNOWN"), 0);
        assert_eq!(type_risk(""), 0);
        assert_eq!(type_risk("withdrawal"), 0);
    }
}
