//! Ordered keyword rule tables for interpreting free-text decisions.
//!
//! Each table is evaluated top to bottom and the first rule with a matching
//! keyword wins. Keywords match whole words (or whole phrases for multi-word
//! keywords) after lowercasing and stripping punctuation, so `"car"` does not
//! match `"scarce"`. Text that matches nothing resolves to the caller's
//! baseline.

use citylab_types::{PolicyType, TravelMode};

/// One row of a rule table.
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule<T: 'static> {
    /// Outcome when any keyword matches.
    pub outcome: T,
    /// Words or phrases that select this outcome.
    pub keywords: &'static [&'static str],
}

/// Direction a transit operator wants to move service levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyIntent {
    /// Run more often on the busiest route.
    Increase,
    /// Run less often on the quietest route.
    Decrease,
}

/// Travel-mode rules, highest priority first.
pub const MODE_RULES: &[KeywordRule<TravelMode>] = &[
    KeywordRule {
        outcome: TravelMode::Transit,
        keywords: &["transit", "bus", "buses", "train", "subway", "metro", "tram"],
    },
    KeywordRule {
        outcome: TravelMode::Car,
        keywords: &["car", "drive", "driving"],
    },
    KeywordRule {
        outcome: TravelMode::Bike,
        keywords: &["bike", "biking", "cycling", "bicycle"],
    },
    KeywordRule {
        outcome: TravelMode::Walk,
        keywords: &["walk", "walking"],
    },
];

/// Policy rules, highest priority first. Unmatched text is `General`.
pub const POLICY_RULES: &[KeywordRule<PolicyType>] = &[
    KeywordRule {
        outcome: PolicyType::CongestionPricing,
        keywords: &["congestion", "pricing", "toll", "tolls"],
    },
    KeywordRule {
        outcome: PolicyType::TransitImprovement,
        keywords: &["bus", "buses", "transit"],
    },
    KeywordRule {
        outcome: PolicyType::ZoningChange,
        keywords: &["zoning", "rezoning"],
    },
    KeywordRule {
        outcome: PolicyType::BikeInfrastructure,
        keywords: &["bike", "bikes", "cycling", "bicycle"],
    },
];

/// Service-level rules, highest priority first.
pub const FREQUENCY_RULES: &[KeywordRule<FrequencyIntent>] = &[
    KeywordRule {
        outcome: FrequencyIntent::Increase,
        keywords: &["increase", "more frequent", "boost"],
    },
    KeywordRule {
        outcome: FrequencyIntent::Decrease,
        keywords: &["decrease", "reduce", "less frequent"],
    },
];

/// Lowercase `text` and collapse it to single-space separated words,
/// padded with a space on both ends.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len().saturating_add(2));
    out.push(' ');
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        out.push_str(&word.to_lowercase());
        out.push(' ');
    }
    out
}

/// Evaluate a rule table against `text`.
pub fn classify<T: Copy>(rules: &[KeywordRule<T>], text: &str) -> Option<T> {
    let haystack = normalize(text);
    rules
        .iter()
        .find(|rule| {
            rule.keywords
                .iter()
                .any(|keyword| haystack.contains(&format!(" {keyword} ")))
        })
        .map(|rule| rule.outcome)
}

/// Travel mode named in `text`, if any.
pub fn classify_mode(text: &str) -> Option<TravelMode> {
    classify(MODE_RULES, text)
}

/// Policy category of `text`; `General` when nothing matches.
pub fn classify_policy(text: &str) -> PolicyType {
    classify(POLICY_RULES, text).unwrap_or(PolicyType::General)
}

/// Service-level change requested in `text`, if any.
pub fn classify_frequency(text: &str) -> Option<FrequencyIntent> {
    classify(FREQUENCY_RULES, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_priority_picks_first_matching_rule() {
        assert_eq!(
            classify_policy("Introduce congestion pricing downtown and add bus lanes."),
            PolicyType::CongestionPricing
        );
        assert_eq!(
            classify_policy("More buses and bike racks"),
            PolicyType::TransitImprovement
        );
        assert_eq!(
            classify_policy("Relax ZONING near stations; add cycling lanes"),
            PolicyType::ZoningChange
        );
        assert_eq!(classify_policy("Protected cycling lanes"), PolicyType::BikeInfrastructure);
    }

    #[test]
    fn unmatched_policy_text_is_general() {
        assert_eq!(classify_policy("Hold a public consultation."), PolicyType::General);
        assert_eq!(classify_policy(""), PolicyType::General);
    }

    #[test]
    fn mode_keywords_match_whole_words() {
        assert_eq!(classify_mode("I'll take the bus today."), Some(TravelMode::Transit));
        assert_eq!(classify_mode("Driving is faster; I'll drive."), Some(TravelMode::Car));
        assert_eq!(classify_mode("Parking is scarce."), None);
        assert_eq!(classify_mode("Cycling, obviously"), Some(TravelMode::Bike));
        assert_eq!(classify_mode("A short walk."), Some(TravelMode::Walk));
    }

    #[test]
    fn mode_priority_prefers_transit_over_car() {
        assert_eq!(
            classify_mode("The car is expensive, take transit instead"),
            Some(TravelMode::Transit)
        );
    }

    #[test]
    fn frequency_phrases_match() {
        assert_eq!(
            classify_frequency("Run route A more frequent during the peak"),
            Some(FrequencyIntent::Increase)
        );
        assert_eq!(
            classify_frequency("We should reduce off-peak service"),
            Some(FrequencyIntent::Decrease)
        );
        assert_eq!(classify_frequency("Keep the timetable."), None);
    }
}
