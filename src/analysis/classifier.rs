//! Majority-wins status classification.
//!
//! These functions compare relative magnitudes only, so callers may pass
//! percentages or raw counts. Ties resolve towards the first candidate:
//! green over amber over red, better over same over worse.

use crate::models::{ProgressNote, TrafficLight, Trend};

/// Pick the dominant light. Equal values favour green, then amber.
pub fn classify<T: PartialOrd>(green: T, amber: T, red: T) -> TrafficLight {
    if green >= amber && green >= red {
        TrafficLight::Green
    } else if amber >= green && amber >= red {
        TrafficLight::Amber
    } else {
        TrafficLight::Red
    }
}

/// Pick the dominant progress note. Equal values favour better, then same.
pub fn classify_progress<T: PartialOrd>(better: T, same: T, worse: T) -> ProgressNote {
    if better >= same && better >= worse {
        ProgressNote::Better
    } else if same >= better && same >= worse {
        ProgressNote::Same
    } else {
        ProgressNote::Worse
    }
}

/// Majority progress note over a set of notes.
pub fn majority_progress<I>(notes: I) -> ProgressNote
where
    I: IntoIterator<Item = ProgressNote>,
{
    let (mut better, mut same, mut worse) = (0usize, 0usize, 0usize);
    for note in notes {
        match note {
            ProgressNote::Better => better += 1,
            ProgressNote::Same => same += 1,
            ProgressNote::Worse => worse += 1,
        }
    }
    classify_progress(better, same, worse)
}

/// Compare two levels by score. `None` when there is nothing to compare to.
pub fn classify_trend(current: TrafficLight, previous: Option<TrafficLight>) -> Option<Trend> {
    let previous = previous?;
    Some(match current.score().cmp(&previous.score()) {
        std::cmp::Ordering::Greater => Trend::Improving,
        std::cmp::Ordering::Less => Trend::Declining,
        std::cmp::Ordering::Equal => Trend::Stable,
    })
}

/// Overall health across a set of per-card levels.
///
/// Red or amber win only with a strict majority; otherwise the result is
/// green as long as at least one card is green. An empty set, or a tie
/// between red and amber with no green, yields `None`.
pub fn overall_health<I>(levels: I) -> Option<TrafficLight>
where
    I: IntoIterator<Item = TrafficLight>,
{
    let (mut green, mut amber, mut red) = (0usize, 0usize, 0usize);
    for level in levels {
        match level {
            TrafficLight::Green => green += 1,
            TrafficLight::Amber => amber += 1,
            TrafficLight::Red => red += 1,
        }
    }

    if red > amber && red > green {
        Some(TrafficLight::Red)
    } else if amber > red && amber > green {
        Some(TrafficLight::Amber)
    } else if green > 0 {
        Some(TrafficLight::Green)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_ties() {
        assert_eq!(classify(5, 5, 5), TrafficLight::Green);
        assert_eq!(classify(0, 5, 5), TrafficLight::Amber);
        assert_eq!(classify(5, 0, 5), TrafficLight::Green);
        assert_eq!(classify(0, 0, 5), TrafficLight::Red);
        assert_eq!(classify(0, 0, 0), TrafficLight::Green);
    }

    #[test]
    fn test_classify_scale_invariant() {
        assert_eq!(classify(2, 1, 1), classify(20, 10, 10));
        assert_eq!(classify(1.0, 3.0, 2.0), classify(10.0, 30.0, 20.0));
        assert_eq!(classify(33.3, 33.3, 33.4), TrafficLight::Red);
    }

    #[test]
    fn test_classify_progress_ties() {
        assert_eq!(classify_progress(1, 1, 1), ProgressNote::Better);
        assert_eq!(classify_progress(0, 2, 2), ProgressNote::Same);
        assert_eq!(classify_progress(2, 1, 3), ProgressNote::Worse);
        assert_eq!(classify_progress(2, 3, 1), ProgressNote::Same);
    }

    #[test]
    fn test_majority_progress() {
        use ProgressNote::*;
        assert_eq!(majority_progress([Better, Better, Same]), Better);
        assert_eq!(majority_progress([Worse, Same, Worse]), Worse);
        assert_eq!(majority_progress([Worse, Same]), Same);
    }

    #[test]
    fn test_classify_trend() {
        use TrafficLight::*;
        assert_eq!(classify_trend(Green, None), None);
        assert_eq!(classify_trend(Green, Some(Red)), Some(Trend::Improving));
        assert_eq!(classify_trend(Red, Some(Green)), Some(Trend::Declining));
        assert_eq!(classify_trend(Amber, Some(Amber)), Some(Trend::Stable));
    }

    #[test]
    fn test_overall_health() {
        use TrafficLight::*;
        assert_eq!(overall_health(Vec::new()), None);
        assert_eq!(overall_health([Red, Red, Green]), Some(Red));
        assert_eq!(overall_health([Amber, Amber, Red]), Some(Amber));
        assert_eq!(overall_health([Green, Red]), Some(Green));
        assert_eq!(overall_health([Red, Amber]), None);
    }
}
