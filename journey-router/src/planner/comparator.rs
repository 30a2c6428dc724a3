//! Direction-aware comparisons.
//!
//! A forward search minimises arrival times and walks routes by increasing
//! stop index; a backward search maximises departure times and walks routes
//! the other way. Every comparison in the round loop goes through these so
//! one implementation serves both directions.

use chrono::NaiveDateTime;

/// Compares instants in the search direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeComparator {
    forward: bool,
}

impl TimeComparator {
    pub fn new(forward: bool) -> Self {
        Self { forward }
    }

    /// Whether `candidate` is strictly better than `current`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use journey_router::planner::TimeComparator;
    ///
    /// let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    /// let early = day.and_hms_opt(8, 0, 0).unwrap();
    /// let late = day.and_hms_opt(9, 0, 0).unwrap();
    ///
    /// assert!(TimeComparator::new(true).improves(early, late));
    /// assert!(TimeComparator::new(false).improves(late, early));
    /// assert!(!TimeComparator::new(true).improves(early, early));
    /// ```
    pub fn improves(&self, candidate: NaiveDateTime, current: NaiveDateTime) -> bool {
        if self.forward {
            candidate < current
        } else {
            candidate > current
        }
    }

    /// Whether `candidate` is at least as good as `current`.
    pub fn improves_or_equals(&self, candidate: NaiveDateTime, current: NaiveDateTime) -> bool {
        candidate == current || self.improves(candidate, current)
    }

    /// The "never reached" value: later than everything going forward,
    /// earlier than everything going backward.
    pub fn worst(&self) -> NaiveDateTime {
        if self.forward {
            NaiveDateTime::MAX
        } else {
            NaiveDateTime::MIN
        }
    }
}

/// Compares stop indices along a route in the search direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexComparator {
    forward: bool,
}

impl IndexComparator {
    pub fn new(forward: bool) -> Self {
        Self { forward }
    }

    /// Whether index `a` is visited before `b`.
    pub fn precedes_in_search_direction(&self, a: usize, b: usize) -> bool {
        if self.forward { a < b } else { a > b }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use chrono::DateTime;
    use proptest::prelude::*;

    prop_compose! {
        fn instant()(secs in 1_600_000_000i64..1_800_000_000) -> NaiveDateTime {
            DateTime::from_timestamp(secs, 0).unwrap().naive_utc()
        }
    }

    proptest! {
        /// Forward and backward comparators are mirror images.
        #[test]
        fn directions_are_mirrored(a in instant(), b in instant()) {
            let fwd = TimeComparator::new(true);
            let bwd = TimeComparator::new(false);
            prop_assert_eq!(fwd.improves(a, b), bwd.improves(b, a));
            prop_assert!(!(fwd.improves(a, b) && fwd.improves(b, a)));
            prop_assert!(fwd.improves(a, fwd.worst()));
            prop_assert!(bwd.improves(a, bwd.worst()));
        }
    }
}
