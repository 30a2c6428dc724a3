//! Per-query search settings.
//!
//! Settings arrive with every request and are read-only during the search.
//! All derived durations are whole seconds, truncated.

use serde::{Deserialize, Serialize};

/// Cap on the billed duration of a single bike trip when
/// [`Settings::bike_max_15_minutes`] is set.
pub const MAX_BIKE_TRIP_SECONDS: i64 = 15 * 60;

/// Errors from [`Settings::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("walking pace must be 2-60 min/km, got {0}")]
    WalkingPace(u32),

    #[error("cycling pace must be 1-60 min/km, got {0}")]
    CyclingPace(u32),

    #[error("bike unlock time must be 0-120 s, got {0}")]
    BikeUnlockTime(u32),

    #[error("bike lock time must be 0-120 s, got {0}")]
    BikeLockTime(u32),

    #[error("rounds must be 1-10, got {0}")]
    Rounds(usize),

    #[error("maximum trip length must be 1-3 days, got {0}")]
    MaxTripDays(u32),
}

/// Extra time reserved for walking between points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransferBuffer {
    None,
    Short,
    #[default]
    Normal,
    Long,
}

/// Extra time reserved on shared-bike rides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BikeTripBuffer {
    None,
    Short,
    #[default]
    Medium,
    Long,
}

/// How strongly fewer transfers are preferred over an earlier arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ComfortBalance {
    ShortestTimeAbsolute,
    ShortestTime,
    #[default]
    Balanced,
    LeastTransfers,
}

/// How far the traveller is willing to walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WalkingPreference {
    Low,
    #[default]
    Normal,
    High,
}

/// Configuration parameters for one connection search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Walking pace in minutes per kilometer.
    pub walking_pace: u32,

    /// Cycling pace in minutes per kilometer.
    pub cycling_pace: u32,

    /// Seconds needed to unlock a shared bike.
    pub bike_unlock_time: u32,

    /// Seconds needed to lock a shared bike.
    pub bike_lock_time: u32,

    pub use_shared_bikes: bool,

    /// Reject bike trips whose billed time exceeds [`MAX_BIKE_TRIP_SECONDS`].
    pub bike_max_15_minutes: bool,

    pub transfer_buffer: TransferBuffer,
    pub bike_trip_buffer: BikeTripBuffer,
    pub comfort_balance: ComfortBalance,
    pub walking_preference: WalkingPreference,

    /// Number of rounds; bounds the number of transit legs in a result.
    pub rounds: usize,

    /// How many service days beyond the reach date a trip lookup may scan,
    /// and how far past the search begin a reach time may lie.
    pub max_trip_days: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            walking_pace: 12,
            cycling_pace: 5,
            bike_unlock_time: 30,
            bike_lock_time: 15,
            use_shared_bikes: false,
            bike_max_15_minutes: true,
            transfer_buffer: TransferBuffer::default(),
            bike_trip_buffer: BikeTripBuffer::default(),
            comfort_balance: ComfortBalance::default(),
            walking_preference: WalkingPreference::default(),
            rounds: 5,
            max_trip_days: 1,
        }
    }
}

impl Settings {
    /// Check every field against its accepted range.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(2..=60).contains(&self.walking_pace) {
            return Err(SettingsError::WalkingPace(self.walking_pace));
        }
        if !(1..=60).contains(&self.cycling_pace) {
            return Err(SettingsError::CyclingPace(self.cycling_pace));
        }
        if self.bike_unlock_time > 120 {
            return Err(SettingsError::BikeUnlockTime(self.bike_unlock_time));
        }
        if self.bike_lock_time > 120 {
            return Err(SettingsError::BikeLockTime(self.bike_lock_time));
        }
        if !(1..=10).contains(&self.rounds) {
            return Err(SettingsError::Rounds(self.rounds));
        }
        if !(1..=3).contains(&self.max_trip_days) {
            return Err(SettingsError::MaxTripDays(self.max_trip_days));
        }
        Ok(())
    }

    /// Longest walk, in meters, that may be used as a transfer.
    pub fn max_transfer_distance(&self) -> u32 {
        match self.walking_preference {
            WalkingPreference::Low => 250,
            WalkingPreference::Normal => 400,
            WalkingPreference::High => 750,
        }
    }

    pub fn moving_transfer_multiplier(&self) -> f64 {
        match self.transfer_buffer {
            TransferBuffer::None | TransferBuffer::Short => 1.0,
            TransferBuffer::Normal => 1.25,
            TransferBuffer::Long => 1.5,
        }
    }

    /// Minimum time for changing vehicles at the same place.
    pub fn stationary_transfer_seconds(&self) -> i64 {
        match self.transfer_buffer {
            TransferBuffer::None => 0,
            TransferBuffer::Short => 30,
            TransferBuffer::Normal | TransferBuffer::Long => 60,
        }
    }

    pub fn bike_trip_multiplier(&self) -> f64 {
        match self.bike_trip_buffer {
            BikeTripBuffer::None => 1.0,
            BikeTripBuffer::Short => 1.1,
            BikeTripBuffer::Medium => 1.25,
            BikeTripBuffer::Long => 1.5,
        }
    }

    /// Comfort penalty charged per transfer when ranking rounds.
    pub fn transfer_penalty_seconds(&self) -> i64 {
        match self.comfort_balance {
            ComfortBalance::ShortestTimeAbsolute => 0,
            ComfortBalance::ShortestTime => 120,
            ComfortBalance::Balanced => 240,
            ComfortBalance::LeastTransfers => 600,
        }
    }

    /// Unbuffered walking time over `distance` meters.
    ///
    /// # Examples
    ///
    /// ```
    /// use journey_router::planner::Settings;
    ///
    /// // 100 m at 12 min/km
    /// assert_eq!(Settings::default().walking_time(100), 72);
    /// ```
    pub fn walking_time(&self, distance: u32) -> i64 {
        (f64::from(distance) / 1000.0 * f64::from(self.walking_pace) * 60.0) as i64
    }

    /// Walking time including the transfer buffer.
    pub fn adjusted_walking_time(&self, distance: u32) -> i64 {
        (f64::from(distance) / 1000.0
            * f64::from(self.walking_pace)
            * 60.0
            * self.moving_transfer_multiplier()) as i64
    }

    /// Stop-to-stop transfer time: the stationary minimum for same-place
    /// changes, otherwise the buffered walk floored at that minimum.
    pub fn stop_transfer_time(&self, distance: u32) -> i64 {
        let stationary = self.stationary_transfer_seconds();
        if distance == 0 {
            stationary
        } else {
            self.adjusted_walking_time(distance).max(stationary)
        }
    }

    /// Unbuffered riding time over `distance` meters.
    pub fn bike_trip_time(&self, distance: u32) -> i64 {
        (f64::from(distance) / 1000.0 * f64::from(self.cycling_pace) * 60.0) as i64
    }

    /// Buffered riding time plus locking; what the rental is billed for.
    pub fn billed_bike_trip_time(&self, distance: u32) -> i64 {
        (f64::from(distance) / 1000.0
            * f64::from(self.cycling_pace)
            * 60.0
            * self.bike_trip_multiplier()) as i64
            + i64::from(self.bike_lock_time)
    }

    /// Full bike leg time: billed time plus unlocking.
    pub fn adjusted_bike_trip_time(&self, distance: u32) -> i64 {
        self.billed_bike_trip_time(distance) + i64::from(self.bike_unlock_time)
    }

    /// Whether a ride of `distance` meters exceeds the configured cap.
    pub fn bike_trip_exceeds_cap(&self, distance: u32) -> bool {
        self.bike_max_15_minutes && self.billed_bike_trip_time(distance) > MAX_BIKE_TRIP_SECONDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings() {
        let s = Settings::default();

        assert_eq!(s.walking_pace, 12);
        assert_eq!(s.cycling_pace, 5);
        assert_eq!(s.bike_unlock_time, 30);
        assert_eq!(s.bike_lock_time, 15);
        assert!(!s.use_shared_bikes);
        assert!(s.bike_max_15_minutes);
        assert_eq!(s.transfer_buffer, TransferBuffer::Normal);
        assert_eq!(s.comfort_balance, ComfortBalance::Balanced);
        assert_eq!(s.walking_preference, WalkingPreference::Normal);
        assert_eq!(s.bike_trip_buffer, BikeTripBuffer::Medium);
        assert_eq!(s.rounds, 5);
        assert_eq!(s.max_trip_days, 1);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn derived_constants() {
        let mut s = Settings::default();
        assert_eq!(s.max_transfer_distance(), 400);
        assert_eq!(s.stationary_transfer_seconds(), 60);
        assert_eq!(s.transfer_penalty_seconds(), 240);

        s.walking_preference = WalkingPreference::High;
        s.transfer_buffer = TransferBuffer::Short;
        s.comfort_balance = ComfortBalance::LeastTransfers;
        assert_eq!(s.max_transfer_distance(), 750);
        assert_eq!(s.stationary_transfer_seconds(), 30);
        assert_eq!(s.moving_transfer_multiplier(), 1.0);
        assert_eq!(s.transfer_penalty_seconds(), 600);
    }

    #[test]
    fn walking_durations() {
        let mut s = Settings::default();
        assert_eq!(s.walking_time(100), 72);
        // 72 * 1.25
        assert_eq!(s.adjusted_walking_time(100), 90);
        assert_eq!(s.stop_transfer_time(100), 90);
        assert_eq!(s.stop_transfer_time(0), 60);
        // buffered walk below the stationary floor
        assert_eq!(s.stop_transfer_time(10), 60);

        s.transfer_buffer = TransferBuffer::Short;
        assert_eq!(s.stop_transfer_time(100), 72);
    }

    #[test]
    fn bike_durations() {
        let s = Settings::default();
        // 1 km at 5 min/km = 300 s, * 1.25 = 375, + 15 lock
        assert_eq!(s.bike_trip_time(1000), 300);
        assert_eq!(s.billed_bike_trip_time(1000), 390);
        assert_eq!(s.adjusted_bike_trip_time(1000), 420);
        assert!(!s.bike_trip_exceeds_cap(1000));
        // 2.5 km: 750 * 1.25 + 15 = 952
        assert!(s.bike_trip_exceeds_cap(2500));

        let uncapped = Settings {
            bike_max_15_minutes: false,
            ..Settings::default()
        };
        assert!(!uncapped.bike_trip_exceeds_cap(2500));
    }

    #[test]
    fn validation_rejects_out_of_range() {
        let bad = |f: fn(&mut Settings)| {
            let mut s = Settings::default();
            f(&mut s);
            s.validate()
        };
        assert_eq!(bad(|s| s.walking_pace = 1), Err(SettingsError::WalkingPace(1)));
        assert_eq!(bad(|s| s.walking_pace = 61), Err(SettingsError::WalkingPace(61)));
        assert_eq!(bad(|s| s.cycling_pace = 0), Err(SettingsError::CyclingPace(0)));
        assert_eq!(bad(|s| s.bike_unlock_time = 121), Err(SettingsError::BikeUnlockTime(121)));
        assert_eq!(bad(|s| s.bike_lock_time = 500), Err(SettingsError::BikeLockTime(500)));
        assert_eq!(bad(|s| s.rounds = 0), Err(SettingsError::Rounds(0)));
        assert_eq!(bad(|s| s.max_trip_days = 4), Err(SettingsError::MaxTripDays(4)));
    }

    #[test]
    fn deserializes_partial_json() {
        let s: Settings =
            serde_json::from_str(r#"{"walking_pace": 15, "comfort_balance": "LeastTransfers"}"#)
                .unwrap();
        assert_eq!(s.walking_pace, 15);
        assert_eq!(s.comfort_balance, ComfortBalance::LeastTransfers);
        assert_eq!(s.cycling_pace, 5);
    }
}
