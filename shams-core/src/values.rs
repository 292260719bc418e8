use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },
}

fn check_range(
    field: &'static str,
    range: RangeInclusive<i64>,
    value: i64,
) -> Result<(), ValueError> {
    if range.contains(&value) {
        return Ok(());
    }

    Err(ValueError::OutOfRange {
        field,
        min: *range.start(),
        max: *range.end(),
        value,
    })
}

/// A mess feedback rating, always within 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 5;

    pub fn value(&self) -> i32 {
        self.0 as i32
    }
}

impl TryFrom<i32> for Rating {
    type Error = ValueError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        check_range("rating", Self::MIN as i64..=Self::MAX as i64, value as i64)?;
        Ok(Self(value as u8))
    }
}

impl From<Rating> for i32 {
    fn from(value: Rating) -> Self {
        value.value()
    }
}

/// The year of study a student is in, always within 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct StudyYear(u8);

impl StudyYear {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 5;

    pub fn value(&self) -> i32 {
        self.0 as i32
    }
}

impl TryFrom<i32> for StudyYear {
    type Error = ValueError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        check_range("year", Self::MIN as i64..=Self::MAX as i64, value as i64)?;
        Ok(Self(value as u8))
    }
}

impl From<StudyYear> for i32 {
    fn from(value: StudyYear) -> Self {
        value.value()
    }
}

/// Beds (or seats) versus the people currently using them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupancy {
    pub capacity: i32,
    pub occupied: i32,
}

impl Occupancy {
    /// The largest capacity a room or mess may be given
    pub const MAX_CAPACITY: i32 = 10_000;

    pub fn new(capacity: i32, occupied: usize) -> Self {
        Self {
            capacity,
            occupied: occupied as i32,
        }
    }

    /// Free places, never negative
    pub fn vacancy(&self) -> i32 {
        (self.capacity - self.occupied).max(0)
    }

    pub fn has_vacancy(&self) -> bool {
        self.occupied < self.capacity
    }

    /// Checks that a capacity is usable at all
    pub fn check_capacity(capacity: i32) -> Result<i32, ValueError> {
        check_range("capacity", 1..=Self::MAX_CAPACITY as i64, capacity as i64)?;
        Ok(capacity)
    }

    /// Whether everyone already placed still has a place under `capacity`
    pub fn fits_within(&self, capacity: i32) -> bool {
        self.occupied <= capacity
    }
}
