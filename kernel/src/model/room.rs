use serde::Serialize;
use thiserror::Error;

/// One of the physical rooms, numbered 1 through 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RoomNumber(i32);

impl RoomNumber {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 5;

    pub fn raw(self) -> i32 {
        self.0
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("room number {0} is out of range ({min}..={max})", min = RoomNumber::MIN, max = RoomNumber::MAX)]
pub struct RoomNumberOutOfRange(pub i32);

impl TryFrom<i32> for RoomNumber {
    type Error = RoomNumberOutOfRange;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(RoomNumberOutOfRange(value))
        }
    }
}

impl std::fmt::Display for RoomNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
