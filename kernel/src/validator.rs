//! Decides whether a UTC-normalized candidate may be committed.
//!
//! The checks run in a fixed order and the first failure wins:
//! interval shape, then start-in-the-past, then conflicts in the same room.
//! Creation and update share one conflict scan; an update passes its own id
//! as `exclude` so the record never collides with itself.

use crate::{
    model::{
        id::ReservationId,
        reservation::{Reservation, ReservationWindow},
        room::RoomNumber,
    },
    time::InvalidTimeZone,
};
use chrono::{DateTime, Utc};
use shared::error::AppError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error(transparent)]
    InvalidTimeZone(#[from] InvalidTimeZone),
    #[error("reservation start {start} must be earlier than its end {end}")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("reservation start {start} is in the past (now {now})")]
    PastStart {
        start: DateTime<Utc>,
        now: DateTime<Utc>,
    },
    #[error("room {room_number} is already reserved between {start} and {end}")]
    Overlap {
        room_number: RoomNumber,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl From<ValidationError> for AppError {
    fn from(value: ValidationError) -> Self {
        let message = value.to_string();
        match value {
            ValidationError::InvalidTimeZone(_) => AppError::InvalidTimeZone(message),
            ValidationError::InvalidInterval { .. } => AppError::InvalidInterval(message),
            ValidationError::PastStart { .. } => AppError::PastStart(message),
            ValidationError::Overlap { .. } => AppError::Overlap(message),
        }
    }
}

/// Validates against the current instant, read once for the whole call.
pub fn validate(
    candidate: &ReservationWindow,
    existing: &[Reservation],
    exclude: Option<ReservationId>,
) -> Result<(), ValidationError> {
    validate_at(candidate, existing, exclude, Utc::now())
}

pub fn validate_at(
    candidate: &ReservationWindow,
    existing: &[Reservation],
    exclude: Option<ReservationId>,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if candidate.start >= candidate.end {
        return Err(ValidationError::InvalidInterval {
            start: candidate.start,
            end: candidate.end,
        });
    }

    if candidate.start < now {
        return Err(ValidationError::PastStart {
            start: candidate.start,
            now,
        });
    }

    let conflict = existing
        .iter()
        .filter(|e| Some(e.id) != exclude)
        .any(|e| e.window().overlaps(candidate));
    if conflict {
        return Err(ValidationError::Overlap {
            room_number: candidate.room_number,
            start: candidate.start,
            end: candidate.end,
        });
    }

    Ok(())
}
