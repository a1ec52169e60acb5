// Search form model: hotel selection, stay dates and guest count

use crate::config::{DEFAULT_GUESTS, MAX_GUESTS, MAX_NIGHTS, MIN_GUESTS, MIN_NIGHTS};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// The API uses "-1" to mean every hotel
pub const ALL_HOTELS_ID: &str = "-1";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CriteriaError {
    #[error("Por favor, selecione um hotel")]
    MissingHotel,

    #[error("Por favor, selecione a data de check-in")]
    MissingCheckIn,

    #[error("Por favor, selecione a data de check-out")]
    MissingCheckOut,

    #[error("Check-out deve ser posterior ao check-in")]
    CheckOutNotAfterCheckIn,

    #[error("Stay of {0} nights exceeds the maximum of {max}", max = MAX_NIGHTS)]
    StayTooLong(i64),

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Guest count {0} outside {min}..={max}", min = MIN_GUESTS, max = MAX_GUESTS)]
    GuestCountOutOfRange(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HotelSelection {
    #[default]
    None,
    All,
    Hotel(String),
}

impl HotelSelection {
    // Mirrors the select box: empty value means nothing picked
    pub fn from_value(value: &str) -> Self {
        match value.trim() {
            "" => HotelSelection::None,
            ALL_HOTELS_ID => HotelSelection::All,
            id => HotelSelection::Hotel(id.to_string()),
        }
    }

    pub fn is_selected(&self) -> bool {
        !matches!(self, HotelSelection::None)
    }

    // Value sent to the API; an empty selection searches every hotel
    pub fn api_value(&self) -> &str {
        match self {
            HotelSelection::None | HotelSelection::All => ALL_HOTELS_ID,
            HotelSelection::Hotel(id) => id,
        }
    }
}

/// Number of guests, always within `MIN_GUESTS..=MAX_GUESTS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct GuestCount(u32);

impl TryFrom<u32> for GuestCount {
    type Error = CriteriaError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if (MIN_GUESTS..=MAX_GUESTS).contains(&value) {
            Ok(GuestCount(value))
        } else {
            Err(CriteriaError::GuestCountOutOfRange(value))
        }
    }
}

impl From<GuestCount> for u32 {
    fn from(guests: GuestCount) -> Self {
        guests.0
    }
}

impl Default for GuestCount {
    fn default() -> Self {
        GuestCount(DEFAULT_GUESTS)
    }
}

impl GuestCount {
    pub fn new(value: u32) -> Self {
        GuestCount(value.clamp(MIN_GUESTS, MAX_GUESTS))
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    /// Returns true when the count changed.
    pub fn increment(&mut self) -> bool {
        if self.0 < MAX_GUESTS {
            self.0 += 1;
            true
        } else {
            false
        }
    }

    /// Returns true when the count changed.
    pub fn decrement(&mut self) -> bool {
        if self.0 > MIN_GUESTS {
            self.0 -= 1;
            true
        } else {
            false
        }
    }

    pub fn label(&self) -> &'static str {
        if self.0 == 1 {
            "hóspede"
        } else {
            "hóspedes"
        }
    }
}

pub fn parse_iso_date(value: &str) -> Result<NaiveDate, CriteriaError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| CriteriaError::InvalidDate(value.to_string()))
}

// Validated, ready-to-send search parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub hotel: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub apply_booking_rules: bool,
}

impl SearchQuery {
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchCriteria {
    pub hotel: HotelSelection,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guests: GuestCount,
    pub apply_booking_rules: bool,
}

impl SearchCriteria {
    pub fn new() -> Self {
        Self {
            apply_booking_rules: true,
            ..Default::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.validate().is_empty()
    }

    // Collects every field error, like the form validator does before submit
    pub fn validate(&self) -> Vec<CriteriaError> {
        let mut errors = Vec::new();

        if !self.hotel.is_selected() {
            errors.push(CriteriaError::MissingHotel);
        }
        if self.check_in.is_none() {
            errors.push(CriteriaError::MissingCheckIn);
        }
        match (self.check_in, self.check_out) {
            (_, None) => errors.push(CriteriaError::MissingCheckOut),
            (Some(check_in), Some(check_out)) => {
                if let Err(e) = validate_range(check_in, check_out) {
                    errors.push(e);
                }
            }
            (None, Some(_)) => {}
        }

        errors
    }

    // Submission only needs the dates: a missing hotel falls back to every hotel
    pub fn to_query(&self) -> Result<SearchQuery, CriteriaError> {
        let check_in = self.check_in.ok_or(CriteriaError::MissingCheckIn)?;
        let check_out = self.check_out.ok_or(CriteriaError::MissingCheckOut)?;
        validate_range(check_in, check_out)?;

        Ok(SearchQuery {
            hotel: self.hotel.api_value().to_string(),
            check_in,
            check_out,
            apply_booking_rules: self.apply_booking_rules,
        })
    }

    pub fn nights(&self) -> Option<i64> {
        match (self.check_in, self.check_out) {
            (Some(check_in), Some(check_out)) => Some((check_out - check_in).num_days()),
            _ => None,
        }
    }
}

fn validate_range(check_in: NaiveDate, check_out: NaiveDate) -> Result<(), CriteriaError> {
    let nights = (check_out - check_in).num_days();
    if nights < MIN_NIGHTS {
        return Err(CriteriaError::CheckOutNotAfterCheckIn);
    }
    if nights > MAX_NIGHTS {
        return Err(CriteriaError::StayTooLong(nights));
    }
    Ok(())
}
