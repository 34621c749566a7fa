// AQI domain model - PM2.5 breakpoints, interpolation and health categories
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_INDEX: u16 = 0;
pub const MAX_INDEX: u16 = 500;

/// One row of the breakpoint table: a closed concentration interval (µg/m³)
/// mapped onto a closed index interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    pub c_lo: f64,
    pub c_hi: f64,
    pub i_lo: u16,
    pub i_hi: u16,
}

impl Breakpoint {
    const fn new(c_lo: f64, c_hi: f64, i_lo: u16, i_hi: u16) -> Self {
        Self { c_lo, c_hi, i_lo, i_hi }
    }

    pub fn contains(&self, c: f64) -> bool {
        self.c_lo <= c && c <= self.c_hi
    }

    fn interpolate(&self, c: f64) -> f64 {
        (f64::from(self.i_hi - self.i_lo) / (self.c_hi - self.c_lo)) * (c - self.c_lo)
            + f64::from(self.i_lo)
    }
}

/// EPA PM2.5 breakpoints, ascending. Rows are contiguous at 0.1 µg/m³ granularity.
pub const PM25_BREAKPOINTS: [Breakpoint; 7] = [
    Breakpoint::new(0.0, 12.0, 0, 50),
    Breakpoint::new(12.1, 35.4, 51, 100),
    Breakpoint::new(35.5, 55.4, 101, 150),
    Breakpoint::new(55.5, 150.4, 151, 200),
    Breakpoint::new(150.5, 250.4, 201, 300),
    Breakpoint::new(250.5, 350.4, 301, 400),
    Breakpoint::new(350.5, 500.4, 401, 500),
];

/// Truncate toward zero to one decimal place.
pub fn truncate_tenths(concentration: f64) -> f64 {
    (concentration * 10.0).trunc() / 10.0
}

/// Map a PM2.5 concentration onto the 0-500 index.
///
/// The concentration is truncated (not rounded) to tenths before the table
/// lookup; the interpolated index is rounded half away from zero. Values above
/// the top breakpoint clamp to 500 and anything below the table maps to 0.
pub fn map_to_index(concentration: f64) -> u16 {
    let c = truncate_tenths(concentration);

    if let Some(bp) = PM25_BREAKPOINTS.iter().find(|bp| bp.contains(c)) {
        let index = bp.interpolate(c).round() as u16;
        tracing::debug!(
            "AQI {} for {} µg/m³ (range {}-{} -> {}-{})",
            index,
            c,
            bp.c_lo,
            bp.c_hi,
            bp.i_lo,
            bp.i_hi
        );
        return index;
    }

    let top = PM25_BREAKPOINTS[PM25_BREAKPOINTS.len() - 1].c_hi;
    if c > top {
        tracing::debug!("Concentration {} above scale maximum {}, clamping to {}", c, top, MAX_INDEX);
        MAX_INDEX
    } else {
        tracing::debug!("Concentration {} below scale minimum, returning {}", c, MIN_INDEX);
        MIN_INDEX
    }
}

/// Health category bands over the index scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown AQI category '{0}'")]
pub struct CategoryParseError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("AQI value must be between 0 and 500 (got {0})")]
pub struct IndexOutOfRange(pub u16);

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Good,
        Category::Moderate,
        Category::UnhealthyForSensitiveGroups,
        Category::Unhealthy,
        Category::VeryUnhealthy,
        Category::Hazardous,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Good => "Good",
            Category::Moderate => "Moderate",
            Category::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            Category::Unhealthy => "Unhealthy",
            Category::VeryUnhealthy => "Very Unhealthy",
            Category::Hazardous => "Hazardous",
        }
    }

    /// Reference display color as `#RRGGBB`.
    pub fn color(&self) -> &'static str {
        match self {
            Category::Good => "#00FF00",
            Category::Moderate => "#FFFF00",
            Category::UnhealthyForSensitiveGroups => "#FF8000",
            Category::Unhealthy => "#FF0000",
            Category::VeryUnhealthy => "#800080",
            Category::Hazardous => "#80001A",
        }
    }

    pub fn color_name(&self) -> &'static str {
        match self {
            Category::Good => "Green",
            Category::Moderate => "Yellow",
            Category::UnhealthyForSensitiveGroups => "Orange",
            Category::Unhealthy => "Red",
            Category::VeryUnhealthy => "Purple",
            Category::Hazardous => "Maroon",
        }
    }

    /// Inclusive index range of the band; Hazardous is open-ended above 300.
    pub fn index_range(&self) -> (u16, u16) {
        match self {
            Category::Good => (0, 50),
            Category::Moderate => (51, 100),
            Category::UnhealthyForSensitiveGroups => (101, 150),
            Category::Unhealthy => (151, 200),
            Category::VeryUnhealthy => (201, 300),
            Category::Hazardous => (301, MAX_INDEX),
        }
    }

    pub fn from_label(label: &str) -> Result<Self, CategoryParseError> {
        Category::ALL
            .into_iter()
            .find(|c| c.label() == label.trim())
            .ok_or_else(|| CategoryParseError(label.to_string()))
    }
}

/// Table lookup of the health category for an index value.
pub fn categorize(index: u16) -> Category {
    match index {
        0..=50 => Category::Good,
        51..=100 => Category::Moderate,
        101..=150 => Category::UnhealthyForSensitiveGroups,
        151..=200 => Category::Unhealthy,
        201..=300 => Category::VeryUnhealthy,
        _ => Category::Hazardous,
    }
}

/// Checked index: accepts only values on the 0-500 scale.
pub fn checked_index(index: u16) -> Result<u16, IndexOutOfRange> {
    if index > MAX_INDEX {
        return Err(IndexOutOfRange(index));
    }
    Ok(index)
}

/// Index plus its category for one concentration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AqiResult {
    pub index: u16,
    pub category: Category,
}

impl AqiResult {
    pub fn from_concentration(concentration: f64) -> Self {
        let index = map_to_index(concentration);
        Self {
            index,
            category: categorize(index),
        }
    }

    pub fn color(&self) -> &'static str {
        self.category.color()
    }
}
