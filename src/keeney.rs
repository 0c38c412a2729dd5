//! Poisson counting statistics after Keeney et al.
//!
//! For a Poisson-distributed event count the precision follows
//! `r = (100/CV)²`, where `r` is the expected count and `CV` the
//! coefficient of variation in percent. Everything in this module is a
//! pure function of its arguments.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CalcError;

/// CV of a Poisson-distributed expected count, in percent.
pub fn cv_percent(count: f64) -> Result<f64, CalcError> {
    if !count.is_finite() || count <= 0.0 {
        return Err(CalcError::UndefinedCv { count });
    }
    Ok(100.0 / count.sqrt())
}

/// Minimum expected count needed to reach the given CV. Inverse of
/// [`cv_percent`].
pub fn required_count_for_cv(target_cv_percent: f64) -> Result<f64, CalcError> {
    if !target_cv_percent.is_finite() || target_cv_percent <= 0.0 {
        return Err(CalcError::InvalidTarget { target_cv_percent });
    }
    let r = 100.0 / target_cv_percent;
    Ok(r * r)
}

/// Reliability tier for a measured population, by CV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CvQuality {
    Excellent,
    Good,
    Fair,
    Poor,
    VeryPoor,
}

impl CvQuality {
    /// Boundaries are inclusive on the tighter side: exactly 1.0 is still
    /// Excellent, exactly 5.0 is still Good.
    pub fn from_cv_percent(cv: f64) -> Self {
        if cv <= 1.0 {
            CvQuality::Excellent
        } else if cv <= 5.0 {
            CvQuality::Good
        } else if cv <= 10.0 {
            CvQuality::Fair
        } else if cv <= 20.0 {
            CvQuality::Poor
        } else {
            CvQuality::VeryPoor
        }
    }
}

impl fmt::Display for CvQuality {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            CvQuality::Excellent => "Excellent (≤1%)",
            CvQuality::Good => "Good (1-5%)",
            CvQuality::Fair => "Fair (5-10%)",
            CvQuality::Poor => "Poor (10-20%)",
            CvQuality::VeryPoor => "Very Poor (>20%)",
        };
        write!(f, "{label}")
    }
}

pub const DEFAULT_DESIRED_CVS: [f64; 4] = [1.0, 5.0, 10.0, 20.0];
pub const DEFAULT_FREQUENCIES: [f64; 4] = [0.1, 0.01, 0.001, 0.0001];

/// Total events needed to reach one desired CV for a population occurring
/// at a given frequency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeeneyCell {
    pub cv_percent: f64,
    pub total_events: u64,
}

/// One row of Keeney's reference table: a population frequency, its `1:n`
/// ratio and the total events needed per desired CV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeeneyRow {
    pub frequency: f64,
    pub ratio: u64,
    pub events: Vec<KeeneyCell>,
}

/// Builds Keeney's reference table for the given desired CVs and population
/// frequencies. Event counts are truncated to whole events.
pub fn keeney_table(desired_cvs: &[f64], frequencies: &[f64]) -> Result<Vec<KeeneyRow>, CalcError> {
    let mut required = Vec::with_capacity(desired_cvs.len());
    for &cv in desired_cvs {
        required.push((cv, required_count_for_cv(cv)?));
    }

    let mut rows = Vec::with_capacity(frequencies.len());
    for &frequency in frequencies {
        if !(frequency > 0.0 && frequency <= 1.0) {
            return Err(CalcError::InvalidInput { value: frequency });
        }
        let events = required
            .iter()
            .map(|&(cv_percent, count)| KeeneyCell {
                cv_percent,
                total_events: (count / frequency) as u64,
            })
            .collect();
        rows.push(KeeneyRow {
            frequency,
            ratio: (1.0 / frequency) as u64,
            events,
        });
    }
    Ok(rows)
}
