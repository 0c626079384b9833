//! Letter grades for KPI percentages

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Overall quality grade of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Grade {
    /// 80 % and above
    A,
    /// 65 % and above
    B,
    /// 50 % and above
    C,
    /// 35 % and above
    D,
    /// 20 % and above
    E,
    /// Below 20 %
    F,
    /// Ungraded: a mandatory KPI did not reach 100 %
    U,
}

impl Grade {
    /// Position on the breakpoint scale, higher is better
    ///
    /// `U` sits below `F`.
    pub fn rank(self) -> u8 {
        match self {
            Grade::A => 6,
            Grade::B => 5,
            Grade::C => 4,
            Grade::D => 3,
            Grade::E => 2,
            Grade::F => 1,
            Grade::U => 0,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
            Grade::F => "F",
            Grade::U => "U",
        };
        f.write_str(letter)
    }
}

/// Breakpoints as inclusive lower bounds, best first
const BREAKPOINTS: [(f64, Grade); 5] = [
    (80.0, Grade::A),
    (65.0, Grade::B),
    (50.0, Grade::C),
    (35.0, Grade::D),
    (20.0, Grade::E),
];

/// Letter grade of a percentage
///
/// An undefined percentage has no grade. Anything outside `0..=100` is a
/// caller bug and reported as [`Error::InvalidPercentage`].
pub fn grade(percentage: Option<f64>) -> Result<Option<Grade>> {
    let Some(percentage) = percentage else {
        return Ok(None);
    };
    if !(0.0..=100.0).contains(&percentage) {
        return Err(Error::InvalidPercentage(percentage));
    }
    let grade = BREAKPOINTS
        .iter()
        .find(|(bound, _)| percentage >= *bound)
        .map_or(Grade::F, |(_, grade)| *grade);
    Ok(Some(grade))
}

/// Two-stage overall grade: the mandatory gate, then the breakpoint table
pub fn overall_grade(percentage: Option<f64>, mandatory_complete: bool) -> Result<Option<Grade>> {
    if !mandatory_complete {
        return Ok(Some(Grade::U));
    }
    grade(percentage)
}
