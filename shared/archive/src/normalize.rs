//! Normalization of optional metadata values.
//!
//! Malformed values never fail a write; they become absent fields.

use anyhow::Result;
use chrono::NaiveDate;
use regex::Regex;

use lci_models::UncertaintySpec;

use crate::schema::Uncertainty;

pub const LOG_NORMAL_DISTRIBUTION: &str = "Logarithmic Normal Distribution";

pub struct Normalizer {
    date_re: Regex,
    dq_entry_re: Regex,
}

impl Normalizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            date_re: Regex::new(r"^\s*(\d{1,2})/(\d{1,2})/(\d{4})\s*$")?,
            dq_entry_re: Regex::new(r"^\s*\((.+)\)\s*$")?,
        })
    }

    /// `month/day/year` to ISO `year-month-day`
    pub fn date(&self, value: &str) -> Option<String> {
        let captures = self.date_re.captures(value)?;
        let month: u32 = captures[1].parse().ok()?;
        let day: u32 = captures[2].parse().ok()?;
        let year: i32 = captures[3].parse().ok()?;

        NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
    }

    /// Rounds the numeric members of a `(a;b;...)` entry, keeping `n.a.`
    pub fn dq_entry(&self, value: &str) -> Option<String> {
        let captures = self.dq_entry_re.captures(value)?;

        let members = captures[1]
            .split(';')
            .map(|member| {
                let member = member.trim();
                if member == "n.a." {
                    return Some(member.to_string());
                }
                let number = member.parse::<f64>().ok().filter(|n| n.is_finite())?;
                Some(format!("{}", number.round_ties_even() as i64))
            })
            .collect::<Option<Vec<_>>>()?;

        Some(format!("({})", members.join(";")))
    }

    /// Only log-normal uncertainties with two positive parameters are kept
    pub fn uncertainty(&self, spec: &UncertaintySpec) -> Option<Uncertainty> {
        if spec.distribution_type.trim() != LOG_NORMAL_DISTRIBUTION {
            return None;
        }
        let positive = |n: f64| n.is_finite() && n > 0.0;
        let geom_mean = spec.geom_mean.as_ref()?.as_f64().filter(|n| positive(*n))?;
        let geom_sd = spec.geom_sd.as_ref()?.as_f64().filter(|n| positive(*n))?;

        Some(Uncertainty::log_normal(geom_mean, geom_sd))
    }
}
