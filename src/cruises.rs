//! Research cruise catalogue
//!
//! Each cruise is identified by a name and a project code (`pcode`) and lists
//! the calendar months during which it collected flux observations.

use crate::errors::{PapaError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A calendar month, written `YYYYMM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CruiseMonth {
    pub year: i32,
    pub month: u32,
}

impl FromStr for CruiseMonth {
    type Err = PapaError;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PapaError::InvalidArgument(format!(
                "expected YYYYMM, got '{}'",
                s
            )));
        }
        let year: i32 = s[..4]
            .parse()
            .map_err(|_| PapaError::InvalidArgument(format!("bad year in '{}'", s)))?;
        let month: u32 = s[4..]
            .parse()
            .map_err(|_| PapaError::InvalidArgument(format!("bad month in '{}'", s)))?;
        if !(1..=12).contains(&month) {
            return Err(PapaError::InvalidArgument(format!(
                "month out of range in '{}'",
                s
            )));
        }
        Ok(Self { year, month })
    }
}

impl fmt::Display for CruiseMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

impl Serialize for CruiseMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CruiseMonth {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One research cruise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cruise {
    pub name: String,
    pub pcode: u32,
    pub months: Vec<CruiseMonth>,
}

impl Cruise {
    fn new(name: &str, pcode: u32, months: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            pcode,
            // literals below are all valid YYYYMM
            months: months.iter().filter_map(|m| m.parse().ok()).collect(),
        }
    }

    pub fn sampled(&self, month: CruiseMonth) -> bool {
        self.months.contains(&month)
    }
}

/// The ten cruises of the flux dataset, in catalogue order.
pub fn get_cruises() -> Vec<Cruise> {
    vec![
        Cruise::new(
            "metz",
            77,
            &[
                "199301", "199302", "199303", "199304", "199305", "199306", "199307", "199308",
                "199309", "199612", "199801", "199905", "199906", "199907", "199908", "199909",
                "199910", "199911", "199912",
            ],
        ),
        Cruise::new("calwater", 67, &["201501", "201502"]),
        Cruise::new("hiwings", 72, &["201309", "201310", "201311"]),
        Cruise::new("capricorn", 73, &["201603", "201604"]),
        Cruise::new("dynamo", 68, &["201109", "201110", "201111", "201112"]),
        Cruise::new(
            "stratus",
            83,
            &[
                "200110", "200412", "200510", "200610", "200710", "200711", "200810", "200811",
                "200812", "201001",
            ],
        ),
        Cruise::new(
            "epic",
            69,
            &[
                "199911", "199912", "200004", "200005", "200006", "200007", "200008", "200009",
                "200010", "200011", "200103", "200104", "200105", "200106", "200107", "200108",
                "200109", "200110", "200111", "200112", "200203", "200204", "200205", "200206",
                "200207", "200208", "200209", "200210", "200211", "200311", "200410", "200411",
            ],
        ),
        Cruise::new(
            "whots",
            87,
            &["200907", "201107", "201206", "201307", "201407", "201507"],
        ),
        Cruise::new("neaqs", 78, &["200407", "200408"]),
        Cruise::new("gasex", 71, &["200803", "200804"]),
    ]
}

pub fn find_by_name<'a>(cruises: &'a [Cruise], name: &str) -> Option<&'a Cruise> {
    cruises.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

pub fn find_by_pcode(cruises: &[Cruise], pcode: u32) -> Option<&Cruise> {
    cruises.iter().find(|c| c.pcode == pcode)
}

/// Cruises that were at sea during `month`.
pub fn cruises_in_month(cruises: &[Cruise], month: CruiseMonth) -> Vec<&Cruise> {
    cruises.iter().filter(|c| c.sampled(month)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_order_and_codes() {
        let cruises = get_cruises();
        let summary: Vec<(&str, u32, usize)> = cruises
            .iter()
            .map(|c| (c.name.as_str(), c.pcode, c.months.len()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("metz", 77, 19),
                ("calwater", 67, 2),
                ("hiwings", 72, 3),
                ("capricorn", 73, 2),
                ("dynamo", 68, 4),
                ("stratus", 83, 10),
                ("epic", 69, 32),
                ("whots", 87, 6),
                ("neaqs", 78, 2),
                ("gasex", 71, 2),
            ]
        );
    }

    #[test]
    fn overlapping_months() {
        let cruises = get_cruises();
        let month: CruiseMonth = "199911".parse().unwrap();
        let names: Vec<&str> = cruises_in_month(&cruises, month)
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["metz", "epic"]);

        let oct_2001: CruiseMonth = "200110".parse().unwrap();
        assert_eq!(cruises_in_month(&cruises, oct_2001).len(), 2);
    }

    #[test]
    fn lookups() {
        let cruises = get_cruises();
        assert_eq!(find_by_pcode(&cruises, 87).unwrap().name, "whots");
        assert_eq!(find_by_name(&cruises, "DYNAMO").unwrap().pcode, 68);
        assert!(find_by_pcode(&cruises, 1).is_none());
    }

    #[test]
    fn month_parsing() {
        assert_eq!(
            "201502".parse::<CruiseMonth>().unwrap(),
            CruiseMonth { year: 2015, month: 2 }
        );
        assert!("201513".parse::<CruiseMonth>().is_err());
        assert!("2015-1".parse::<CruiseMonth>().is_err());
    }

    #[test]
    fn json_uses_compact_months() {
        let cruises = get_cruises();
        let gasex = find_by_name(&cruises, "gasex").unwrap();
        let json = serde_json::to_string(gasex).unwrap();
        assert_eq!(json, r#"{"name":"gasex","pcode":71,"months":["200803","200804"]}"#);
        let back: Cruise = serde_json::from_str(&json).unwrap();
        assert_eq!(&back, gasex);
    }
}
