//! Resume document model handed over by the form layer.
//!
//! Only the markup encoder reads it; the capture pipeline works on the
//! rendered layout instead.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Contact and headline information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    /// Full name
    pub full_name: String,
    /// Job title or headline
    pub title: Option<String>,
    /// Email address
    pub email: Option<String>,
    /// Phone number
    pub phone: Option<String>,
    /// City, country
    pub location: Option<String>,
    /// Personal website or profile URL
    pub website: Option<String>,
    /// Short professional summary
    pub summary: Option<String>,
}

/// A position held.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Experience {
    /// Employer
    pub company: String,
    /// Role
    pub position: String,
    /// Location
    pub location: Option<String>,
    /// Start date (free-form)
    pub start_date: String,
    /// End date; empty means current
    pub end_date: Option<String>,
    /// Free-text description
    pub description: Option<String>,
    /// Bullet points
    pub highlights: Vec<String>,
}

/// A degree or course.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Education {
    /// School or university
    pub institution: String,
    /// Degree
    pub degree: String,
    /// Field of study
    pub field: Option<String>,
    /// Start date (free-form)
    pub start_date: String,
    /// End date; empty means current
    pub end_date: Option<String>,
    /// Free-text description
    pub description: Option<String>,
}

/// A skill with an optional proficiency label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Skill {
    /// Skill name
    pub name: String,
    /// Proficiency (e.g. "Advanced")
    pub level: Option<String>,
}

/// A complete resume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResumeDocument {
    /// Personal information
    pub personal: PersonalInfo,
    /// Work experience, most recent first
    pub experience: Vec<Experience>,
    /// Education, most recent first
    pub education: Vec<Education>,
    /// Skills
    pub skills: Vec<Skill>,
}

impl ResumeDocument {
    /// Parse a resume from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a resume JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Format a date range, rendering a missing end as "Present".
pub fn date_range(start: &str, end: Option<&str>) -> String {
    let end = match end.map(str::trim) {
        Some(e) if !e.is_empty() => e,
        _ => "Present",
    };
    if start.trim().is_empty() {
        end.to_string()
    } else {
        format!("{} – {}", start.trim(), end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_with_defaults() {
        let resume = ResumeDocument::from_json(
            r#"{"personal": {"fullName": "Ada Lovelace"}, "skills": [{"name": "Analysis"}]}"#,
        )
        .unwrap();
        assert_eq!(resume.personal.full_name, "Ada Lovelace");
        assert!(resume.experience.is_empty());
        assert_eq!(resume.skills[0].level, None);
    }

    #[test]
    fn test_date_range() {
        assert_eq!(date_range("2019", Some("2021")), "2019 – 2021");
        assert_eq!(date_range("2022", None), "2022 – Present");
        assert_eq!(date_range("2022", Some("  ")), "2022 – Present");
        assert_eq!(date_range("", Some("2020")), "2020");
    }
}
