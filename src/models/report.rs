// Renderer-agnostic report document: ordered sections of tables, bullets or lines

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
    pub title: String,
    /// Set by the caller; assembly itself never reads the clock.
    pub generated_at: Option<DateTime<Utc>>,
    pub sections: Vec<ReportSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSection {
    pub title: String,
    pub body: SectionBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum SectionBody {
    Table {
        head: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Bullets {
        items: Vec<String>,
    },
    Lines {
        lines: Vec<String>,
    },
}

/// Medication row of the clinical template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    pub phone: String,
}

/// Static clinical content appended after the computed sections. Supplied externally
/// (config here); nothing in it is derived from readings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportTemplate {
    #[serde(default)]
    pub medical_history: Vec<String>,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub disclaimer: Vec<String>,
}

impl ReportSection {
    pub fn table(title: &str, head: &[&str], rows: Vec<Vec<String>>) -> Self {
        Self {
            title: title.to_string(),
            body: SectionBody::Table {
                head: head.iter().map(|h| h.to_string()).collect(),
                rows,
            },
        }
    }

    pub fn bullets(title: &str, items: Vec<String>) -> Self {
        Self {
            title: title.to_string(),
            body: SectionBody::Bullets { items },
        }
    }

    pub fn lines(title: &str, lines: Vec<String>) -> Self {
        Self {
            title: title.to_string(),
            body: SectionBody::Lines { lines },
        }
    }
}

impl ReportDocument {
    pub fn section(&self, title: &str) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.title == title)
    }

    pub fn stamped(mut self, now: DateTime<Utc>) -> Self {
        self.generated_at = Some(now);
        self
    }

    /// Append the template's sections; empty parts add nothing.
    pub fn with_template(mut self, template: &ReportTemplate) -> Self {
        if !template.medical_history.is_empty() {
            self.sections.push(ReportSection::bullets(
                "Medical History",
                template.medical_history.clone(),
            ));
        }
        if !template.medications.is_empty() {
            let rows = template
                .medications
                .iter()
                .map(|m| vec![m.name.clone(), m.dosage.clone(), m.frequency.clone()])
                .collect();
            self.sections.push(ReportSection::table(
                "Current Medications",
                &["Medication", "Dosage", "Frequency"],
                rows,
            ));
        }
        if let Some(c) = &template.emergency_contact {
            self.sections.push(ReportSection::lines(
                "Emergency Contact",
                vec![
                    format!("Name: {}", c.name),
                    format!("Relationship: {}", c.relationship),
                    format!("Phone: {}", c.phone),
                ],
            ));
        }
        if !template.recommendations.is_empty() {
            self.sections.push(ReportSection::bullets(
                "Recommendations",
                template.recommendations.clone(),
            ));
        }
        if !template.disclaimer.is_empty() {
            self.sections
                .push(ReportSection::lines("Disclaimer", template.disclaimer.clone()));
        }
        self
    }
}
