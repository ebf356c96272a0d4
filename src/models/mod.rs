// Domain models shared by analysis, storage and routes

mod alert;
mod patient;
mod reading;
mod report;
mod summary;

pub use alert::{AlertCondition, AlertView, MissingData, Severity, VitalField};
pub use patient::PatientInfo;
pub use reading::{ParseError, Posture, VitalReading};
pub use report::{
    EmergencyContact, Medication, ReportDocument, ReportSection, ReportTemplate, SectionBody,
};
pub use summary::{LiveUpdate, PostureBucket, PostureDistribution, TrendSummary};
