// Patient identity (from config; stand-in for the EHR record).
// snake_case aliases accept the config file's key style.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientInfo {
    #[serde(alias = "patient_id")]
    pub patient_id: String,
    pub name: String,
    pub age: u32,
    #[serde(alias = "blood_group")]
    pub blood_group: String,
    pub phone: String,
    pub email: String,
}
