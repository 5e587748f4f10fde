//! Serving-time yield query.

use crate::data::schema::{
    ANNUAL_RAINFALL, AREA, CROP, CROP_YEAR, DISTRICT_NAME, SEASON, SOIL_PH, SOIL_TYPE, STATE_NAME,
};
use crate::data::source::{DataBatch, number_cell};
use crate::error::MlError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One record to predict. Field names on the wire match the training CSV
/// headers. Soil measurements are optional and only become columns of the
/// record when supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldQuery {
    #[serde(rename = "State_Name")]
    pub state_name: String,
    #[serde(rename = "District_Name")]
    pub district_name: String,
    #[serde(rename = "Season")]
    pub season: String,
    #[serde(rename = "Crop")]
    pub crop: String,
    #[serde(rename = "Crop_Year")]
    pub crop_year: i32,
    #[serde(rename = "Area")]
    pub area: f64,
    #[serde(rename = "annual_rainfall")]
    pub annual_rainfall: f64,
    #[serde(rename = "Soil pH", default, skip_serializing_if = "Option::is_none")]
    pub soil_ph: Option<f64>,
    #[serde(rename = "Soil Type", default, skip_serializing_if = "Option::is_none")]
    pub soil_type: Option<String>,
}

impl YieldQuery {
    /// Reject non-finite measurements. A NaN or infinite value is malformed
    /// input, not a missing cell to impute.
    pub fn validate(&self) -> Result<(), MlError> {
        let measurements = [
            (AREA, Some(self.area)),
            (ANNUAL_RAINFALL, Some(self.annual_rainfall)),
            (SOIL_PH, self.soil_ph),
        ];
        let bad: Vec<&str> = measurements
            .iter()
            .filter(|(_, value)| value.is_some_and(|v| !v.is_finite()))
            .map(|(name, _)| *name)
            .collect();
        if bad.is_empty() {
            Ok(())
        } else {
            Err(MlError::transformation(format!(
                "non-finite values in [{}]",
                bad.join(", ")
            )))
        }
    }

    /// Single-row batch holding exactly the supplied fields.
    pub fn to_batch(&self) -> DataBatch {
        let mut columns = vec![
            STATE_NAME.to_string(),
            DISTRICT_NAME.to_string(),
            SEASON.to_string(),
            CROP.to_string(),
            CROP_YEAR.to_string(),
            AREA.to_string(),
            ANNUAL_RAINFALL.to_string(),
        ];
        let mut row = vec![
            text_cell(&self.state_name),
            text_cell(&self.district_name),
            text_cell(&self.season),
            text_cell(&self.crop),
            Value::from(self.crop_year),
            number_cell(self.area),
            number_cell(self.annual_rainfall),
        ];
        if let Some(ph) = self.soil_ph {
            columns.push(SOIL_PH.to_string());
            row.push(number_cell(ph));
        }
        if let Some(soil) = &self.soil_type {
            columns.push(SOIL_TYPE.to_string());
            row.push(text_cell(soil));
        }
        DataBatch::new(columns, vec![row])
    }
}

fn text_cell(value: &str) -> Value {
    Value::String(value.trim().to_string())
}
