//! JSON wire format of data responses.
//!
//! A response maps query region strings to lists of entries:
//!
//! ```json
//! {
//!   "chr10:1-1000000": [
//!     { "regionString": "chr10:12345-67890", "data": { "value": 1.5 } },
//!     { "regionString": "chr10:67890-99999",
//!       "data": { "validCount": 10, "sumData": 5.0, "sumSquares": 3.0, "minVal": 0.1, "maxVal": 1.0 } }
//!   ]
//! }
//! ```
//!
//! Entries are decoded one at a time so that a malformed entry can be
//! skipped without losing the rest of the batch.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use give_core::errors::RegionError;
use give_core::models::Region;
use give_tree::{SignalSummary, TreeError};

use crate::errors::TrackResult;

pub type Response = Map<String, Value>;

pub fn parse_response(text: &str) -> TrackResult<Response> {
    Ok(serde_json::from_str(text)?)
}

#[derive(Error, Debug)]
pub enum EntryError {
    #[error("entry is not an object")]
    NotAnObject,
    #[error("missing field `{0}`")]
    Missing(&'static str),
    #[error("invalid field `{0}`")]
    Invalid(&'static str),
    #[error(transparent)]
    Region(#[from] RegionError),
    #[error(transparent)]
    Payload(#[from] serde_json::Error),
    #[error(transparent)]
    Summary(#[from] TreeError),
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryPayload {
    pub valid_count: u64,
    pub sum_data: f64,
    pub sum_squares: f64,
    pub min_val: f64,
    pub max_val: f64,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct RawPayload {
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DataPayload {
    Raw(f64),
    Summary(SignalSummary),
}

impl TryFrom<&Value> for DataPayload {
    type Error = EntryError;

    ///
    /// A payload carrying `validCount` is a summary; anything else must be a
    /// raw value.
    ///
    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let object = value.as_object().ok_or(EntryError::Invalid("data"))?;
        if object.contains_key("validCount") {
            let payload = SummaryPayload::deserialize(value)?;
            let summary = SignalSummary::from_fields(
                payload.valid_count,
                payload.sum_data,
                payload.sum_squares,
                payload.min_val,
                payload.max_val,
            )?;
            Ok(DataPayload::Summary(summary))
        } else {
            let payload = RawPayload::deserialize(value)?;
            Ok(DataPayload::Raw(payload.value))
        }
    }
}

fn entry_region(object: &Map<String, Value>) -> Result<Region, EntryError> {
    let text = object
        .get("regionString")
        .ok_or(EntryError::Missing("regionString"))?
        .as_str()
        .ok_or(EntryError::Invalid("regionString"))?;
    Ok(text.parse()?)
}

///
/// One entry of a signal (bigWig-like) response.
///
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEntry {
    pub region: Region,
    pub data: DataPayload,
}

impl TryFrom<&Value> for SignalEntry {
    type Error = EntryError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let object = value.as_object().ok_or(EntryError::NotAnObject)?;
        let region = entry_region(object)?;
        let data = object.get("data").ok_or(EntryError::Missing("data"))?;
        Ok(SignalEntry {
            region,
            data: DataPayload::try_from(data)?,
        })
    }
}

///
/// Integers may arrive as numbers or as strings.
///
fn as_integer(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

///
/// One end of an interaction. Fields are read from `data` when present,
/// otherwise from the entry itself.
///
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionEntry {
    pub region: Region,
    pub link_id: u32,
    pub region_id: Option<u32>,
    pub value: Option<f64>,
    pub dir_flag: Option<u32>,
}

impl TryFrom<&Value> for InteractionEntry {
    type Error = EntryError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let object = value.as_object().ok_or(EntryError::NotAnObject)?;
        let region = entry_region(object)?;
        let fields = object
            .get("data")
            .and_then(Value::as_object)
            .unwrap_or(object);

        let link_id = fields.get("linkID").ok_or(EntryError::Missing("linkID"))?;
        let link_id = as_integer(link_id).ok_or(EntryError::Invalid("linkID"))?;

        Ok(InteractionEntry {
            region,
            link_id,
            region_id: fields.get("ID").and_then(as_integer),
            value: fields.get("value").and_then(as_float),
            dir_flag: fields.get("dirFlag").and_then(as_integer),
        })
    }
}
