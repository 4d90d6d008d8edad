//! JSON emitted at the process boundary: either the full detection list or
//! a single error object, never both.

use std::io::Write;

use serde::Serialize;

use crate::models::Detection;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Report<'a> {
    Detections(&'a [Detection]),
    Error { error: String },
}

impl<'a> Report<'a> {
    /// Successful result: the full detection list.
    pub fn detections(detections: &'a [Detection]) -> Self {
        Report::Detections(detections)
    }

    /// Error object carrying the full cause chain of `err`, joined by `": "`.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        Report::Error {
            error: format!("{err:#}"),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Write the report as one line of JSON.
    pub fn write_to(&self, mut out: impl Write) -> anyhow::Result<()> {
        serde_json::to_writer(&mut out, self)?;
        writeln!(out)?;
        Ok(())
    }
}
