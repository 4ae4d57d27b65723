use std::fmt;

use serde::{Deserialize, Serialize};

/// Human-readable receipt identifier: `DEAL-<year>-<six digit sequence>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptId(pub String);

const PREFIX: &str = "DEAL";
const SEQUENCE_WIDTH: usize = 6;

impl ReceiptId {
    pub fn format(year: i32, sequence: u32) -> Self {
        Self(format!("{PREFIX}-{year:04}-{sequence:0width$}", width = SEQUENCE_WIDTH))
    }

    /// Split a well-formed id into its year and sequence.
    #[cfg(test)]
    pub(crate) fn parts(&self) -> Option<(i32, u32)> {
        let mut segments = self.0.splitn(3, '-');
        if segments.next()? != PREFIX {
            return None;
        }
        let year = segments.next()?;
        let sequence = segments.next()?;
        if year.len() != 4 || sequence.len() < SEQUENCE_WIDTH {
            return None;
        }
        if !year.bytes().chain(sequence.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some((year.parse().ok()?, sequence.parse().ok()?))
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
