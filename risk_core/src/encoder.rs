use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const UNKNOWN_LABEL: &str = "unknown";

/// Result of encoding one categorical value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoded {
    Known(u32),
    /// Value was not in the fitted vocabulary
    Unknown,
}

/// Maps categorical strings to dense integer codes.
///
/// The vocabulary is fixed at fit time: sorted distinct values followed by an
/// `unknown` slot. Nothing is added at inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
    unknown: String,
}

impl LabelEncoder {
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let classes: BTreeSet<String> = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect();
        Self {
            classes: classes.into_iter().collect(),
            unknown: UNKNOWN_LABEL.to_string(),
        }
    }

    /// Classes seen during fit, in code order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Fitted classes plus the `unknown` slot when it was not fitted itself.
    pub fn vocabulary(&self) -> Vec<&str> {
        let mut vocab: Vec<&str> = self.classes.iter().map(String::as_str).collect();
        if !self.unknown_was_fitted() {
            vocab.push(&self.unknown);
        }
        vocab
    }

    pub fn unknown_was_fitted(&self) -> bool {
        self.code_of(&self.unknown).is_some()
    }

    /// Code reserved for unseen values.
    pub fn unknown_code(&self) -> u32 {
        self.code_of(&self.unknown)
            .unwrap_or(self.classes.len() as u32)
    }

    pub fn code_of(&self, value: &str) -> Option<u32> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
            .map(|i| i as u32)
    }

    pub fn encode(&self, value: &str) -> Encoded {
        match self.code_of(value) {
            Some(code) => Encoded::Known(code),
            None => Encoded::Unknown,
        }
    }

    /// Code for `value`, falling back to the `unknown` slot.
    pub fn transform(&self, value: &str) -> u32 {
        self.code_of(value).unwrap_or_else(|| self.unknown_code())
    }

    pub fn decode(&self, code: u32) -> Option<&str> {
        let idx = code as usize;
        if idx < self.classes.len() {
            Some(&self.classes[idx])
        } else if idx == self.classes.len() && !self.unknown_was_fitted() {
            Some(&self.unknown)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Classes must be sorted and distinct for `code_of` to hold.
    pub(crate) fn is_well_formed(&self) -> bool {
        self.classes.windows(2).all(|w| w[0] < w[1]) && self.unknown == UNKNOWN_LABEL
    }
}
