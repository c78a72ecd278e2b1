//! Patent records as retrieved, and the classification attached to them.

use serde::{Deserialize, Serialize};

use crate::era::{Era, determine_era};

/// One publication from the patent warehouse.
///
/// Identity is `publication_number`; a result set never repeats it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatentRecord {
    pub publication_number: String,
    /// ISO 8601 date string (`YYYY-MM-DD`).
    pub publication_date: Option<String>,
    pub publication_year: Option<i32>,
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub description: Option<String>,
    pub first_claim: Option<String>,
    /// Organisation names, `; `-joined when there are several.
    pub assignee: Option<String>,
    /// Deduplicated and sorted by the retrieval query.
    pub cpc_codes: Vec<String>,
}

/// What the classifier concluded about one record.
///
/// `coating_type` is advisory: it may fall outside the known categories.
/// `confidence` is whatever the model reported, unclamped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub coating_type: Option<String>,
    pub confidence: Option<f64>,
    pub era: Option<Era>,
}

impl Classification {
    /// A classification with nothing assigned, optionally with the era
    /// derived from year alone.
    pub fn unassigned(record: &PatentRecord, include_era: bool) -> Self {
        Self::new(record, None, None, include_era)
    }

    /// Build a classification, deriving the era when requested.
    pub fn new(
        record: &PatentRecord,
        coating_type: Option<String>,
        confidence: Option<f64>,
        include_era: bool,
    ) -> Self {
        let era = if include_era {
            determine_era(record.publication_year, coating_type.as_deref())
        } else {
            None
        };
        Self {
            coating_type,
            confidence,
            era,
        }
    }
}

/// A record paired with its classification. The record itself is never
/// modified once retrieved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedPatent {
    pub record: PatentRecord,
    pub classification: Classification,
}

impl PatentRecord {
    pub fn classified(self, classification: Classification) -> ClassifiedPatent {
        ClassifiedPatent {
            record: self,
            classification,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: Option<i32>) -> PatentRecord {
        PatentRecord {
            publication_number: "US123".into(),
            publication_year: year,
            ..Default::default()
        }
    }

    #[test]
    fn unassigned_with_era_uses_year_only() {
        let c = Classification::unassigned(&record(Some(1985)), true);
        assert_eq!(c.coating_type, None);
        assert_eq!(c.confidence, None);
        assert_eq!(c.era, Some(Era::PreBpa));
    }

    #[test]
    fn unassigned_without_era() {
        let c = Classification::unassigned(&record(Some(1985)), false);
        assert_eq!(c.era, None);
    }

    #[test]
    fn era_follows_assigned_coating() {
        let c = Classification::new(
            &record(Some(2001)),
            Some("Epoxy (BPA)".into()),
            Some(0.9),
            true,
        );
        assert_eq!(c.era, Some(Era::BpaEra));
    }

    #[test]
    fn classified_keeps_record_intact() {
        let r = record(Some(2020));
        let out = r.clone().classified(Classification::default());
        assert_eq!(out.record, r);
        assert_eq!(out.classification, Classification::default());
    }

    #[test]
    fn era_serialises_as_label() {
        let c = Classification {
            coating_type: Some("Polyester".into()),
            confidence: None,
            era: Some(Era::BpaEra),
        };
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"BPA-era\""), "{json}");
    }

    #[test]
    fn abstract_uses_column_name() {
        let r = PatentRecord {
            abstract_text: Some("A lacquer.".into()),
            ..record(None)
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["abstract"], "A lacquer.");
        assert!(json.get("abstract_text").is_none());

        let back: PatentRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }
}
