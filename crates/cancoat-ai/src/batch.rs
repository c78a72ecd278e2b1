//! Sequential batch classification.

use std::time::Duration;

use cancoat_core::{Classification, ClassifiedPatent, PatentRecord};
use tracing::info;

use crate::classify::CoatingClassifier;

/// Classify every record in input order, one remote call in flight at a time.
///
/// A failed record is kept with an empty classification and never aborts the
/// batch. Between records (never after the last) the run pauses for the
/// configured delay.
pub async fn classify_records(
    classifier: &CoatingClassifier,
    records: Vec<PatentRecord>,
) -> Vec<ClassifiedPatent> {
    let settings = classifier.settings();
    let include_era = settings.include_era;
    let delay = settings.delay;
    let total = records.len();
    let mut out = Vec::with_capacity(total);

    for (i, record) in records.into_iter().enumerate() {
        let index = i + 1;
        info!(
            index,
            total,
            publication_number = %record.publication_number,
            "classifying coating type"
        );

        let verdict = classifier.classify(&record).await;
        let classification =
            Classification::new(&record, verdict.coating_type, verdict.confidence, include_era);
        out.push(record.classified(classification));

        if index != total && delay > Duration::ZERO {
            classifier.pause(delay).await;
        }
    }

    let classified = out
        .iter()
        .filter(|c| c.classification.coating_type.is_some())
        .count();
    info!(classified, total, "classification batch complete");
    out
}

/// Attach empty classifications without calling the model. The era, when
/// requested, is derived from the publication year alone.
pub fn skip_classification(records: Vec<PatentRecord>, include_era: bool) -> Vec<ClassifiedPatent> {
    records
        .into_iter()
        .map(|record| {
            let classification = Classification::unassigned(&record, include_era);
            record.classified(classification)
        })
        .collect()
}
