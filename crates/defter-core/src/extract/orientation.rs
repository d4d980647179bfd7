//! Orientation retry scanning for photographed receipts.
//!
//! Sideways phone photos are the dominant real-world extraction failure.
//! Instead of exhausting every angle, the scanner walks a fixed rotation
//! order and stops as soon as an attempt finds both a date and a total.

use std::borrow::Cow;
use std::io::Cursor;

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{DefterError, Result};
use crate::models::record::{ExtractedFields, MediaKind, RawDocument, CONFIDENCE_SUFFICIENT};
use crate::pipeline::retry::RetryPolicy;
use crate::service::{ExtractionMode, RecognitionPayload, RecognitionService};

use super::delegated::parse_structured;
use super::heuristic::extract_heuristic;
use super::money::normalize_amount;

/// Candidate rotation angles, in scan order: upright first, then the
/// most commonly needed correction, then the remaining one.
pub const ROTATION_ORDER: [Rotation; 3] = [
    Rotation::Upright,
    Rotation::Clockwise90,
    Rotation::CounterClockwise90,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Upright,
    Clockwise90,
    CounterClockwise90,
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Upright => 0,
            Rotation::Clockwise90 => 90,
            Rotation::CounterClockwise90 => 270,
        }
    }

    /// Rotate image bytes, re-encoding in the declared format. Upright
    /// borrows the original payload untouched.
    pub fn apply<'a>(self, bytes: &'a [u8], media: MediaKind) -> Result<Cow<'a, [u8]>> {
        if self == Rotation::Upright {
            return Ok(Cow::Borrowed(bytes));
        }

        let img = image::load_from_memory(bytes)?;
        let rotated = match self {
            Rotation::Clockwise90 => img.rotate90(),
            Rotation::CounterClockwise90 => img.rotate270(),
            Rotation::Upright => unreachable!(),
        };

        let format = match media {
            MediaKind::Png => image::ImageFormat::Png,
            _ => image::ImageFormat::Jpeg,
        };

        let mut buffer = Vec::new();
        rotated.write_to(&mut Cursor::new(&mut buffer), format)?;
        Ok(Cow::Owned(buffer))
    }
}

/// Result of an orientation scan.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub fields: ExtractedFields,
    pub rotation: Rotation,
}

/// Drive field extraction across rotation angles for a single receipt.
///
/// Short-circuits once an attempt reaches the sufficient-confidence
/// threshold (date and total both found). Otherwise the best attempt
/// wins: highest confidence, ties broken by the larger extracted total,
/// since a correctly oriented scan tends to yield more structured text.
/// Non-image media is assumed upright and scanned once.
pub async fn scan_with_rotations<S>(
    service: &S,
    retry: &RetryPolicy,
    doc: &RawDocument,
    scan_orientations: bool,
) -> Result<ScanOutcome>
where
    S: RecognitionService + ?Sized,
{
    let rotations: &[Rotation] = if doc.media.is_image() && scan_orientations {
        &ROTATION_ORDER
    } else {
        &ROTATION_ORDER[..1]
    };

    let mut best: Option<(ScanOutcome, Decimal)> = None;
    let mut last_error: Option<DefterError> = None;

    for &rotation in rotations {
        let bytes = match rotation.apply(&doc.bytes, doc.media) {
            Ok(bytes) => bytes,
            Err(err) => {
                // Undecodable payloads cannot be rotated; other angles
                // (and the upright attempt) may still have answered
                debug!(document = %doc.id, rotation = rotation.degrees(), %err,
                    "could not rotate payload");
                last_error = Some(err);
                continue;
            }
        };
        let payload = retry
            .run(|| service.recognize(&bytes, doc.media, ExtractionMode::Receipt))
            .await?;

        let fields = match payload {
            RecognitionPayload::Text(text) => extract_heuristic(&text),
            RecognitionPayload::Structured(body) => match parse_structured(&body) {
                Ok(fields) => fields,
                Err(err) => {
                    // A garbled guess at one angle is a zero-confidence
                    // attempt; another rotation may still read cleanly
                    debug!(document = %doc.id, rotation = rotation.degrees(), %err,
                        "structured guess unparseable at this rotation");
                    last_error = Some(err.into());
                    continue;
                }
            },
        };

        debug!(
            document = %doc.id,
            rotation = rotation.degrees(),
            confidence = fields.confidence,
            "orientation attempt"
        );

        let total = normalize_amount(&fields.total_amount);
        let outcome = ScanOutcome { fields, rotation };

        if outcome.fields.confidence >= CONFIDENCE_SUFFICIENT {
            return Ok(outcome);
        }

        let better = match &best {
            None => true,
            Some((current, current_total)) => {
                outcome.fields.confidence > current.fields.confidence
                    || (outcome.fields.confidence == current.fields.confidence
                        && total > *current_total)
            }
        };
        if better {
            best = Some((outcome, total));
        }
    }

    match best {
        Some((outcome, _)) => Ok(outcome),
        None => Err(last_error.unwrap_or_else(|| {
            DefterError::Extraction(crate::error::ExtractionError::MissingField(
                "no extraction attempt produced fields".to_string(),
            ))
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted service: returns one canned text per call, in order.
    struct ScriptedService {
        responses: Vec<String>,
        calls: AtomicUsize,
    }

    impl ScriptedService {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: responses.into_iter().map(String::from).collect(),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RecognitionService for ScriptedService {
        async fn recognize(
            &self,
            _bytes: &[u8],
            _media: MediaKind,
            _mode: ExtractionMode,
        ) -> std::result::Result<RecognitionPayload, crate::error::ServiceError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let text = self.responses.get(n).cloned().unwrap_or_default();
            Ok(RecognitionPayload::Text(text))
        }
    }

    // A 1x1 PNG so rotation has real bytes to work on.
    fn tiny_png() -> Vec<u8> {
        let img = image::DynamicImage::new_rgb8(1, 1);
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn doc() -> RawDocument {
        RawDocument::new("fis.png", tiny_png(), MediaKind::Png)
    }

    #[tokio::test]
    async fn test_early_exit_on_sufficient_confidence() {
        // confidence 1 (date only), then 3 (date + total), third unused
        let service = ScriptedService::new(vec![
            "MAGAZA\n15.01.2024\n",
            "MAGAZA\n15.01.2024\nTOPLAM 120.00\n",
            "MAGAZA\n15.01.2024\nTOPLAM 999.00\nKDV 10.00\n",
        ]);

        let outcome = scan_with_rotations(&service, &RetryPolicy::default(), &doc(), true)
            .await
            .unwrap();

        assert_eq!(outcome.rotation, Rotation::Clockwise90);
        assert_eq!(outcome.fields.total_amount, "120.00");
        assert_eq!(service.call_count(), 2);
    }

    #[tokio::test]
    async fn test_best_attempt_wins_when_none_sufficient() {
        // scores 1, 0, 1; tie broken by... no totals at all, so first
        // score-1 attempt is kept
        let service = ScriptedService::new(vec![
            "A\n15.01.2024\n",
            "garbled\n",
            "B\n16.01.2024\n",
        ]);

        let outcome = scan_with_rotations(&service, &RetryPolicy::default(), &doc(), true)
            .await
            .unwrap();

        assert_eq!(service.call_count(), 3);
        assert_eq!(outcome.fields.date, "15.01.2024");
        assert_eq!(outcome.rotation, Rotation::Upright);
    }

    #[tokio::test]
    async fn test_tie_broken_by_larger_total() {
        // Equal confidence 2 (total only); the larger total wins
        let service = ScriptedService::new(vec![
            "A\nTOPLAM 45.00\n",
            "B\nTOPLAM 120.00\n",
            "C\nTOPLAM 10.00\n",
        ]);

        let outcome = scan_with_rotations(&service, &RetryPolicy::default(), &doc(), true)
            .await
            .unwrap();

        assert_eq!(outcome.fields.total_amount, "120.00");
        assert_eq!(outcome.rotation, Rotation::Clockwise90);
    }

    #[tokio::test]
    async fn test_non_image_is_scanned_once() {
        let service = ScriptedService::new(vec!["A\n"]);
        let pdf = RawDocument::new("ekstre.pdf", vec![0x25, 0x50, 0x44, 0x46], MediaKind::Pdf);

        let outcome = scan_with_rotations(&service, &RetryPolicy::default(), &pdf, true)
            .await
            .unwrap();

        assert_eq!(service.call_count(), 1);
        assert_eq!(outcome.rotation, Rotation::Upright);
    }
}
