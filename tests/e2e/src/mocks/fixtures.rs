//! Test Data Factory
//!
//! A fixed bilingual corpus covering every entity type:
//! - Climate documents in English and Arabic for lexical and semantic scenarios
//! - An archived and a classified document for filtering
//! - Batch generation for pagination and ordering tests

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use dossier_search_core::{Document, EntityType, SqliteStore};
use dossier_search_server::{ImportSummary, Importer};
use uuid::Uuid;

/// Classification level of the restricted fixture document
pub const RESTRICTED_LEVEL: u8 = 3;

/// Ids of the seeded documents, by slug
#[derive(Debug, Clone, Default)]
pub struct SeededCorpus {
    ids: BTreeMap<&'static str, Uuid>,
}

impl SeededCorpus {
    /// Id of the document seeded under `slug`
    pub fn id(&self, slug: &str) -> Uuid {
        *self
            .ids
            .get(slug)
            .unwrap_or_else(|| panic!("no fixture document named {}", slug))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Factory for creating test data
///
/// # Example
///
/// ```rust,ignore
/// let store = SqliteStore::new(Some(path))?;
/// let corpus = TestDataFactory::seed_corpus(&store);
/// let id = corpus.id("climate-dossier");
/// ```
pub struct TestDataFactory;

impl TestDataFactory {
    /// Fixed reference time so `updated_at` ordering is reproducible
    pub fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    /// The bilingual corpus, newest first
    pub fn corpus() -> Vec<(&'static str, Document)> {
        let entries = vec![
            (
                "climate-dossier",
                Document::new(
                    EntityType::Dossier,
                    "Climate Policy Dossier",
                    "Overview of national climate policy, adaptation planning and the climate finance framework.",
                )
                .with_arabic(
                    "ملف سياسة المناخ",
                    "نظرة عامة على سياسة المناخ الوطنية وخطط التكيف وإطار تمويل المناخ.",
                ),
            ),
            (
                "climate-position",
                Document::new(
                    EntityType::Position,
                    "Position on Climate Finance",
                    "We support the climate finance framework and funding for coastal adaptation.",
                )
                .with_arabic(
                    "موقف بشأن تمويل المناخ",
                    "ندعم إطار تمويل المناخ وتمويل التكيف في المناطق الساحلية.",
                ),
            ),
            (
                "treaty-engagement",
                Document::new(
                    EntityType::Engagement,
                    "Paris Treaty Negotiation Round",
                    "Engagement on treaty commitments and emissions policy.",
                ),
            ),
            (
                "minister-person",
                Document::new(
                    EntityType::Person,
                    "Minister of Environment",
                    "Leads climate diplomacy and the national adaptation programme.",
                )
                .with_arabic("وزير البيئة", "يقود دبلوماسية المناخ والبرنامج الوطني للتكيف."),
            ),
            (
                "trade-mou",
                Document::new(
                    EntityType::Mou,
                    "Trade Cooperation MoU",
                    "Tariff review and customs cooperation between the parties.",
                )
                .with_arabic("مذكرة تفاهم للتعاون التجاري", "مراجعة التعريفات الجمركية والتعاون الجمركي."),
            ),
            (
                "water-document",
                Document::new(
                    EntityType::Document,
                    "Water Security Strategy",
                    "Desalination capacity and water security targets for coastal cities.",
                )
                .with_arabic("استراتيجية الأمن المائي", "أهداف الأمن المائي للمدن الساحلية."),
            ),
            (
                "energy-brief",
                Document::new(
                    EntityType::Brief,
                    "Energy Transition Brief",
                    "Renewable energy outlook and climate finance needs.",
                ),
            ),
            (
                "health-dossier",
                Document::new(
                    EntityType::Dossier,
                    "Public Health Policy Dossier",
                    "Vaccination policy and hospital capacity.",
                ),
            ),
            (
                "archived-position",
                Document::new(
                    EntityType::Position,
                    "Archived Climate Position",
                    "Superseded climate position from the previous mandate.",
                )
                .archived(true),
            ),
            (
                "restricted-document",
                Document::new(
                    EntityType::Document,
                    "Climate Negotiation Annex",
                    "Restricted annex with climate negotiation red lines.",
                )
                .classified(RESTRICTED_LEVEL),
            ),
        ];

        let base = Self::base_time();
        entries
            .into_iter()
            .enumerate()
            .map(|(i, (slug, doc))| (slug, doc.updated(base - Duration::hours(i as i64))))
            .collect()
    }

    /// Seed the corpus, with hash embeddings for semantic types
    pub fn seed_corpus(store: &SqliteStore) -> SeededCorpus {
        let importer = Importer::new(store);
        let mut summary = ImportSummary::default();
        let mut corpus = SeededCorpus::default();

        for (slug, doc) in Self::corpus() {
            importer
                .import_document(&doc, None, &mut summary)
                .expect("Failed to seed fixture document");
            corpus.ids.insert(slug, doc.id);
        }
        corpus
    }

    /// `count` positions sharing the term `batch`, with tied scores and
    /// staggered `updated_at`
    pub fn seed_batch(store: &SqliteStore, count: usize) -> Vec<Uuid> {
        let importer = Importer::new(store);
        let mut summary = ImportSummary::default();
        let base = Self::base_time();

        (0..count)
            .map(|i| {
                let doc = Document::new(
                    EntityType::Position,
                    format!("Batch position {}", i),
                    "Generated batch body text.",
                )
                .updated(base - Duration::minutes((i % 7) as i64));
                importer
                    .import_document(&doc, None, &mut summary)
                    .expect("Failed to seed batch document");
                doc.id
            })
            .collect()
    }
}
