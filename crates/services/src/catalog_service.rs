use std::sync::Arc;

use edu_core::model::{
    Lesson, LessonId, LessonPlacement, Subject, SubjectId, Title, Topic, TopicId,
};
use serde::Deserialize;
use storage::repository::CatalogRepository;
use tracing::info;

use crate::error::CatalogServiceError;

/// Nested curriculum document accepted by `CatalogService::import`.
///
/// Positions come from array order. Missing ids are generated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogImport {
    pub subjects: Vec<SubjectImport>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubjectImport {
    #[serde(default)]
    pub id: Option<SubjectId>,
    pub title: String,
    #[serde(default)]
    pub topics: Vec<TopicImport>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicImport {
    #[serde(default)]
    pub id: Option<TopicId>,
    pub title: String,
    #[serde(default)]
    pub lessons: Vec<LessonImport>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LessonImport {
    #[serde(default)]
    pub id: Option<LessonId>,
    pub title: String,
}

impl CatalogImport {
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed documents.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Counts of rows written by an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub subjects: usize,
    pub topics: usize,
    pub lessons: usize,
}

/// Curriculum catalog: import and lesson lookups for the HTTP layer.
#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    /// Validate the whole document, then upsert subjects, topics and lessons
    /// in that order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Catalog` if any title is blank (nothing
    /// is written in that case), or `CatalogServiceError::Storage` if a write
    /// fails.
    pub async fn import(&self, doc: CatalogImport) -> Result<ImportSummary, CatalogServiceError> {
        let mut subjects = Vec::new();
        let mut topics = Vec::new();
        let mut lessons = Vec::new();

        for subject in doc.subjects {
            let subject_id = subject.id.unwrap_or_else(SubjectId::random);
            subjects.push(Subject::new(subject_id, Title::new(subject.title)?));

            for (t_pos, topic) in (0_u32..).zip(subject.topics) {
                let topic_id = topic.id.unwrap_or_else(TopicId::random);
                topics.push(Topic::new(topic_id, subject_id, Title::new(topic.title)?, t_pos));

                for (l_pos, lesson) in (0_u32..).zip(topic.lessons) {
                    let lesson_id = lesson.id.unwrap_or_else(LessonId::random);
                    lessons.push(Lesson::new(
                        lesson_id,
                        topic_id,
                        Title::new(lesson.title)?,
                        l_pos,
                    ));
                }
            }
        }

        for subject in &subjects {
            self.catalog.upsert_subject(subject).await?;
        }
        for topic in &topics {
            self.catalog.upsert_topic(topic).await?;
        }
        for lesson in &lessons {
            self.catalog.upsert_lesson(lesson).await?;
        }

        let summary = ImportSummary {
            subjects: subjects.len(),
            topics: topics.len(),
            lessons: lessons.len(),
        };
        info!(
            subjects = summary.subjects,
            topics = summary.topics,
            lessons = summary.lessons,
            "catalog imported"
        );
        Ok(summary)
    }

    /// Topic and subject owning a lesson, or `None` if the lesson is unknown.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if the lookup fails.
    pub async fn locate_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Option<LessonPlacement>, CatalogServiceError> {
        Ok(self.catalog.locate_lesson(lesson_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use edu_core::model::CatalogError;
    use storage::repository::InMemoryRepository;

    const DOC: &str = r#"{
        "subjects": [{
            "id": "0b6d7a53-7f55-4b8e-9d38-0e8f6f1d2a01",
            "title": "Mathematics",
            "topics": [
                {
                    "title": "Fractions",
                    "lessons": [
                        { "id": "5a3c9e0d-1b2f-4c6a-8e7d-9f0a1b2c3d4e", "title": "Halves" },
                        { "title": "Quarters" }
                    ]
                },
                { "title": "Decimals" }
            ]
        }]
    }"#;

    #[tokio::test]
    async fn import_writes_tree_in_order() {
        let repo = InMemoryRepository::new();
        let service = CatalogService::new(Arc::new(repo.clone()));

        let summary = service
            .import(CatalogImport::from_json(DOC).unwrap())
            .await
            .unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                subjects: 1,
                topics: 2,
                lessons: 2
            }
        );

        let lesson: LessonId = "5a3c9e0d-1b2f-4c6a-8e7d-9f0a1b2c3d4e".parse().unwrap();
        let subject: SubjectId = "0b6d7a53-7f55-4b8e-9d38-0e8f6f1d2a01".parse().unwrap();
        let placement = service.locate_lesson(lesson).await.unwrap().unwrap();
        assert_eq!(placement.subject_id, subject);

        let topics = repo.list_topic_ids(subject).await.unwrap();
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0], placement.topic_id);
        assert_eq!(repo.count_lessons(topics[1]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn blank_title_rejects_whole_document() {
        let repo = InMemoryRepository::new();
        let service = CatalogService::new(Arc::new(repo.clone()));
        let doc = CatalogImport::from_json(
            r#"{ "subjects": [{ "title": "Science", "topics": [{ "title": "  " }] }] }"#,
        )
        .unwrap();

        let err = service.import(doc).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogServiceError::Catalog(CatalogError::EmptyTitle)
        ));
    }

    #[test]
    fn malformed_ids_fail_to_parse() {
        let raw = r#"{ "subjects": [{ "id": "nope", "title": "Art" }] }"#;
        assert!(CatalogImport::from_json(raw).is_err());
    }
}
