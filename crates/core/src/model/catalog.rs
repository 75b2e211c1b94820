use thiserror::Error;

use crate::model::ids::{LessonId, SubjectId, TopicId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("title cannot be empty")]
    EmptyTitle,
}

//
// ─── TITLE ─────────────────────────────────────────────────────────────────────
//

/// Validated display title (trimmed, non-empty).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Title(String);

impl Title {
    /// Create a validated title.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyTitle` if the title is empty after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, CatalogError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CatalogError::EmptyTitle);
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Title {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── ENTITIES ──────────────────────────────────────────────────────────────────
//

/// A subject (course): the root of the curriculum tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    id: SubjectId,
    title: Title,
}

impl Subject {
    #[must_use]
    pub fn new(id: SubjectId, title: Title) -> Self {
        Self { id, title }
    }

    #[must_use]
    pub fn id(&self) -> SubjectId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &Title {
        &self.title
    }
}

/// A topic; belongs to exactly one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    id: TopicId,
    subject_id: SubjectId,
    title: Title,
    position: u32,
}

impl Topic {
    #[must_use]
    pub fn new(id: TopicId, subject_id: SubjectId, title: Title, position: u32) -> Self {
        Self {
            id,
            subject_id,
            title,
            position,
        }
    }

    #[must_use]
    pub fn id(&self) -> TopicId {
        self.id
    }

    #[must_use]
    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    #[must_use]
    pub fn title(&self) -> &Title {
        &self.title
    }

    /// Ordering of the topic inside its subject.
    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }
}

/// A lesson; belongs to exactly one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    id: LessonId,
    topic_id: TopicId,
    title: Title,
    position: u32,
}

impl Lesson {
    #[must_use]
    pub fn new(id: LessonId, topic_id: TopicId, title: Title, position: u32) -> Self {
        Self {
            id,
            topic_id,
            title,
            position,
        }
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn topic_id(&self) -> TopicId {
        self.topic_id
    }

    #[must_use]
    pub fn title(&self) -> &Title {
        &self.title
    }

    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }
}

/// Where a lesson sits in the lesson → topic → subject tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LessonPlacement {
    pub lesson_id: LessonId,
    pub topic_id: TopicId,
    pub subject_id: SubjectId,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
