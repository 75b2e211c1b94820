use edu_core::model::{Lesson, LessonId, Percent, Subject, SubjectId, Title, Topic, TopicId};
use storage::repository::CatalogRepository;

pub(crate) fn pct(value: u8) -> Percent {
    Percent::new(value).unwrap()
}

/// A single subject with topics and lessons, ids indexed by position.
pub(crate) struct Curriculum {
    pub subject: SubjectId,
    pub topics: Vec<TopicId>,
    pub lessons: Vec<Vec<LessonId>>,
}

#[derive(Default)]
pub(crate) struct CurriculumBuilder {
    lessons_per_topic: Vec<u32>,
}

impl CurriculumBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn topic(mut self, lessons: u32) -> Self {
        self.lessons_per_topic.push(lessons);
        self
    }

    pub(crate) async fn build(self, repo: &impl CatalogRepository) -> Curriculum {
        let subject = SubjectId::random();
        repo.upsert_subject(&Subject::new(subject, Title::new("Subject").unwrap()))
            .await
            .unwrap();

        let mut topics = Vec::new();
        let mut lessons = Vec::new();
        for (t_pos, count) in (0_u32..).zip(self.lessons_per_topic) {
            let topic = TopicId::random();
            repo.upsert_topic(&Topic::new(
                topic,
                subject,
                Title::new(format!("Topic {t_pos}")).unwrap(),
                t_pos,
            ))
            .await
            .unwrap();

            let mut ids = Vec::new();
            for l_pos in 0..count {
                let lesson = LessonId::random();
                repo.upsert_lesson(&Lesson::new(
                    lesson,
                    topic,
                    Title::new(format!("Lesson {t_pos}.{l_pos}")).unwrap(),
                    l_pos,
                ))
                .await
                .unwrap();
                ids.push(lesson);
            }
            topics.push(topic);
            lessons.push(ids);
        }

        Curriculum {
            subject,
            topics,
            lessons,
        }
    }
}
