mod catalog;
mod ids;
mod percent;
mod progress;

pub use ids::{LessonId, ParseIdError, SubjectId, TopicId, UserId};

pub use catalog::{CatalogError, Lesson, LessonPlacement, Subject, Title, Topic};
pub use percent::Percent;
pub use progress::{
    LessonCompletion, LessonProgress, LessonStatus, ProgressError, QuizScore, SubjectProgress,
    TopicProgress,
};
