pub mod answer;
pub mod composite;
pub mod loader;
pub mod phonetics;
pub mod picker;
pub mod progressive;
pub mod rating;
pub mod selector;
pub mod session;
pub mod timer;
pub mod types;
pub mod view;

pub use answer::AnswerResolver;
pub use picker::{RoundPicker, StandardQuiz};
pub use session::{QuizSession, SessionOptions};
pub use types::{QuizItem, Round, SharedItem};
