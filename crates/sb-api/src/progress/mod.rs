mod routes;

pub use routes::{QuizResultPayload, routes};
