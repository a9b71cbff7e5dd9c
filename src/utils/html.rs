use crate::models::quiz::QuizPayload;

/// Cleans teacher-authored quiz text with the ammonia whitelist sanitizer.
///
/// Title, description and question prompts are rendered as HTML by clients, so
/// safe tags (<b>, <p>) survive and <script>, <iframe> and event attributes are
/// stripped. Options, expected answers and matching pairs are left untouched:
/// they are compared verbatim during grading.
pub fn sanitize_quiz(mut payload: QuizPayload) -> QuizPayload {
    payload.title = ammonia::clean(&payload.title);
    payload.description = payload.description.map(|d| ammonia::clean(&d));
    for question in &mut payload.questions {
        question.text = ammonia::clean(&question.text);
    }
    payload
}
