use super::{ApiResponse, AppCommand, AppModel, RequestId, View, drop_stale};
use crate::domain::InlineError;
use crate::infra::{ApiCall, ApiOutcome};
use crossterm::event::{KeyCode, KeyEvent};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeedbackView {
    /// Markdown report from the server, once loaded.
    pub text: Option<String>,
    pub pending: Option<RequestId>,
    pub error: Option<InlineError>,
    pub scroll: u16,
}

pub(super) fn update_feedback(mut model: AppModel, mut view: FeedbackView, key: KeyEvent) -> (AppModel, AppCommand) {
    let mut command = AppCommand::None;
    match key.code {
        KeyCode::Char('q') => return (model, AppCommand::Quit),
        KeyCode::Char('?') => model.help_open = true,
        KeyCode::Up | KeyCode::Char('k') => view.scroll = view.scroll.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => view.scroll = view.scroll.saturating_add(1),
        KeyCode::PageUp => view.scroll = view.scroll.saturating_sub(10),
        KeyCode::PageDown => view.scroll = view.scroll.saturating_add(10),
        KeyCode::Home | KeyCode::Char('g') => view.scroll = 0,
        KeyCode::Char('r') => {
            if view.pending.is_none() {
                view.error = None;
                command = model.issue(&mut view.pending, ApiCall::Feedback);
            }
        }
        _ => {}
    }
    model.view = View::Feedback(view);
    (model, command)
}

pub(super) fn respond_feedback(mut model: AppModel, mut view: FeedbackView, response: ApiResponse) -> (AppModel, AppCommand) {
    if view.pending != Some(response.request_id) {
        drop_stale(&response);
        return (model, AppCommand::None);
    }
    view.pending = None;
    if let ApiOutcome::Feedback(result) = response.outcome {
        match result {
            Ok(text) => {
                view.text = Some(text);
                view.scroll = 0;
                view.error = None;
            }
            Err(error) => view.error = Some(error.inline("Could not load feedback.")),
        }
    }
    model.view = View::Feedback(view);
    (model, AppCommand::None)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{navigate, update};
    use super::*;
    use crate::domain::{FailureKind, Page};
    use crate::infra::ApiError;

    fn feedback_view(model: &AppModel) -> &FeedbackView {
        match &model.view {
            View::Feedback(view) => view,
            other => panic!("expected feedback view, got {other:?}"),
        }
    }

    #[test]
    fn loads_report_and_scrolls() {
        let (model, command) = navigate(model(true), Page::Feedback);
        let (id, call) = request_of(&command);
        assert_eq!(call, ApiCall::Feedback);
        let (model, _) = respond(model, id, ApiOutcome::Feedback(Ok("## Week\n- good".to_string())));
        assert_eq!(feedback_view(&model).text.as_deref(), Some("## Week\n- good"));

        let (model, _) = update(model, key(KeyCode::PageDown));
        assert_eq!(feedback_view(&model).scroll, 10);
        let (model, _) = update(model, key(KeyCode::Up));
        assert_eq!(feedback_view(&model).scroll, 9);
    }

    #[test]
    fn reload_is_ignored_while_pending() {
        let (model, _) = navigate(model(true), Page::Feedback);
        let (_, command) = update(model, key(KeyCode::Char('r')));
        assert_eq!(command, AppCommand::None);
    }

    #[test]
    fn rate_limit_message_comes_from_server() {
        let (model, command) = navigate(model(true), Page::Feedback);
        let (id, _) = request_of(&command);
        let (model, _) = respond(
            model,
            id,
            ApiOutcome::Feedback(Err(ApiError::RateLimited {
                message: "Feedback is available once per hour.".to_string(),
                remaining_seconds: Some(1200),
            })),
        );
        let error = feedback_view(&model).error.clone().expect("error");
        assert!(matches!(error.kind, FailureKind::RateLimited(_)));
        assert_eq!(error.message, "Feedback is available once per hour.");
    }
}
