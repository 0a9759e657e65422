use super::{ApiResponse, AppCommand, AppModel, RequestId, View, drop_stale};
use crate::domain::{DAYS_PER_WEEK, DailyMetrics, InlineError, Week, summarize_week};
use crate::infra::{ApiCall, ApiOutcome};
use crossterm::event::{KeyCode, KeyEvent};
use time::Date;

#[derive(Clone, Debug, PartialEq)]
pub struct GraphView {
    pub week: Week,
    pub days: Option<[DailyMetrics; DAYS_PER_WEEK]>,
    pub pending: Option<RequestId>,
    pub error: Option<InlineError>,
}

impl GraphView {
    pub fn new(today: Date) -> Self {
        Self {
            week: Week::containing(today),
            days: None,
            pending: None,
            error: None,
        }
    }

    /// Points the chart at `week` and asks for its data. A response for the
    /// previous week is dropped when it arrives.
    fn load(&mut self, model: &mut AppModel, week: Week) -> AppCommand {
        self.week = week;
        self.days = None;
        self.error = None;
        model.issue(&mut self.pending, ApiCall::Dashboard(week))
    }
}

pub(super) fn update_graph(mut model: AppModel, mut view: GraphView, key: KeyEvent) -> (AppModel, AppCommand) {
    let command = match key.code {
        KeyCode::Char('q') => return (model, AppCommand::Quit),
        KeyCode::Char('?') => {
            model.help_open = true;
            AppCommand::None
        }
        KeyCode::Left | KeyCode::Char('[') | KeyCode::Char('h') => {
            let week = view.week.shift(-1);
            view.load(&mut model, week)
        }
        KeyCode::Right | KeyCode::Char(']') | KeyCode::Char('l') => {
            let week = view.week.shift(1);
            view.load(&mut model, week)
        }
        KeyCode::Char('t') => {
            let week = Week::containing(model.settings.today);
            view.load(&mut model, week)
        }
        KeyCode::Char('r') => {
            let week = view.week;
            view.load(&mut model, week)
        }
        _ => AppCommand::None,
    };
    model.view = View::Graph(view);
    (model, command)
}

pub(super) fn respond_graph(mut model: AppModel, mut view: GraphView, response: ApiResponse) -> (AppModel, AppCommand) {
    if view.pending != Some(response.request_id) {
        drop_stale(&response);
        return (model, AppCommand::None);
    }
    let ApiOutcome::Dashboard { week, result } = response.outcome else {
        view.pending = None;
        model.view = View::Graph(view);
        return (model, AppCommand::None);
    };
    view.pending = None;
    if week != view.week {
        tracing::debug!(target: "prodigyhabit::app", week = %week.label(), "dashboard for another week");
    } else {
        match result {
            Ok(rows) => {
                view.days = Some(summarize_week(&rows, week));
                view.error = None;
            }
            Err(error) => view.error = Some(error.inline("Could not load the dashboard.")),
        }
    }
    model.view = View::Graph(view);
    (model, AppCommand::None)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{navigate, update};
    use super::*;
    use crate::domain::{ChartRow, Metric, Page};
    use crate::infra::ApiError;
    use time::macros::date;

    fn graph_view(model: &AppModel) -> &GraphView {
        match &model.view {
            View::Graph(view) => view,
            other => panic!("expected graph view, got {other:?}"),
        }
    }

    fn row(date: &str, score: f64) -> ChartRow {
        ChartRow {
            date: date.to_string(),
            score: Some(score),
            ..ChartRow::default()
        }
    }

    #[test]
    fn opening_requests_current_week() {
        let (model, command) = navigate(model(true), Page::Graph);
        let (_, call) = request_of(&command);
        assert_eq!(call, ApiCall::Dashboard(Week::containing(date!(2025-07-09))));
        assert!(graph_view(&model).pending.is_some());
    }

    #[test]
    fn response_fills_the_week() {
        let (model, command) = navigate(model(true), Page::Graph);
        let (id, call) = request_of(&command);
        let ApiCall::Dashboard(week) = call else {
            panic!("expected dashboard call");
        };
        let (model, _) = respond(
            model,
            id,
            ApiOutcome::Dashboard {
                week,
                result: Ok(vec![row("2025-07-08", 80.0)]),
            },
        );
        let view = graph_view(&model);
        let days = view.days.expect("days");
        assert_eq!(days[1].value(Metric::Score), Some(80.0));
        assert_eq!(days[0].value(Metric::Score), None);
        assert!(view.pending.is_none());
    }

    #[test]
    fn navigating_weeks_drops_the_old_response() {
        let (model, command) = navigate(model(true), Page::Graph);
        let (old_id, _) = request_of(&command);
        let (model, command) = update(model, key(KeyCode::Left));
        let (new_id, call) = request_of(&command);
        let previous = Week::containing(date!(2025-07-02));
        assert_eq!(call, ApiCall::Dashboard(previous));

        let (model, _) = respond(
            model,
            old_id,
            ApiOutcome::Dashboard {
                week: Week::containing(date!(2025-07-09)),
                result: Ok(vec![row("2025-07-08", 80.0)]),
            },
        );
        assert!(graph_view(&model).days.is_none());
        assert_eq!(graph_view(&model).pending, Some(new_id));

        let (model, _) = respond(
            model,
            new_id,
            ApiOutcome::Dashboard {
                week: previous,
                result: Ok(vec![row("2025-07-01", 55.0)]),
            },
        );
        let days = graph_view(&model).days.expect("days");
        assert_eq!(days[1].value(Metric::Score), Some(55.0));
    }

    #[test]
    fn failure_is_shown_inline() {
        let (model, command) = navigate(model(true), Page::Graph);
        let (id, call) = request_of(&command);
        let ApiCall::Dashboard(week) = call else {
            panic!("expected dashboard call");
        };
        let (model, _) = respond(
            model,
            id,
            ApiOutcome::Dashboard {
                week,
                result: Err(ApiError::Transport("refused".to_string())),
            },
        );
        let error = graph_view(&model).error.clone().expect("error");
        assert_eq!(error.message, "Could not load the dashboard.");
    }
}
