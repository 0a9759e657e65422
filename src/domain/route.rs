pub const PROTECTED_PREFIXES: [&str; 5] = ["/focus", "/history", "/graph", "/lounge", "/feedback"];

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Page {
    Home,
    Focus,
    Lounge,
    History,
    Graph,
    Feedback,
}

impl Page {
    pub const ALL: [Page; 6] = [
        Page::Home,
        Page::Focus,
        Page::Lounge,
        Page::History,
        Page::Graph,
        Page::Feedback,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Focus => "/focus",
            Self::Lounge => "/lounge",
            Self::History => "/history",
            Self::Graph => "/graph",
            Self::Feedback => "/feedback",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Focus => "Focus",
            Self::Lounge => "Lounge",
            Self::History => "History",
            Self::Graph => "Graph",
            Self::Feedback => "Feedback",
        }
    }

    /// Accepts a bare page name (`focus`) or a path (`/focus`).
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        let name = name.strip_prefix('/').unwrap_or(name);
        match name.to_ascii_lowercase().as_str() {
            "" | "home" => Some(Self::Home),
            "focus" => Some(Self::Focus),
            "lounge" => Some(Self::Lounge),
            "history" => Some(Self::History),
            "graph" => Some(Self::Graph),
            "feedback" => Some(Self::Feedback),
            _ => None,
        }
    }

    fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            return Some(Self::Home);
        }
        Self::ALL
            .into_iter()
            .find(|page| *page != Self::Home && page.path() == trimmed)
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|page| *page == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let index = Self::ALL.iter().position(|page| *page == self).unwrap_or(0);
        Self::ALL[(index + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

pub fn is_protected_path(path: &str) -> bool {
    PROTECTED_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RouteDecision {
    Render(Page),
    Redirect { to: Page, login_required: bool },
    NotFound,
}

pub fn resolve_route(path: &str, has_session: bool) -> RouteDecision {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    if is_protected_path(path) && !has_session {
        return RouteDecision::Redirect {
            to: Page::Home,
            login_required: true,
        };
    }
    match Page::from_path(path) {
        Some(page) => RouteDecision::Render(page),
        None => RouteDecision::NotFound,
    }
}
