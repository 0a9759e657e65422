//! Navigation state of the focus page.
//!
//! Every transition returns whether it applied. A transition requested from
//! a stage that does not allow it leaves the flow untouched.

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionType {
    Focus,
    Break,
}

impl SessionType {
    pub fn toggled(self) -> Self {
        match self {
            Self::Focus => Self::Break,
            Self::Break => Self::Focus,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Focus => "Focus",
            Self::Break => "Break",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PomodoroStep {
    Settings,
    Timer,
}

/// The AI's first message when a chat opens after a quick submission.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InitialAi {
    pub message: String,
    pub score: Option<u32>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HubChoice {
    Pomodoro,
    QuickInput,
    Chat,
}

impl HubChoice {
    pub const ALL: [HubChoice; 3] = [HubChoice::Pomodoro, HubChoice::QuickInput, HubChoice::Chat];

    pub fn label(self) -> &'static str {
        match self {
            Self::Pomodoro => "Pomodoro timer",
            Self::QuickInput => "Quick input",
            Self::Chat => "Chat with AI",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Pomodoro => "Run a focus timer, then reflect with the AI",
            Self::QuickInput => "Log a finished task and get a score",
            Self::Chat => "Tell the AI what you worked on",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FocusStage {
    Hub,
    Pomodoro {
        session_type: SessionType,
        step: PomodoroStep,
    },
    QuickInput,
    ChatManual {
        initial: Option<InitialAi>,
    },
    ChatPostPomodoro {
        completed_minutes: u32,
    },
}

impl FocusStage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hub => "hub",
            Self::Pomodoro { .. } => "pomodoro",
            Self::QuickInput => "quick_input",
            Self::ChatManual { .. } => "chat_manual",
            Self::ChatPostPomodoro { .. } => "chat_post_pomodoro",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FocusFlow {
    stage: FocusStage,
    timer_generation: u64,
}

impl Default for FocusFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusFlow {
    pub fn new() -> Self {
        Self {
            stage: FocusStage::Hub,
            timer_generation: 0,
        }
    }

    pub fn stage(&self) -> &FocusStage {
        &self.stage
    }

    /// Bumped whenever the countdown must restart from a fresh timer.
    pub fn timer_generation(&self) -> u64 {
        self.timer_generation
    }

    /// The running session, when the timer step is showing.
    pub fn active_session(&self) -> Option<SessionType> {
        match self.stage {
            FocusStage::Pomodoro {
                session_type,
                step: PomodoroStep::Timer,
            } => Some(session_type),
            _ => None,
        }
    }

    pub fn select(&mut self, choice: HubChoice) -> bool {
        if self.stage != FocusStage::Hub {
            return false;
        }
        self.stage = match choice {
            HubChoice::Pomodoro => FocusStage::Pomodoro {
                session_type: SessionType::Focus,
                step: PomodoroStep::Settings,
            },
            HubChoice::QuickInput => FocusStage::QuickInput,
            HubChoice::Chat => FocusStage::ChatManual { initial: None },
        };
        true
    }

    /// Leaves the settings step for a fresh timer.
    pub fn start_session(&mut self) -> bool {
        let FocusStage::Pomodoro {
            session_type,
            step: PomodoroStep::Settings,
        } = self.stage
        else {
            return false;
        };
        self.stage = FocusStage::Pomodoro {
            session_type,
            step: PomodoroStep::Timer,
        };
        self.timer_generation += 1;
        true
    }

    /// A focus session leads into the reflection chat; a break returns to
    /// settings for the next focus session.
    pub fn session_finished(&mut self, credited_minutes: u32) -> bool {
        match self.active_session() {
            Some(SessionType::Focus) => {
                self.stage = FocusStage::ChatPostPomodoro {
                    completed_minutes: credited_minutes,
                };
                true
            }
            Some(SessionType::Break) => {
                self.stage = FocusStage::Pomodoro {
                    session_type: SessionType::Focus,
                    step: PomodoroStep::Settings,
                };
                true
            }
            None => false,
        }
    }

    pub fn start_break(&mut self) -> bool {
        if !matches!(self.stage, FocusStage::ChatPostPomodoro { .. }) {
            return false;
        }
        self.stage = FocusStage::Pomodoro {
            session_type: SessionType::Break,
            step: PomodoroStep::Timer,
        };
        self.timer_generation += 1;
        true
    }

    pub fn switch_session_type(&mut self) -> bool {
        let Some(session_type) = self.active_session() else {
            return false;
        };
        self.stage = FocusStage::Pomodoro {
            session_type: session_type.toggled(),
            step: PomodoroStep::Timer,
        };
        self.timer_generation += 1;
        true
    }

    pub fn quick_input_submitted(&mut self, initial: InitialAi) -> bool {
        if self.stage != FocusStage::QuickInput {
            return false;
        }
        self.stage = FocusStage::ChatManual {
            initial: Some(initial),
        };
        true
    }

    pub fn quick_input_skipped(&mut self) -> bool {
        if self.stage != FocusStage::QuickInput {
            return false;
        }
        self.stage = FocusStage::ChatManual { initial: None };
        true
    }

    pub fn back_to_hub(&mut self) -> bool {
        if self.stage == FocusStage::Hub {
            return false;
        }
        self.stage = FocusStage::Hub;
        true
    }
}
