//! Rule table mapping the current mood and focus onto a task recommendation.

use std::fmt::Display;

use serde::Serialize;

use crate::monitor::session::entities::Mood;

/// Below this focus a break is recommended regardless of mood.
pub const LOW_FOCUS: f64 = 0.3;
/// A happy mood above this focus is considered good for deep work.
pub const DEEP_WORK_FOCUS: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Suggestion {
    TakeBreak,
    CreativeTask,
    DeepWork,
    SteadyProgress,
}

impl Suggestion {
    pub fn message(&self) -> &'static str {
        match self {
            Suggestion::TakeBreak => "Take a 5-min break, stretch and relax.",
            Suggestion::CreativeTask => "Do an easy/creative task to lift mood.",
            Suggestion::DeepWork => "Great time for deep work (Pomodoro 25m).",
            Suggestion::SteadyProgress => "Continue with medium tasks and stay consistent.",
        }
    }
}

impl Display for Suggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Branch order is the tie-break: low focus wins over any mood, sadness wins over a happy
/// high-focus state. Boundaries are exclusive so 0.3 isn't low and 0.6 isn't deep work.
pub fn suggest(mood: Mood, focus: f64) -> Suggestion {
    if focus < LOW_FOCUS {
        return Suggestion::TakeBreak;
    }
    if mood == Mood::Sad {
        return Suggestion::CreativeTask;
    }
    if mood == Mood::Happy && focus > DEEP_WORK_FOCUS {
        return Suggestion::DeepWork;
    }
    Suggestion::SteadyProgress
}
