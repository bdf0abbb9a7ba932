use super::LearningProcessManager;

use std::time::Duration;

/// Progress notifications sent to listeners.
///
/// Listeners run synchronously on the thread driving the training loop and
/// receive the manager, so counters such as the iteration number or the
/// running total error are read straight from it.
#[derive(Clone, Debug, PartialEq)]
pub enum LearningEvent {
    /// A pattern went through a full forward and backward pass.
    PatternProcessed,
    /// Every learning pattern has been processed once.
    IterationProcessed { elapsed: Duration },
    /// The check patterns were evaluated.
    PerformanceCalculated { performance: f64 },
    /// Training aborted with an error.
    Failed { message: String },
}

/// Receives training progress notifications.
///
/// Implementations must return promptly; training does not continue until
/// they do.
pub trait LearningListener {
    fn on_event(&mut self, event: &LearningEvent, manager: &LearningProcessManager<'_>);
}

/// Adapts a closure into a listener.
pub(crate) struct Callback<F>(pub(crate) F);

impl<F> LearningListener for Callback<F>
where
    F: FnMut(&LearningEvent, &LearningProcessManager<'_>),
{
    fn on_event(&mut self, event: &LearningEvent, manager: &LearningProcessManager<'_>) {
        (self.0)(event, manager)
    }
}
