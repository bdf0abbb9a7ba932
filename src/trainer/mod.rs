//! Utilities for training neural networks.
//!
//! # Example
//!
//! Let's train a small network on the XOR truth table:
//!
//! ```
//! # use parallel_backprop::*;
//! # use rand::SeedableRng;
//! let examples = vec![
//!     (vec![0.0, 0.0], vec![0.0]),
//!     (vec![0.0, 1.0], vec![1.0]),
//!     (vec![1.0, 0.0], vec![1.0]),
//!     (vec![1.0, 1.0], vec![0.0]),
//! ];
//!
//! let mut network = Network::with_topology(Activator::Sigmoid, &[2, 3, 1]).unwrap();
//! network.initialize_weights(&mut rand::rngs::StdRng::seed_from_u64(42));
//!
//! let config = LearningConfig {
//!     learning_rate: 0.5,
//!     stop_conditions: vec![StopCondition::MaxIterations(100)],
//!     ..LearningConfig::default()
//! };
//! let outcome = LearningProcessManager::new(&mut network, &examples, config)
//!     .unwrap()
//!     .on_event(|event, manager| {
//!         if let LearningEvent::IterationProcessed { .. } = event {
//!             assert!(manager.total_error() >= 0.0);
//!         }
//!     })
//!     .execute()
//!     .unwrap();
//!
//! assert_eq!(outcome, Outcome::Stopped("reached 100 iterations".to_string()));
//! ```

mod config;
mod control;
mod events;
mod stop;

pub use self::config::{LearningConfig, Logging};
pub use self::control::LearningControl;
pub use self::events::{LearningEvent, LearningListener};
pub use self::stop::StopCondition;

use self::events::Callback;
use crate::error::{Error, Result};
use crate::error_function::ErrorFunction;
use crate::executor::ParallelExecutor;
use crate::network::Network;
use crate::pattern::{self, PatternSource};
use crate::process::TrainingProcess;
use crate::utils::arg_max;

use std::mem;
use std::time::{Duration, Instant};

/// Where a training run is in its lifecycle.
#[derive(Clone, Debug, PartialEq)]
pub enum LearningState {
    /// `execute` has not been called yet.
    Idle,
    /// Patterns are being processed.
    Running,
    /// A stop condition fired, with its explanation.
    Stopped(String),
    /// The run was cancelled through its `LearningControl`.
    Cancelled,
    /// The run aborted with an error.
    Failed(Error),
}

/// How a successful call to `execute` ended.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// A stop condition fired, with its explanation.
    Stopped(String),
    /// Cancellation was requested.
    Cancelled,
}

/// Runs training iterations over a pattern source until a stop condition
/// fires.
///
/// Each iteration walks the learning patterns in order, running a forward
/// and a backward pass for each one. After every iteration the check
/// patterns are optionally evaluated and the stop conditions are consulted.
pub struct LearningProcessManager<'a> {
    process: TrainingProcess<'a>,
    learning_patterns: &'a dyn PatternSource,
    check_patterns: Option<&'a dyn PatternSource>,
    stop_conditions: Vec<StopCondition>,
    listeners: Vec<Box<dyn LearningListener + 'a>>,
    error_function: ErrorFunction,
    config: LearningConfig,
    control: LearningControl,
    state: LearningState,

    iteration: usize,
    pattern_index: usize,
    pattern_elapsed: Duration,
    iteration_elapsed: Duration,
    last_iteration_error: Option<f64>,
    performance: Option<f64>,
    start_time: Option<Instant>,
}

impl<'a> LearningProcessManager<'a> {
    /// Creates a manager that trains `network` on `learning_patterns`.
    ///
    /// The stop conditions listed in `config` are registered; more can be
    /// added with `stop_condition`.
    pub fn new(
        network: &'a mut Network,
        learning_patterns: &'a dyn PatternSource,
        config: LearningConfig,
    ) -> Result<Self> {
        config.validate()?;
        let executor = ParallelExecutor::new(config.threads)?;
        let mut process = TrainingProcess::new(network, executor);
        process.set_learning_rate(config.learning_rate)?;
        process.set_momentum(config.momentum)?;
        process.set_update_weights(config.update_weights);

        Ok(LearningProcessManager {
            process,
            learning_patterns,
            check_patterns: None,
            stop_conditions: config.stop_conditions.clone(),
            listeners: Vec::new(),
            error_function: ErrorFunction::new(config.error_measure),
            config,
            control: LearningControl::new(),
            state: LearningState::Idle,
            iteration: 0,
            pattern_index: 0,
            pattern_elapsed: Duration::default(),
            iteration_elapsed: Duration::default(),
            last_iteration_error: None,
            performance: None,
            start_time: None,
        })
    }

    /// Sets the patterns used to calculate performance.
    pub fn check_patterns(mut self, patterns: &'a dyn PatternSource) -> Self {
        self.check_patterns = Some(patterns);
        self
    }

    /// Adds a condition to finish training.
    pub fn stop_condition<C>(mut self, condition: C) -> Self
    where
        C: Into<StopCondition>,
    {
        self.stop_conditions.push(condition.into());
        self
    }

    /// Adds a listener for training progress.
    pub fn listener<L>(mut self, listener: L) -> Self
    where
        L: LearningListener + 'a,
    {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Adds a closure as a listener for training progress.
    pub fn on_event<F>(self, callback: F) -> Self
    where
        F: FnMut(&LearningEvent, &LearningProcessManager<'_>) + 'a,
    {
        self.listener(Callback(callback))
    }

    /// Uses `control` instead of the manager's own handle.
    pub fn control_with(mut self, control: LearningControl) -> Self {
        self.control = control;
        self
    }

    /// Returns a handle that pauses, resumes, or cancels this run.
    pub fn control(&self) -> LearningControl {
        self.control.clone()
    }

    pub fn state(&self) -> &LearningState {
        &self.state
    }

    pub fn network(&self) -> &Network {
        self.process.network()
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    /// Returns the number of the current iteration, starting at 1. Zero
    /// before training starts.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Returns the index of the learning pattern processed last.
    pub fn pattern_index(&self) -> usize {
        self.pattern_index
    }

    /// Returns the running total error of the current iteration.
    pub fn total_error(&self) -> f64 {
        self.error_function.total_error()
    }

    /// Returns the total error of the last completed iteration.
    pub fn last_iteration_error(&self) -> Option<f64> {
        self.last_iteration_error
    }

    /// Returns how long the last pattern took to process.
    pub fn pattern_elapsed(&self) -> Duration {
        self.pattern_elapsed
    }

    /// Returns how long the last completed iteration took.
    pub fn iteration_elapsed(&self) -> Duration {
        self.iteration_elapsed
    }

    /// Returns the time since `execute` started.
    pub fn elapsed(&self) -> Duration {
        self.start_time.map(|t| t.elapsed()).unwrap_or_default()
    }

    /// Returns the fraction of check patterns classified correctly the last
    /// time performance was calculated.
    pub fn performance(&self) -> Option<f64> {
        self.performance
    }

    pub fn learning_rate(&self) -> f64 {
        self.process.learning_rate()
    }

    /// Trains until a stop condition fires or the run is cancelled.
    ///
    /// The stop conditions, and every learning and check pattern, are
    /// validated before the first weight update. Any error aborts the run,
    /// moves it to `LearningState::Failed`, and notifies the listeners.
    pub fn execute(&mut self) -> Result<Outcome> {
        if self.state != LearningState::Idle {
            return Err(Error::State(format!(
                "training can only start from the idle state, current state is {:?}",
                self.state
            )));
        }
        if let Err(e) = self
            .validate_stop_conditions()
            .and_then(|_| self.validate_patterns())
        {
            return Err(self.fail(e));
        }

        self.state = LearningState::Running;
        let start_time = Instant::now();
        self.start_time = Some(start_time);
        info!(
            "training {:?} on {} patterns with {} workers",
            self.network().topology(),
            self.learning_patterns.len(),
            self.process.executor().threads()
        );

        match self.run() {
            Ok(outcome) => {
                self.config.logging.completion(
                    self.iteration,
                    self.last_iteration_error.unwrap_or_default(),
                    start_time,
                );
                Ok(outcome)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn run(&mut self) -> Result<Outcome> {
        loop {
            self.control.wait_while_paused();
            if self.control.is_cancelled() {
                return Ok(self.cancelled());
            }

            let iteration_start = Instant::now();
            self.iteration += 1;
            self.error_function.reset();
            for index in 0..self.learning_patterns.len() {
                if self.control.is_cancelled() {
                    return Ok(self.cancelled());
                }
                self.pattern_index = index;
                self.process_pattern(index)?;
                self.notify(LearningEvent::PatternProcessed);
            }

            let training_error = self.error_function.total_error();
            self.iteration_elapsed = iteration_start.elapsed();
            self.last_iteration_error = Some(training_error);
            self.config.logging.iteration(self.iteration, training_error);
            self.notify(LearningEvent::IterationProcessed {
                elapsed: self.iteration_elapsed,
            });

            let interval = self.config.performance_interval;
            if interval > 0 && self.iteration % interval == 0 {
                if let Some(check_patterns) = self.check_patterns {
                    let performance = self.calculate_performance(check_patterns)?;
                    self.performance = Some(performance);
                    debug!("iteration {}: performance={}", self.iteration, performance);
                    self.notify(LearningEvent::PerformanceCalculated { performance });
                }
            }

            let manager: &Self = self;
            let fired = manager.stop_conditions.iter().find_map(|c| c.check(manager));
            if let Some(message) = fired {
                info!("training stopped: {}", message);
                self.state = LearningState::Stopped(message.clone());
                return Ok(Outcome::Stopped(message));
            }

            if self.config.learning_rate_decay < 1.0 {
                self.process
                    .decrease_learning_rate(self.config.learning_rate_decay)?;
            }
        }
    }

    /// Runs one forward and one backward pass for the learning pattern at
    /// `index`.
    fn process_pattern(&mut self, index: usize) -> Result<()> {
        let start = Instant::now();
        let learning_patterns = self.learning_patterns;
        let pattern = learning_patterns.pattern(index);
        let output = self.process.process_inputs(pattern.input)?;
        let errors: Vec<f64> = pattern
            .target
            .iter()
            .zip(&output)
            .map(|(target, actual)| target - actual)
            .collect();
        let error = self.error_function.error(&errors);
        self.error_function.add_error(error);
        self.process.process_errors(&errors)?;
        self.pattern_elapsed = start.elapsed();
        trace!(
            "iteration {} pattern {}: error={}",
            self.iteration,
            index,
            error
        );
        Ok(())
    }

    /// Returns the fraction of `patterns` whose largest output is at the
    /// same index as their largest target.
    fn calculate_performance(&mut self, patterns: &dyn PatternSource) -> Result<f64> {
        if patterns.is_empty() {
            return Ok(0.0);
        }
        let mut correct = 0;
        for index in 0..patterns.len() {
            let pattern = patterns.pattern(index);
            let output = self.process.process_inputs(pattern.input)?;
            if arg_max(&output) == arg_max(pattern.target) {
                correct += 1;
            }
        }
        Ok(correct as f64 / patterns.len() as f64)
    }

    fn validate_stop_conditions(&self) -> Result<()> {
        if self.stop_conditions.is_empty() {
            return Err(Error::Config(
                "at least one stop condition is required".to_string(),
            ));
        }
        self.stop_conditions.iter().try_for_each(StopCondition::validate)
    }

    fn validate_patterns(&self) -> Result<()> {
        let network = self.network();
        let (inputs, outputs) = match (network.input_len(), network.output_len()) {
            (Some(inputs), Some(outputs)) => (inputs, outputs),
            _ => return Err(Error::State("the network has no layers".to_string())),
        };
        pattern::validate(self.learning_patterns, inputs, outputs)?;
        if let Some(check_patterns) = self.check_patterns {
            pattern::validate(check_patterns, inputs, outputs)?;
        }
        Ok(())
    }

    fn cancelled(&mut self) -> Outcome {
        info!(
            "training cancelled during iteration {} after pattern {}",
            self.iteration, self.pattern_index
        );
        self.state = LearningState::Cancelled;
        Outcome::Cancelled
    }

    /// Moves the run to the failed state and notifies the listeners.
    fn fail(&mut self, error: Error) -> Error {
        warn!("training failed: {}", error);
        self.state = LearningState::Failed(error.clone());
        self.notify(LearningEvent::Failed {
            message: error.to_string(),
        });
        error
    }

    fn notify(&mut self, event: LearningEvent) {
        let mut listeners = mem::take(&mut self.listeners);
        for listener in &mut listeners {
            listener.on_event(&event, self);
        }
        self.listeners = listeners;
    }
}
