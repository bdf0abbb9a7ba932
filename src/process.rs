//! Parallel forward and backward passes over a whole network.
//!
//! Layers are processed strictly one after another. Inside a layer every
//! neuron is an independent task on the worker pool, and the pool is joined
//! before the next layer starts. A neuron task only writes to its own weight
//! column and its own slot of the layer's scratch vectors, so the passes need
//! no locks.

use crate::error::{Error, Result};
use crate::executor::ParallelExecutor;
use crate::layer::Backprop;
use crate::network::Network;

/// Drives single training steps through a borrowed network.
///
/// A training step is one `process_inputs` call followed by one
/// `process_errors` call for the same pattern.
#[derive(Debug)]
pub struct TrainingProcess<'n> {
    network: &'n mut Network,
    executor: ParallelExecutor,
    learning_rate: f64,
    momentum: f64,
    update_weights: bool,
}

impl<'n> TrainingProcess<'n> {
    /// Creates a process with a learning rate of 0.1, no momentum, and weight
    /// updates enabled.
    pub fn new(network: &'n mut Network, executor: ParallelExecutor) -> Self {
        TrainingProcess {
            network,
            executor,
            learning_rate: 0.1,
            momentum: 0.0,
            update_weights: true,
        }
    }

    pub fn network(&self) -> &Network {
        &*self.network
    }

    pub fn executor(&self) -> &ParallelExecutor {
        &self.executor
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Sets the learning rate, which must lie in `(0, 1]`.
    pub fn set_learning_rate(&mut self, rate: f64) -> Result<()> {
        if !(rate > 0.0 && rate <= 1.0) {
            return Err(Error::Config(format!(
                "learning rate must be in (0, 1], got {}",
                rate
            )));
        }
        self.learning_rate = rate;
        Ok(())
    }

    /// Multiplies the learning rate by `factor`, which must lie in `(0, 1]`.
    pub fn decrease_learning_rate(&mut self, factor: f64) -> Result<()> {
        if !(factor > 0.0 && factor <= 1.0) {
            return Err(Error::Config(format!(
                "learning rate decay must be in (0, 1], got {}",
                factor
            )));
        }
        self.learning_rate *= factor;
        Ok(())
    }

    pub fn momentum(&self) -> f64 {
        self.momentum
    }

    /// Sets the momentum term, which must lie in `[0, 1)`. Zero disables it.
    pub fn set_momentum(&mut self, momentum: f64) -> Result<()> {
        if !(0.0..1.0).contains(&momentum) {
            return Err(Error::Config(format!(
                "momentum must be in [0, 1), got {}",
                momentum
            )));
        }
        self.momentum = momentum;
        Ok(())
    }

    pub fn update_weights(&self) -> bool {
        self.update_weights
    }

    pub fn set_update_weights(&mut self, update_weights: bool) {
        self.update_weights = update_weights;
    }

    /// Feeds `input` forward through every layer and returns the output of
    /// the last one.
    pub fn process_inputs(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        let executor = &self.executor;
        let layers = self.network.layers_mut();
        if layers.is_empty() {
            return Err(Error::State("the network has no layers".to_string()));
        }
        for layer in layers.iter_mut() {
            layer.invalidate();
        }
        if input.len() != layers[0].input_len() {
            return Err(Error::Data(format!(
                "pattern has {} inputs, the network expects {}",
                input.len(),
                layers[0].input_len()
            )));
        }

        layers[0].forward(input, executor)?;
        for i in 1..layers.len() {
            let (done, rest) = layers.split_at_mut(i);
            rest[0].forward(done[i - 1].output(), executor)?;
        }
        Ok(layers[layers.len() - 1].output().to_vec())
    }

    /// Feeds `target_errors` (target minus output for the pattern last passed
    /// to `process_inputs`) back through the network, updating weights when
    /// enabled.
    pub fn process_errors(&mut self, target_errors: &[f64]) -> Result<()> {
        let params = Backprop {
            learning_rate: self.learning_rate,
            momentum: self.momentum,
            update_weights: self.update_weights,
        };
        let executor = &self.executor;
        let layers = self.network.layers_mut();
        let last = match layers.len() {
            0 => return Err(Error::State("the network has no layers".to_string())),
            n => n - 1,
        };
        // Every layer must hold a completed forward pass before any weight changes.
        for layer in layers.iter() {
            layer.check_forwarded()?;
        }

        layers[last].backward_output(target_errors, &params, executor)?;
        for i in (0..last).rev() {
            let (head, tail) = layers.split_at_mut(i + 1);
            head[i].backward_hidden(&tail[0], &params, executor)?;
        }
        trace!("backpropagated through {} layers", last + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activator::Activator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn network(topology: &[usize], seed: u64) -> Network {
        let mut network = Network::with_topology(Activator::Sigmoid, topology).unwrap();
        network.initialize_weights(&mut StdRng::seed_from_u64(seed));
        network
    }

    fn process(network: &mut Network, threads: usize) -> TrainingProcess<'_> {
        TrainingProcess::new(network, ParallelExecutor::new(threads).unwrap())
    }

    #[test]
    fn zero_weights() {
        let mut network = Network::with_topology(Activator::Sigmoid, &[2, 1]).unwrap();
        let mut process = process(&mut network, 2);
        for &(x, y) in &[(0.0, 0.0), (3.0, -1.0), (-8.0, 0.5)] {
            assert_eq!(process.process_inputs(&[x, y]).unwrap(), vec![0.5]);
        }
    }

    #[test]
    fn matches_sequential_run() {
        let mut network = network(&[4, 6, 3, 2], 3);
        let expected = network.run(&[0.1, -0.2, 0.7, 1.5]).unwrap();
        let mut process = process(&mut network, 3);
        assert_eq!(
            process.process_inputs(&[0.1, -0.2, 0.7, 1.5]).unwrap(),
            expected
        );
    }

    #[test]
    fn independent_of_pool_size() {
        let input = [0.3, -1.2, 0.8];
        let errors = [0.4, -0.1];
        let mut results = Vec::new();
        for &threads in &[1, 2, 8] {
            let mut network = network(&[3, 16, 9, 2], 21);
            let mut process = process(&mut network, threads);
            let output = process.process_inputs(&input).unwrap();
            process.process_errors(&errors).unwrap();
            let output_after = process.process_inputs(&input).unwrap();
            results.push((output, output_after, network.weights()));
        }
        assert_eq!(results[0], results[1]);
        assert_eq!(results[0], results[2]);
    }

    #[test]
    fn updates_last_layer() {
        let mut network = network(&[2, 3, 2], 8);
        let before = network.weights();
        let mut process = process(&mut network, 2);
        process.process_inputs(&[1.0, 0.5]).unwrap();
        process.process_errors(&[0.3, -0.6]).unwrap();

        let last = network.layers().len() - 1;
        let offset = network.weight_count() - network.layers()[last].weights().len();
        let after = network.weights();
        assert!(after[offset..]
            .iter()
            .zip(&before[offset..])
            .any(|(a, b)| a != b));
    }

    #[test]
    fn frozen_weights() {
        let mut network = network(&[2, 3, 2], 8);
        let before = network.weights();
        let mut process = process(&mut network, 2);
        process.set_update_weights(false);
        process.process_inputs(&[1.0, 0.5]).unwrap();
        process.process_errors(&[0.3, -0.6]).unwrap();
        assert!(network.layers()[0].error().iter().any(|&e| e != 0.0));
        assert_eq!(network.weights(), before);
    }

    #[test]
    fn errors_before_inputs() {
        let mut network = network(&[2, 2, 1], 1);
        let mut process = process(&mut network, 1);
        assert!(matches!(
            process.process_errors(&[0.5]),
            Err(Error::State(_))
        ));
    }

    #[test]
    fn data_errors_leave_network_untouched() {
        let mut network = network(&[2, 2, 1], 1);
        let before = network.weights();
        let mut process = process(&mut network, 1);
        assert!(matches!(
            process.process_inputs(&[1.0, 2.0, 3.0]),
            Err(Error::Data(_))
        ));
        process.process_inputs(&[1.0, 2.0]).unwrap();
        assert!(matches!(
            process.process_errors(&[0.5, 0.5]),
            Err(Error::Data(_))
        ));
        assert_eq!(network.weights(), before);
    }

    #[test]
    fn failed_forward_blocks_backward() {
        let mut network = Network::with_topology(Activator::Sigmoid, &[1, 2, 2, 1]).unwrap();
        network
            .set_weights(&[1.0, 1.0, 1e308, 1e308, 1e308, 1e308, 0.3, 0.4])
            .unwrap();
        let mut process = process(&mut network, 2);
        process.process_inputs(&[-50.0]).unwrap();
        assert!(matches!(
            process.process_inputs(&[50.0]),
            Err(Error::Runtime(_))
        ));
        let before = process.network().weights();
        assert!(matches!(
            process.process_errors(&[0.5]),
            Err(Error::State(_))
        ));
        assert_eq!(network.weights(), before);
    }

    #[test]
    fn empty_network() {
        let mut network = Network::new(Activator::Sigmoid);
        let mut process = process(&mut network, 1);
        assert!(matches!(process.process_inputs(&[1.0]), Err(Error::State(_))));
    }

    #[test]
    fn non_finite_signal() {
        let mut network = network(&[2, 1], 4);
        let mut process = process(&mut network, 2);
        assert!(matches!(
            process.process_inputs(&[f64::NAN, 1.0]),
            Err(Error::Runtime(_))
        ));
    }

    #[test]
    fn learning_rate_range() {
        let mut network = network(&[2, 1], 4);
        let mut process = process(&mut network, 1);
        assert!(process.set_learning_rate(0.0).is_err());
        assert!(process.set_learning_rate(1.5).is_err());
        process.set_learning_rate(1.0).unwrap();
        process.decrease_learning_rate(0.5).unwrap();
        assert_eq!(process.learning_rate(), 0.5);
        assert!(process.decrease_learning_rate(0.0).is_err());
        assert!(process.set_momentum(1.0).is_err());
        process.set_momentum(0.9).unwrap();
        assert_eq!(process.momentum(), 0.9);
    }
}
