use crate::activator::Activator;
use crate::error::{Error, Result};
use crate::executor::ParallelExecutor;
use crate::matrix::Mat;
use crate::utils::ZeroOut;

use itertools::izip;
use rand::Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;

/// Parameters of a single gradient descent step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Backprop {
    /// Scale applied to every weight change.
    pub learning_rate: f64,
    /// Fraction of the previous weight change added to the next one.
    pub momentum: f64,
    /// When false, errors are computed but weights are left untouched.
    pub update_weights: bool,
}

/// Where a layer is within the forward/backward cycle of one pattern.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Forwarded,
    Backpropagated,
}

/// A fully connected layer of a neural network
///
/// The weights for every neuron are stored as a single column of one matrix,
/// and every neuron owns its column, its slot in the scratch vectors, and its
/// column of the delta matrix. Forward and backward passes run one task per
/// neuron and those tasks never touch each other's data.
#[derive(Clone, Debug)]
pub struct Layer {
    /// The activation function to be used for every neuron in the layer.
    activator: Activator,
    /// The network weights, with each neuron's weights stored as a column.
    weights: Mat,
    /// The weight change applied to each weight by the last backward pass.
    deltas: Mat,
    input: Vec<f64>,
    signal: Vec<f64>,
    output: Vec<f64>,
    error: Vec<f64>,
    phase: Phase,
}

impl Layer {
    /// Initializes a new layer with all weights set to zero.
    ///
    /// Arguments:
    ///
    ///  * `activator` - the activation function to be used for this layer's
    ///                  output.
    ///  * `inputs` - the number of inputs to this layer.
    ///  * `outputs` - the number of outputs from this layer.
    pub fn new(activator: Activator, inputs: usize, outputs: usize) -> Result<Self> {
        if inputs == 0 || outputs == 0 {
            return Err(Error::Construction(format!(
                "layer widths must be positive, got {} inputs and {} outputs",
                inputs, outputs
            )));
        }
        Ok(Layer {
            activator,
            weights: Mat::zeros(inputs, outputs),
            deltas: Mat::zeros(inputs, outputs),
            input: vec![0.0; inputs],
            signal: vec![0.0; outputs],
            output: vec![0.0; outputs],
            error: vec![0.0; outputs],
            phase: Phase::Idle,
        })
    }

    /// Returns the number of inputs to this layer.
    pub fn input_len(&self) -> usize {
        self.weights.rows()
    }

    /// Returns the number of outputs from this layer.
    pub fn output_len(&self) -> usize {
        self.weights.cols()
    }

    pub fn activator(&self) -> Activator {
        self.activator
    }

    pub fn weights(&self) -> &Mat {
        &self.weights
    }

    /// The weight change recorded for every weight by the last backward pass.
    pub fn deltas(&self) -> &Mat {
        &self.deltas
    }

    /// Pre-activation sums from the last forward pass.
    pub fn signal(&self) -> &[f64] {
        &self.signal
    }

    /// Activated outputs from the last forward pass.
    pub fn output(&self) -> &[f64] {
        &self.output
    }

    /// Per-neuron errors from the last backward pass.
    pub fn error(&self) -> &[f64] {
        &self.error
    }

    /// Redraws every weight from a standard normal distribution.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.weights = Mat::random(&StandardNormal, rng, self.input_len(), self.output_len());
        self.reset();
    }

    /// Replaces the weights from a row-major slice of `input_len() *
    /// output_len()` values.
    pub(crate) fn load_weights(&mut self, weights: &[f64]) -> Result<()> {
        self.weights.copy_from_row_major(weights)?;
        self.reset();
        Ok(())
    }

    /// Clears recorded deltas and forgets the last forward pass.
    pub(crate) fn reset(&mut self) {
        self.deltas.zero_out();
        self.invalidate();
    }

    /// Forgets the last forward pass, so no backward pass can run on it.
    pub(crate) fn invalidate(&mut self) {
        self.phase = Phase::Idle;
    }

    /// Computes this layer's outputs for `input` without touching any layer
    /// state.
    pub fn evaluate(&self, input: &[f64]) -> Result<Vec<f64>> {
        self.check_input(input)?;
        Ok((0..self.output_len())
            .map(|o| self.activator.f(weighted_sum(input, self.weights.column(o))))
            .collect())
    }

    /// Feeds `input` forward through the layer, one task per neuron.
    pub fn forward(&mut self, input: &[f64], executor: &ParallelExecutor) -> Result<()> {
        self.check_input(input)?;
        self.input.copy_from_slice(input);
        self.invalidate();

        let activator = self.activator;
        let input = &self.input;
        executor.for_each_neuron(
            (
                self.weights.par_columns(),
                self.signal.par_iter_mut(),
                self.output.par_iter_mut(),
            ),
            |neuron, (column, signal, output)| {
                let sum = weighted_sum(input, column);
                if !sum.is_finite() {
                    return Err(Error::Runtime(format!(
                        "neuron {} produced a non-finite signal",
                        neuron
                    )));
                }
                *signal = sum;
                *output = activator.f(sum);
                Ok(())
            },
        )?;
        self.phase = Phase::Forwarded;
        Ok(())
    }

    /// Feeds the output `target_errors` (target minus output) back through an
    /// output layer, updating its weights.
    pub fn backward_output(
        &mut self,
        target_errors: &[f64],
        params: &Backprop,
        executor: &ParallelExecutor,
    ) -> Result<()> {
        self.check_forwarded()?;
        if target_errors.len() != self.output_len() {
            return Err(Error::Data(format!(
                "expected {} output errors, got {}",
                self.output_len(),
                target_errors.len()
            )));
        }

        let activator = self.activator;
        let input = &self.input;
        executor.for_each_neuron(
            (
                self.weights.par_columns_mut(),
                self.deltas.par_columns_mut(),
                self.error.par_iter_mut(),
                self.signal.par_iter(),
                target_errors.par_iter(),
            ),
            |_, (column, deltas, error, &signal, &target_error)| {
                *error = target_error * activator.derivative(signal);
                if params.update_weights {
                    update_column(column, deltas, input, *error, params);
                }
                Ok(())
            },
        )?;
        self.phase = Phase::Backpropagated;
        Ok(())
    }

    /// Propagates the errors of `downstream`, the layer fed by this one, back
    /// into this layer, updating its weights.
    ///
    /// Must run after `downstream` has finished its own backward pass.
    pub fn backward_hidden(
        &mut self,
        downstream: &Layer,
        params: &Backprop,
        executor: &ParallelExecutor,
    ) -> Result<()> {
        self.check_forwarded()?;
        if downstream.phase != Phase::Backpropagated {
            return Err(Error::State(
                "downstream layer has not been backpropagated".to_string(),
            ));
        }
        if downstream.input_len() != self.output_len() {
            return Err(Error::Construction(format!(
                "downstream layer takes {} inputs but this layer has {} outputs",
                downstream.input_len(),
                self.output_len()
            )));
        }

        let activator = self.activator;
        let input = &self.input;
        let downstream_error = &downstream.error;
        let downstream_weights = &downstream.weights;
        executor.for_each_neuron(
            (
                self.weights.par_columns_mut(),
                self.deltas.par_columns_mut(),
                self.error.par_iter_mut(),
                self.signal.par_iter(),
            ),
            |neuron, (column, deltas, error, &signal)| {
                let weighted_error: f64 = downstream_error
                    .iter()
                    .enumerate()
                    .map(|(k, e)| e * downstream_weights.get(neuron, k))
                    .sum();
                *error = weighted_error * activator.derivative(signal);
                if params.update_weights {
                    update_column(column, deltas, input, *error, params);
                }
                Ok(())
            },
        )?;
        self.phase = Phase::Backpropagated;
        Ok(())
    }

    fn check_input(&self, input: &[f64]) -> Result<()> {
        if input.len() != self.input_len() {
            return Err(Error::Data(format!(
                "expected {} inputs, got {}",
                self.input_len(),
                input.len()
            )));
        }
        Ok(())
    }

    pub(crate) fn check_forwarded(&self) -> Result<()> {
        match self.phase {
            Phase::Forwarded => Ok(()),
            Phase::Idle => Err(Error::State(
                "backward pass requested before a forward pass".to_string(),
            )),
            Phase::Backpropagated => Err(Error::State(
                "layer was already backpropagated for this pattern".to_string(),
            )),
        }
    }
}

/// Sums `input[i] * column[i]` in input order.
#[inline]
fn weighted_sum(input: &[f64], column: &[f64]) -> f64 {
    input.iter().zip(column).map(|(x, w)| x * w).sum()
}

/// Applies the gradient descent rule to the weights of one neuron.
fn update_column(column: &mut [f64], deltas: &mut [f64], input: &[f64], error: f64, params: &Backprop) {
    for (weight, delta, x) in izip!(column.iter_mut(), deltas.iter_mut(), input) {
        let mut change = params.learning_rate * error * x;
        if params.momentum != 0.0 {
            change += params.momentum * *delta;
        }
        *weight += change;
        *delta = change;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const STEP: Backprop = Backprop {
        learning_rate: 0.5,
        momentum: 0.0,
        update_weights: true,
    };

    fn executor() -> ParallelExecutor {
        ParallelExecutor::new(2).unwrap()
    }

    fn layer(inputs: usize, outputs: usize, weights: &[f64]) -> Layer {
        let mut layer = Layer::new(Activator::Sigmoid, inputs, outputs).unwrap();
        layer.load_weights(weights).unwrap();
        layer
    }

    #[test]
    fn zero_width() {
        assert!(matches!(
            Layer::new(Activator::Sigmoid, 0, 1),
            Err(Error::Construction(_))
        ));
        assert!(matches!(
            Layer::new(Activator::Sigmoid, 3, 0),
            Err(Error::Construction(_))
        ));
    }

    #[test]
    fn zero_weights_forward() {
        let mut layer = Layer::new(Activator::Sigmoid, 2, 3).unwrap();
        layer.forward(&[4.0, -7.0], &executor()).unwrap();
        assert_eq!(layer.signal(), &[0.0, 0.0, 0.0]);
        assert_eq!(layer.output(), &[0.5, 0.5, 0.5]);
    }

    #[test]
    fn forward_sums_columns() {
        // w[0][0]=1, w[0][1]=2, w[1][0]=3, w[1][1]=4
        let mut layer = layer(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        layer.forward(&[1.0, 0.5], &executor()).unwrap();
        assert_eq!(layer.signal(), &[2.5, 4.0]);
        assert_eq!(layer.output()[0], Activator::Sigmoid.f(2.5));
        assert_eq!(layer.evaluate(&[1.0, 0.5]).unwrap(), layer.output().to_vec());
    }

    #[test]
    fn wrong_input_len() {
        let mut layer = Layer::new(Activator::Sigmoid, 2, 1).unwrap();
        assert!(matches!(
            layer.forward(&[1.0], &executor()),
            Err(Error::Data(_))
        ));
    }

    #[test]
    fn backward_before_forward() {
        let mut layer = Layer::new(Activator::Sigmoid, 2, 1).unwrap();
        assert!(matches!(
            layer.backward_output(&[1.0], &STEP, &executor()),
            Err(Error::State(_))
        ));
    }

    #[test]
    fn backward_twice() {
        let executor = executor();
        let mut layer = Layer::new(Activator::Sigmoid, 2, 1).unwrap();
        layer.forward(&[1.0, 1.0], &executor).unwrap();
        layer.backward_output(&[1.0], &STEP, &executor).unwrap();
        assert!(matches!(
            layer.backward_output(&[1.0], &STEP, &executor),
            Err(Error::State(_))
        ));
    }

    #[test]
    fn output_update_rule() {
        let executor = executor();
        let mut layer = Layer::new(Activator::Sigmoid, 2, 1).unwrap();
        layer.forward(&[1.0, 0.0], &executor).unwrap();
        layer.backward_output(&[0.8], &STEP, &executor).unwrap();
        // error = 0.8 * sigmoid'(0) = 0.2
        assert_abs_diff_eq!(layer.error()[0], 0.2, epsilon = 1e-15);
        assert_abs_diff_eq!(layer.weights().get(0, 0), 0.1, epsilon = 1e-15);
        assert_eq!(layer.weights().get(1, 0), 0.0);
        assert_abs_diff_eq!(layer.deltas().get(0, 0), 0.1, epsilon = 1e-15);
    }

    #[test]
    fn frozen_weights() {
        let executor = executor();
        let mut layer = layer(2, 2, &[0.1, 0.2, 0.3, 0.4]);
        let before = layer.weights().clone();
        layer.forward(&[1.0, 1.0], &executor).unwrap();
        let params = Backprop {
            update_weights: false,
            ..STEP
        };
        layer.backward_output(&[1.0, -1.0], &params, &executor).unwrap();
        assert_eq!(layer.weights(), &before);
        assert!(layer.error().iter().all(|&e| e != 0.0));
    }

    #[test]
    fn hidden_uses_downstream_column() {
        let executor = executor();
        let mut hidden = Layer::new(Activator::Sigmoid, 1, 2).unwrap();
        // downstream w[0][0]=2, w[1][0]=-4
        let mut out = layer(2, 1, &[2.0, -4.0]);

        hidden.forward(&[1.0], &executor).unwrap();
        assert!(matches!(
            hidden.backward_hidden(&out, &STEP, &executor),
            Err(Error::State(_))
        ));

        let frozen = Backprop {
            update_weights: false,
            ..STEP
        };
        out.forward(hidden.output(), &executor).unwrap();
        out.backward_output(&[1.0], &frozen, &executor).unwrap();
        hidden.backward_hidden(&out, &frozen, &executor).unwrap();

        let e = out.error()[0];
        assert_abs_diff_eq!(hidden.error()[0], e * 2.0 * 0.25, epsilon = 1e-15);
        assert_abs_diff_eq!(hidden.error()[1], e * -4.0 * 0.25, epsilon = 1e-15);
    }

    #[test]
    fn momentum_reuses_last_delta() {
        let executor = executor();
        let params = Backprop {
            learning_rate: 0.5,
            momentum: 0.5,
            update_weights: true,
        };
        let mut layer = Layer::new(Activator::Sigmoid, 1, 1).unwrap();
        layer.forward(&[1.0], &executor).unwrap();
        layer.backward_output(&[0.8], &params, &executor).unwrap();
        let first = layer.deltas().get(0, 0);
        assert_abs_diff_eq!(first, 0.1, epsilon = 1e-15);

        layer.forward(&[1.0], &executor).unwrap();
        layer.backward_output(&[0.8], &params, &executor).unwrap();
        let error = layer.error()[0];
        assert_abs_diff_eq!(
            layer.deltas().get(0, 0),
            0.5 * error + 0.5 * first,
            epsilon = 1e-15
        );
    }
}
