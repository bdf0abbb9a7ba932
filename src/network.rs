//! A [Feedforward neural network]
//! (https://en.wikipedia.org/wiki/Feedforward_neural_network) built as a
//! linear stack of fully connected layers.
//!
//! # Example
//!
//! ```
//! # use parallel_backprop::{Activator, Network};
//! let mut network = Network::new(Activator::Sigmoid);
//! network.add_first_layer(2, 3).unwrap();
//! network.add_layer(1).unwrap();
//! assert_eq!(network.topology(), vec![2, 3, 1]);
//! assert_eq!(network.weight_count(), 9);
//!
//! // All weights start at zero, so every neuron outputs sigmoid(0).
//! assert_eq!(network.run(&[0.3, 0.7]).unwrap(), vec![0.5]);
//! ```

use crate::activator::Activator;
use crate::error::{Error, Result};
use crate::layer::Layer;

use rand::Rng;

/// A Feedforward neural network
#[derive(Clone, Debug)]
pub struct Network {
    activator: Activator,
    layers: Vec<Layer>,
}

/// Every weight of a network together with the shape needed to restore it.
///
/// `weights` is ordered layer-major, then input-major, then output-minor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub activator: Activator,
    pub topology: Vec<usize>,
    pub weights: Vec<f64>,
}

impl Network {
    /// Creates an empty network whose layers will all use `activator`.
    pub fn new(activator: Activator) -> Self {
        Network {
            activator,
            layers: Vec::new(),
        }
    }

    /// Creates a network with zeroed weights.
    ///
    /// Arguments:
    ///  * `activator` - the activation function to use for each neuron.
    ///  * `layer_sizes` - the number of neurons in each layer, starting with
    ///                    the input layer. Must contain at least 2 elements.
    pub fn with_topology(activator: Activator, layer_sizes: &[usize]) -> Result<Self> {
        if layer_sizes.len() < 2 {
            return Err(Error::Construction(format!(
                "a topology needs at least 2 layer sizes, got {}",
                layer_sizes.len()
            )));
        }
        let mut network = Network::new(activator);
        network.add_first_layer(layer_sizes[0], layer_sizes[1])?;
        for &size in &layer_sizes[2..] {
            network.add_layer(size)?;
        }
        Ok(network)
    }

    /// Adds the layer that receives the network input. Can only be called
    /// once.
    pub fn add_first_layer(&mut self, inputs: usize, outputs: usize) -> Result<()> {
        if !self.layers.is_empty() {
            return Err(Error::Construction(
                "the first layer has already been added".to_string(),
            ));
        }
        self.layers.push(Layer::new(self.activator, inputs, outputs)?);
        debug!("added first layer {}x{}", inputs, outputs);
        Ok(())
    }

    /// Appends a layer fed by the current last layer.
    pub fn add_layer(&mut self, outputs: usize) -> Result<()> {
        let inputs = match self.layers.last() {
            Some(last) => last.output_len(),
            None => {
                return Err(Error::Construction(
                    "add_first_layer must be called before add_layer".to_string(),
                ))
            }
        };
        self.layers.push(Layer::new(self.activator, inputs, outputs)?);
        debug!("added layer {}x{}", inputs, outputs);
        Ok(())
    }

    pub fn activator(&self) -> Activator {
        self.activator
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Returns the size of the input layer to the network.
    pub fn input_len(&self) -> Option<usize> {
        self.layers.first().map(Layer::input_len)
    }

    /// Returns the size of the output layer from the network.
    pub fn output_len(&self) -> Option<usize> {
        self.layers.last().map(Layer::output_len)
    }

    /// Returns the input width followed by every layer's output width.
    pub fn topology(&self) -> Vec<usize> {
        let mut topology = Vec::with_capacity(self.layers.len() + 1);
        if let Some(first) = self.layers.first() {
            topology.push(first.input_len());
        }
        topology.extend(self.layers.iter().map(Layer::output_len));
        topology
    }

    /// Returns the total number of weights across all layers.
    pub fn weight_count(&self) -> usize {
        self.layers.iter().map(|l| l.weights().len()).sum()
    }

    /// Draws every weight from a standard normal distribution using `rng`.
    ///
    /// Pass a seeded generator to make training runs reproducible.
    pub fn initialize_weights<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for layer in &mut self.layers {
            layer.randomize(rng);
        }
        debug!("initialized {} weights", self.weight_count());
    }

    /// Returns every weight as a flat checkpoint vector.
    pub fn weights(&self) -> Vec<f64> {
        let mut weights = Vec::with_capacity(self.weight_count());
        for layer in &self.layers {
            weights.extend(layer.weights().iter_row_major());
        }
        weights
    }

    /// Restores every weight from a flat checkpoint vector as produced by
    /// `weights`.
    pub fn set_weights(&mut self, weights: &[f64]) -> Result<()> {
        let expected = self.weight_count();
        if weights.len() != expected {
            return Err(Error::State(format!(
                "checkpoint holds {} weights but the network has {}",
                weights.len(),
                expected
            )));
        }
        let mut offset = 0;
        for layer in &mut self.layers {
            let len = layer.weights().len();
            layer.load_weights(&weights[offset..offset + len])?;
            offset += len;
        }
        debug!("restored {} weights", expected);
        Ok(())
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            activator: self.activator,
            topology: self.topology(),
            weights: self.weights(),
        }
    }

    /// Rebuilds a network from a checkpoint.
    pub fn from_checkpoint(checkpoint: &Checkpoint) -> Result<Self> {
        let mut network = Network::with_topology(checkpoint.activator, &checkpoint.topology)?;
        network.set_weights(&checkpoint.weights)?;
        Ok(network)
    }

    /// Feeds the provided `input` through the network, returning the output
    /// layer.
    ///
    /// This runs on the calling thread and leaves the training state of every
    /// layer untouched. Results are identical to a parallel forward pass.
    pub fn run(&self, input: &[f64]) -> Result<Vec<f64>> {
        let (first, rest) = match self.layers.split_first() {
            Some(split) => split,
            None => return Err(Error::State("the network has no layers".to_string())),
        };
        let mut activations = first.evaluate(input)?;
        for layer in rest {
            activations = layer.evaluate(&activations)?;
        }
        Ok(activations)
    }
}
