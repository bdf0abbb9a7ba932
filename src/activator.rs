//! Activation function types.

/// [Activation function](https://en.wikipedia.org/wiki/Activation_function)
/// types.
///
/// A network applies one activator to every neuron of every layer.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Activator {
    /// Sigmoid function
    Sigmoid,
    /// Hyperbolic tan function
    TanH,
    /// Rectified Linear Unit
    ReLU,
    /// Leaky Rectified Linear Unit
    ///
    /// Takes an `alpha` value to use for negative inputs.
    LeakyReLU(f64),
}

impl Default for Activator {
    fn default() -> Self {
        Activator::Sigmoid
    }
}

impl Activator {
    /// Evaluates `f(x)` for the selected the activation function.
    pub fn f(&self, x: f64) -> f64 {
        match *self {
            Activator::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activator::TanH => 2.0 / (1.0 + (-2.0 * x).exp()) - 1.0,
            Activator::ReLU => {
                if x > 0.0 {
                    x
                } else {
                    0.0
                }
            }
            Activator::LeakyReLU(alpha) => {
                if x > 0.0 {
                    x
                } else {
                    alpha * x
                }
            }
        }
    }

    /// Evaluates the derivative `f'(x)` at the pre-activation `signal`.
    pub fn derivative(&self, signal: f64) -> f64 {
        match *self {
            Activator::Sigmoid => {
                let y = self.f(signal);
                y * (1.0 - y)
            }
            Activator::TanH => {
                let y = self.f(signal);
                1.0 - y * y
            }
            Activator::ReLU => {
                if signal > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activator::LeakyReLU(alpha) => {
                if signal > 0.0 {
                    1.0
                } else {
                    alpha
                }
            }
        }
    }
}
