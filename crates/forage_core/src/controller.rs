//! Controller interface and the built-in policies.
//!
//! The driver owns one hidden state per agent and threads it through
//! [`Controller::forward`] every tick, so a controller itself is immutable
//! during an episode and can be shared across parallel episodes.

use crate::perception::VisualEncoding;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Maps one agent's observation to a turn action in `[-1, 1]`.
pub trait Controller {
    type Hidden: Clone;

    fn initial_hidden(&self, agent_id: usize) -> Self::Hidden;

    fn forward(
        &self,
        visual: &VisualEncoding,
        scalars: &[f64],
        hidden: Self::Hidden,
    ) -> (f64, Self::Hidden);
}

/// Always emits the same action.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConstantController {
    pub action: f64,
}

impl ConstantController {
    pub fn new(action: f64) -> Self {
        Self { action }
    }
}

impl Controller for ConstantController {
    type Hidden = ();

    fn initial_hidden(&self, _agent_id: usize) -> Self::Hidden {}

    fn forward(&self, _visual: &VisualEncoding, _scalars: &[f64], _hidden: ()) -> (f64, ()) {
        (self.action, ())
    }
}

/// Uniform random turns, seeded per agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomTurnController {
    pub seed: u64,
    /// Actions are drawn from `[-spread, spread]`.
    pub spread: f64,
}

impl RandomTurnController {
    pub fn new(seed: u64, spread: f64) -> Self {
        Self {
            seed,
            spread: spread.abs().min(1.0),
        }
    }
}

impl Controller for RandomTurnController {
    type Hidden = ChaCha8Rng;

    fn initial_hidden(&self, agent_id: usize) -> Self::Hidden {
        ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(agent_id as u64))
    }

    fn forward(
        &self,
        _visual: &VisualEncoding,
        _scalars: &[f64],
        mut hidden: ChaCha8Rng,
    ) -> (f64, ChaCha8Rng) {
        let action = if self.spread > 0.0 {
            hidden.gen_range(-self.spread..=self.spread)
        } else {
            0.0
        };
        (action, hidden)
    }
}

/// Single-layer recurrent network with `tanh` units.
///
/// The input vector is the flattened visual encoding followed by the scalar
/// inputs. Missing inputs read as zero and extra inputs are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct ElmanController {
    input_size: usize,
    hidden_size: usize,
    w_in: Vec<f64>,
    w_rec: Vec<f64>,
    b_hidden: Vec<f64>,
    w_out: Vec<f64>,
    b_out: f64,
}

impl ElmanController {
    /// Number of parameters for the given shape.
    pub fn param_count(input_size: usize, hidden_size: usize) -> usize {
        hidden_size * input_size + hidden_size * hidden_size + hidden_size + hidden_size + 1
    }

    /// Builds a network from a flat parameter vector laid out as input
    /// weights, recurrent weights, hidden biases, output weights, output bias.
    pub fn from_params(
        input_size: usize,
        hidden_size: usize,
        params: &[f64],
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(input_size > 0, "Input size must be positive");
        anyhow::ensure!(hidden_size > 0, "Hidden size must be positive");
        let expected = Self::param_count(input_size, hidden_size);
        anyhow::ensure!(
            params.len() == expected,
            "Expected {expected} parameters, got {}",
            params.len()
        );
        anyhow::ensure!(
            params.iter().all(|p| p.is_finite()),
            "Parameters must be finite"
        );

        let (w_in, rest) = params.split_at(hidden_size * input_size);
        let (w_rec, rest) = rest.split_at(hidden_size * hidden_size);
        let (b_hidden, rest) = rest.split_at(hidden_size);
        let (w_out, rest) = rest.split_at(hidden_size);

        Ok(Self {
            input_size,
            hidden_size,
            w_in: w_in.to_vec(),
            w_rec: w_rec.to_vec(),
            b_hidden: b_hidden.to_vec(),
            w_out: w_out.to_vec(),
            b_out: rest[0],
        })
    }

    /// Small random network, used when no parameter file is supplied.
    pub fn random<R: Rng>(input_size: usize, hidden_size: usize, rng: &mut R) -> anyhow::Result<Self> {
        let params: Vec<f64> = (0..Self::param_count(input_size, hidden_size))
            .map(|_| rng.gen_range(-0.5..0.5))
            .collect();
        Self::from_params(input_size, hidden_size, &params)
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }
}

impl Controller for ElmanController {
    type Hidden = Vec<f64>;

    fn initial_hidden(&self, _agent_id: usize) -> Self::Hidden {
        vec![0.0; self.hidden_size]
    }

    fn forward(
        &self,
        visual: &VisualEncoding,
        scalars: &[f64],
        hidden: Vec<f64>,
    ) -> (f64, Vec<f64>) {
        let mut inputs = vec![0.0; self.input_size];
        for (slot, &v) in inputs
            .iter_mut()
            .zip(visual.as_slice().iter().chain(scalars))
        {
            *slot = v;
        }

        let mut next = self.b_hidden.clone();
        for (h, value) in next.iter_mut().enumerate() {
            let row_in = &self.w_in[h * self.input_size..(h + 1) * self.input_size];
            *value += row_in.iter().zip(&inputs).map(|(w, x)| w * x).sum::<f64>();
            let row_rec = &self.w_rec[h * self.hidden_size..(h + 1) * self.hidden_size];
            *value += row_rec.iter().zip(&hidden).map(|(w, x)| w * x).sum::<f64>();
            *value = value.tanh();
        }

        let out = self.b_out + self.w_out.iter().zip(&next).map(|(w, x)| w * x).sum::<f64>();
        (out.tanh(), next)
    }
}
