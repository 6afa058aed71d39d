//! Decision makers that steer one bird each.
//!
//! Every living bird's controller is asked exactly once per tick whether to
//! jump. Three kinds exist:
//!
//! - [`ManualController`]: a human; jumps arrive as input events instead
//! - [`LinearController`]: a weight vector evolved by [`crate::evolution`]
//! - [`NetworkController`]: a NEAT network built by [`crate::neat`]

use oxineat_nn::genomics::NNGenome;
use oxineat_nn::networks::FunctionApproximatorNetwork;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::bird::Bird;
use crate::pipe::Pipe;

/// Number of values in an [`Observation`]
pub const INPUT_COUNT: usize = 3;

/// What a bird sees of the pipe ahead
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    pub y: f32,
    pub dist_to_gap_top: f32,
    pub dist_to_gap_bottom: f32,
}

impl Observation {
    pub fn new(bird: &Bird, pipe: &Pipe) -> Self {
        Self {
            y: bird.y,
            dist_to_gap_top: (bird.y - pipe.gap_top).abs(),
            dist_to_gap_bottom: (bird.y - pipe.gap_bottom).abs(),
        }
    }

    pub fn to_array(&self) -> [f32; INPUT_COUNT] {
        [self.y, self.dist_to_gap_top, self.dist_to_gap_bottom]
    }

    /// Each value divided by the playfield height
    pub fn normalized(&self, height: f32) -> [f32; INPUT_COUNT] {
        self.to_array().map(|v| v / height)
    }
}

/// Decides whether a bird jumps this tick
pub trait Controller {
    fn decide(&mut self, observation: &Observation) -> bool;
}

impl<F> Controller for F
where
    F: FnMut(&Observation) -> bool,
{
    fn decide(&mut self, observation: &Observation) -> bool {
        self(observation)
    }
}

/// Placeholder for a human player.
///
/// Never jumps on its own; the manual session calls
/// [`crate::world::World::jump`] once per jump key press.
#[derive(Clone, Copy, Debug, Default)]
pub struct ManualController;

impl Controller for ManualController {
    fn decide(&mut self, _observation: &Observation) -> bool {
        false
    }
}

/// Dot product of evolved weights and normalized inputs
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearController {
    pub weights: Vec<f32>,
    pub fitness: f32,
    /// Divisor applied to every input
    pub input_scale: f32,
}

impl LinearController {
    pub fn new(weights: Vec<f32>, input_scale: f32) -> Self {
        Self {
            weights,
            fitness: 0.0,
            input_scale,
        }
    }

    /// Weights drawn uniformly from [-range, +range]
    pub fn random<R: Rng>(count: usize, range: f32, input_scale: f32, rng: &mut R) -> Self {
        let weights = (0..count).map(|_| rng.gen_range(-range..=range)).collect();
        Self::new(weights, input_scale)
    }

    /// Weighted sum of the normalized observation
    pub fn activation(&self, observation: &Observation) -> f32 {
        observation
            .normalized(self.input_scale)
            .iter()
            .zip(&self.weights)
            .map(|(x, w)| x * w)
            .sum()
    }

    /// Uniform crossover: each weight comes from either parent with equal chance
    pub fn crossover<R: Rng>(&self, other: &LinearController, rng: &mut R) -> LinearController {
        let weights = self
            .weights
            .iter()
            .zip(&other.weights)
            .map(|(&a, &b)| if rng.gen::<bool>() { a } else { b })
            .collect();
        LinearController::new(weights, self.input_scale)
    }

    /// Perturb each weight with probability `rate` by a value in [-power, +power]
    pub fn mutate<R: Rng>(&mut self, rate: f32, power: f32, rng: &mut R) -> usize {
        let mut mutated = 0;
        for w in &mut self.weights {
            if rng.gen::<f32>() < rate {
                *w += rng.gen_range(-power..=power);
                mutated += 1;
            }
        }
        mutated
    }
}

impl Controller for LinearController {
    fn decide(&mut self, observation: &Observation) -> bool {
        self.activation(observation) > 0.0
    }
}

/// Feed-forward network grown by NEAT
pub struct NetworkController {
    network: FunctionApproximatorNetwork,
    threshold: f32,
    input_scale: f32,
}

impl NetworkController {
    pub fn new(genome: &NNGenome, threshold: f32, input_scale: f32) -> Self {
        Self {
            network: FunctionApproximatorNetwork::from::<1>(genome),
            threshold,
            input_scale,
        }
    }

    /// Network inputs: a constant bias followed by the normalized observation
    pub fn inputs(&self, observation: &Observation) -> [f32; INPUT_COUNT + 1] {
        let [y, top, bottom] = observation.normalized(self.input_scale);
        [1.0, y, top, bottom]
    }
}

impl Controller for NetworkController {
    fn decide(&mut self, observation: &Observation) -> bool {
        let inputs = self.inputs(observation);
        let outputs = self.network.evaluate_at(&inputs);
        outputs.first().map_or(false, |&out| out > self.threshold)
    }
}
