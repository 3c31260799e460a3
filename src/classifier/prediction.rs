use crate::common::EmotionSet;

/// Predicted probability of every emotion for every trial.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    emotions: EmotionSet,
    probs: Vec<f64>,
}

impl Prediction {
    pub(crate) fn new(emotions: EmotionSet, probs: Vec<f64>) -> Self {
        debug_assert_eq!(0, probs.len() % emotions.len());
        Prediction { emotions, probs }
    }

    pub fn emotions(&self) -> &EmotionSet {
        &self.emotions
    }

    pub fn n_trials(&self) -> usize {
        self.probs.len() / self.emotions.len()
    }

    pub fn n_emotions(&self) -> usize {
        self.emotions.len()
    }

    pub fn row(&self, trial: usize) -> &[f64] {
        let width = self.emotions.len();
        &self.probs[trial * width..(trial + 1) * width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.probs.chunks(self.emotions.len())
    }

    /// Probabilities of one emotion across all trials.
    pub fn column(&self, emotion: usize) -> Vec<f64> {
        self.rows().map(|row| row[emotion]).collect()
    }

    /// Index of the most probable emotion for a trial; the first one on ties.
    pub fn argmax(&self, trial: usize) -> usize {
        let row = self.row(trial);
        let mut best = 0;
        for (i, &p) in row.iter().enumerate() {
            if p > row[best] {
                best = i;
            }
        }
        best
    }
}
