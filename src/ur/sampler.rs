/*
    Walker/Vose alias method for drawing indices from a fixed
    discrete distribution.
*/

use super::xoshiro::Xoshiro256;

#[derive(Debug, Clone)]
pub struct RandomSampler {
    probs: Vec<f64>,
    aliases: Vec<usize>,
}

impl RandomSampler {
    /**
        Builds the alias table for `weights`. Weights need not sum to one
        but must be non negative with a positive total.
    */
    pub fn new(weights: &[f64]) -> Self {
        let n = weights.len();
        let total: f64 = weights.iter().sum();
        let mut scaled: Vec<f64> = weights.iter().map(|w| w * n as f64 / total).collect();

        let mut small = vec![];
        let mut large = vec![];
        for i in (0..n).rev() {
            if scaled[i] < 1.0 {
                small.push(i);
            } else {
                large.push(i);
            }
        }

        let mut probs = vec![0.0; n];
        let mut aliases = vec![0; n];
        while let (Some(&less), Some(&more)) = (small.last(), large.last()) {
            small.pop();
            large.pop();
            probs[less] = scaled[less];
            aliases[less] = more;
            scaled[more] += scaled[less] - 1.0;
            if scaled[more] < 1.0 {
                small.push(more);
            } else {
                large.push(more);
            }
        }
        //Leftovers are exactly one up to rounding
        for i in large.into_iter().chain(small) {
            probs[i] = 1.0;
        }

        Self { probs, aliases }
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    pub fn next(&self, rng: &mut Xoshiro256) -> usize {
        let r1 = rng.next_double();
        let r2 = rng.next_double();
        let i = (self.probs.len() as f64 * r1) as usize;
        if r2 < self.probs[i] {
            i
        } else {
            self.aliases[i]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wolf_samples() {
        let sampler = RandomSampler::new(&[1.0, 2.0, 4.0, 8.0]);
        let mut rng = Xoshiro256::from_seed(b"Wolf");
        let drawn: Vec<usize> = (0..20).map(|_| sampler.next(&mut rng)).collect();
        assert_eq!(drawn, vec![3, 3, 3, 3, 3, 3, 3, 0, 2, 3, 3, 3, 3, 1, 2, 2, 1, 3, 3, 2]);
    }

    #[test]
    fn single_weight_always_wins() {
        let sampler = RandomSampler::new(&[0.3]);
        let mut rng = Xoshiro256::from_seed(b"single");
        assert!((0..50).all(|_| sampler.next(&mut rng) == 0));
    }

    #[test]
    fn zero_weight_is_never_drawn() {
        let sampler = RandomSampler::new(&[1.0, 0.0, 1.0]);
        let mut rng = Xoshiro256::from_seed(b"zero");
        assert!((0..500).all(|_| sampler.next(&mut rng) != 1));
    }
}
