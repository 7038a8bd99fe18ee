//! Synthetic workload generation.
//!
//! Each file weight is drawn in two steps: a weight band is picked
//! uniformly, then a weight uniformly inside that band. With the default
//! bands this mixes small, medium and large files in every population.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use fairsend_core::config::{ClientsConfig, FilesConfig};
use fairsend_core::SimConfig;

/// Random client and file generator.
#[derive(Debug)]
pub struct WorkloadGenerator {
    rng: StdRng,
    clients: ClientsConfig,
    files: FilesConfig,
}

impl WorkloadGenerator {
    /// Seeded from `simulation.seed` when set, from entropy otherwise.
    pub fn from_config(config: &SimConfig) -> Self {
        let rng = match config.simulation.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            clients: config.clients.clone(),
            files: config.files.clone(),
        }
    }

    /// Number of clients in a fresh population.
    pub fn population_size(&mut self) -> u32 {
        self.rng.gen_range(self.clients.min..=self.clients.max)
    }

    /// Weights for one client's queue.
    pub fn client_weights(&mut self) -> Vec<u64> {
        let count = self.rng.gen_range(self.files.min..=self.files.max);
        (0..count).map(|_| self.file_weight()).collect()
    }

    pub fn file_weight(&mut self) -> u64 {
        let band = self.rng.gen_range(0..self.files.weight_bands.len());
        let [low, high] = self.files.weight_bands[band];
        self.rng.gen_range(low..=high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> SimConfig {
        SimConfig::scaffold(seed)
    }

    #[test]
    fn same_seed_same_workload() {
        let mut a = WorkloadGenerator::from_config(&seeded(3));
        let mut b = WorkloadGenerator::from_config(&seeded(3));

        assert_eq!(a.population_size(), b.population_size());
        for _ in 0..10 {
            assert_eq!(a.client_weights(), b.client_weights());
        }
    }

    #[test]
    fn samples_stay_in_configured_ranges() {
        let mut generator = WorkloadGenerator::from_config(&seeded(11));

        for _ in 0..200 {
            let size = generator.population_size();
            assert!((5..=8).contains(&size));

            let weights = generator.client_weights();
            assert!((3..=6).contains(&weights.len()));
            assert!(weights.iter().all(|w| (10..=100_000).contains(w)));
        }
    }

    #[test]
    fn single_point_band() {
        let mut config = seeded(1);
        config.files.weight_bands = vec![[7, 7]];
        config.files.min = 2;
        config.files.max = 2;
        let mut generator = WorkloadGenerator::from_config(&config);

        assert_eq!(generator.client_weights(), vec![7, 7]);
    }
}
