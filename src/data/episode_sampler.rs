// ============================================================
// Layer 4 — Episode Sampler
// ============================================================
// Draws independent few-shot tasks from a dataset:
//   1. choose `way` distinct classes
//   2. choose `shot + query_num` distinct samples per class
//   3. first `shot` go to support, the rest to query
//   4. remap labels to [0, way) by class position
//
// Seeded so a validation/test run is reproducible end to end.

use anyhow::{bail, Result};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::dataset::FeatureDataset;
use crate::domain::episode::Episode;
use crate::domain::sample::FeatureSample;

pub struct EpisodeSampler {
    way:       usize,
    shot:      usize,
    query_num: usize,
    rng:       StdRng,
}

impl EpisodeSampler {
    pub fn new(way: usize, shot: usize, query_num: usize, seed: u64) -> Self {
        Self { way, shot, query_num, rng: StdRng::seed_from_u64(seed) }
    }

    /// Draw one episode. Fails when the dataset has fewer than
    /// `way` classes, or a chosen class has fewer than
    /// `shot + query_num` samples.
    pub fn sample(&mut self, dataset: &FeatureDataset) -> Result<Episode> {
        let classes = dataset.classes();
        if classes.len() < self.way {
            bail!(
                "dataset has {} classes but episodes need way={}",
                classes.len(),
                self.way,
            );
        }

        let chosen: Vec<usize> = classes
            .choose_multiple(&mut self.rng, self.way)
            .copied()
            .collect();

        let per_class = self.shot + self.query_num;
        let mut support = Vec::with_capacity(self.way * self.shot);
        let mut query = Vec::with_capacity(self.way * self.query_num);

        for (episode_label, &class) in chosen.iter().enumerate() {
            let pool = dataset.samples_of(class);
            if pool.len() < per_class {
                bail!(
                    "class {} has {} samples but episodes need shot+query={}",
                    class,
                    pool.len(),
                    per_class,
                );
            }

            let picked: Vec<usize> = pool
                .choose_multiple(&mut self.rng, per_class)
                .copied()
                .collect();

            for (i, &index) in picked.iter().enumerate() {
                let sample =
                    FeatureSample::new(episode_label, dataset.get_ref(index).features.clone());
                if i < self.shot {
                    support.push(sample);
                } else {
                    query.push(sample);
                }
            }
        }

        Ok(Episode {
            way: self.way,
            shot: self.shot,
            query_num: self.query_num,
            support,
            query,
        })
    }
}
