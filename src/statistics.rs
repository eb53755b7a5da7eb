use crate::container::Container;
use crate::roaring::RoaringBitmap;
use crate::utils;

/// RoaringStatistics can be used to collect detailed statistics about the composition of a roaring bitmap
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoaringStatistics {
    /// Number of containers
    pub containers: u32,

    /// Number of array containers
    pub array_containers: u32,

    ///  Number of run containers
    pub run_containers: u32,

    /// Number of bitmap containers
    pub bitset_containers: u32,

    /// Number of values in array containers
    pub values_array_containers: u64,

    /// Number of values in run containers
    pub values_run_containers: u64,

    /// Number of values in bitmap containers
    pub values_bitset_containers: u64,

    /// Number of payload bytes in array containers
    pub bytes_array_containers: u64,

    /// Number of payload bytes in run containers
    pub bytes_run_containers: u64,

    /// Number of payload bytes in bitmap containers
    pub bytes_bitset_containers: u64,

    /// Maximal value. `None` if the bitmap is empty
    pub max_value: Option<u32>,

    /// Minimal value. `None` if the bitmap is empty
    pub min_value: Option<u32>,

    /// The sum of all values (could be used to compute average)
    pub sum_value: u64,

    /// Total number of values in the bitmap
    pub cardinality: u64
}

impl RoaringStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mean of all values in the bitmap, `None` if the bitmap is empty
    pub fn mean_value(&self) -> Option<f64> {
        if self.cardinality == 0 {
            None
        }
        else {
            Some(self.sum_value as f64 / self.cardinality as f64)
        }
    }
}

impl RoaringBitmap {
    /// Collect statistics about the containers of the bitmap
    pub fn statistics(&self) -> RoaringStatistics {
        let mut stats = RoaringStatistics {
            containers: self.containers.len() as u32,
            min_value: self.min(),
            max_value: self.max(),
            ..RoaringStatistics::default()
        };

        for (key, container) in self.keys.iter().zip(self.containers.iter()) {
            let cardinality = container.cardinality() as u64;
            let bytes = container.serialized_size() as u64;

            match container {
                Container::Array(_) => {
                    stats.array_containers += 1;
                    stats.values_array_containers += cardinality;
                    stats.bytes_array_containers += bytes;
                },
                Container::Bitset(_) => {
                    stats.bitset_containers += 1;
                    stats.values_bitset_containers += cardinality;
                    stats.bytes_bitset_containers += bytes;
                },
                Container::Run(_) => {
                    stats.run_containers += 1;
                    stats.values_run_containers += cardinality;
                    stats.bytes_run_containers += bytes;
                }
            }

            let base = u64::from(utils::join(*key, 0));
            stats.cardinality += cardinality;
            stats.sum_value += base * cardinality + low_sum(container);
        }

        stats
    }
}

/// Sum of the low 16 bits of every value in the container
fn low_sum(container: &Container) -> u64 {
    match container {
        Container::Run(c) => c.iter_runs()
            .map(|run| {
                let first = u64::from(run.value);
                let last = u64::from(run.sum());

                (first + last) * (last - first + 1) / 2
            })
            .sum(),
        c => c.iter().map(u64::from).sum()
    }
}
