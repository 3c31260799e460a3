use std::collections::BTreeMap;

/// Mean score of one group of records.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMean<K> {
    pub key: K,
    /// `None` if every score in the group is missing.
    pub mean: Option<f64>,
    /// Number of present scores the mean is taken over.
    pub count: usize,
    pub missing: usize,
}

/// Averages scores per key, skipping missing scores. Groups come out in key order.
pub fn mean_by<T, K, FK, FS>(records: &[T], key: FK, score: FS) -> Vec<GroupMean<K>>
where
    K: Ord + Clone,
    FK: Fn(&T) -> K,
    FS: Fn(&T) -> Option<f64>,
{
    let mut groups: BTreeMap<K, (f64, usize, usize)> = BTreeMap::new();
    for record in records {
        let entry = groups.entry(key(record)).or_insert((0.0, 0, 0));
        match score(record) {
            Some(s) => {
                entry.0 += s;
                entry.1 += 1;
            }
            None => entry.2 += 1,
        }
    }

    groups
        .into_iter()
        .map(|(key, (sum, count, missing))| GroupMean {
            key,
            mean: if count > 0 { Some(sum / count as f64) } else { None },
            count,
            missing,
        })
        .collect()
}
