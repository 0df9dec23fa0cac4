use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Stratified train/test split of sample indices.
///
/// Each class is shuffled with a seeded RNG and contributes
/// `round(test_fraction · class_size)` samples to the test side. If that
/// leaves the test side empty while at least two samples exist, one
/// training sample is moved over. Both index lists come back sorted.
pub fn stratified_split(labels: &[u8], test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in [0u8, 1] {
        let mut members: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == class).collect();
        members.shuffle(&mut rng);
        let n_test = ((members.len() as f64) * test_fraction).round() as usize;
        let n_test = n_test.min(members.len().saturating_sub(1));
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    if test.is_empty() && train.len() >= 2 {
        if let Some(moved) = train.pop() {
            test.push(moved);
        }
    }
    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}
