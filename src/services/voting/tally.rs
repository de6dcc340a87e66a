use rand::Rng;
use tracing::info;

/// Pick the option with the most votes.
///
/// Ties are broken uniformly at random with `rng`; `on_tie` is called once
/// with every tied option before the choice is made. Returns `None` only
/// for empty input.
pub fn pick_winner<K, R, F>(counts: &[(K, u64)], rng: &mut R, on_tie: F) -> Option<K>
where
    K: Clone + std::fmt::Debug,
    R: Rng + ?Sized,
    F: FnOnce(&[K]),
{
    let max = counts.iter().map(|(_, count)| *count).max()?;

    let mut leaders: Vec<K> = counts
        .iter()
        .filter(|(_, count)| *count == max)
        .map(|(option, _)| option.clone())
        .collect();

    if leaders.len() == 1 {
        return leaders.pop();
    }

    info!(
        "Tie between {} options at {} votes, choosing randomly: {:?}",
        leaders.len(),
        max,
        leaders
    );
    on_tie(&leaders);

    let index = rng.gen_range(0..leaders.len());
    Some(leaders.swap_remove(index))
}
