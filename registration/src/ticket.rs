//! Ticket identifier generation.

use crate::types::TicketId;
use rand::Rng;
use std::sync::Arc;

/// Lowest ticket number issued.
pub const MIN_TICKET_NUMBER: u16 = 1000;

/// Highest ticket number issued.
pub const MAX_TICKET_NUMBER: u16 = 9999;

/// Source of fresh ticket ids.
///
/// The registration service calls this once per attempt. Uniqueness is not
/// the generator's job; the store rejects duplicates.
pub type TicketGenerator = Arc<dyn Fn() -> TicketId + Send + Sync>;

/// Draw a ticket id using the thread-local RNG.
#[must_use]
pub fn generate() -> TicketId {
    generate_with(&mut rand::thread_rng())
}

/// Draw a ticket id from the given RNG, uniform over 1000–9999.
pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> TicketId {
    TicketId::from_number(rng.gen_range(MIN_TICKET_NUMBER..=MAX_TICKET_NUMBER))
}

/// The default generator used by the server.
#[must_use]
pub fn random_generator() -> TicketGenerator {
    Arc::new(generate)
}

/// A generator that replays the given ids, then falls back to random ones.
///
/// Useful for forcing ticket collisions in tests.
#[cfg(any(test, feature = "test-utils"))]
#[must_use]
pub fn sequence_generator(ids: Vec<TicketId>) -> TicketGenerator {
    let queue = std::sync::Mutex::new(std::collections::VecDeque::from(ids));
    Arc::new(move || {
        queue
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(generate)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_generated_ids_are_well_formed() {
        for _ in 0..1_000 {
            let id = generate();
            assert!(TicketId::is_well_formed(id.as_str()), "bad id {id}");
        }
    }

    #[test]
    fn test_sequence_generator_replays_then_randomizes() {
        let next = sequence_generator(vec![
            TicketId::from_number(1111),
            TicketId::from_number(2222),
        ]);
        assert_eq!(next().as_str(), "INF25-1111");
        assert_eq!(next().as_str(), "INF25-2222");
        assert!(TicketId::is_well_formed(next().as_str()));
    }

    proptest! {
        #[test]
        fn prop_seeded_ids_stay_in_range(seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let id = generate_with(&mut rng);
            let number: u16 = id.as_str()[TicketId::PREFIX.len()..].parse().unwrap();
            prop_assert!((MIN_TICKET_NUMBER..=MAX_TICKET_NUMBER).contains(&number));
        }
    }
}
