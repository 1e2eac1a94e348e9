//! Shared FFT plan cache
//!
//! Plans are keyed by transform size and shared between all analyzer
//! instances. The cache holds weak references so dropping the last
//! analyzer of a given size frees the plan.

use realfft::{RealFftPlanner, RealToComplex};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};

type PlanMap = HashMap<usize, Weak<dyn RealToComplex<f32>>>;

static PLAN_CACHE: OnceLock<Mutex<PlanMap>> = OnceLock::new();

pub fn plan_for_size(size: usize) -> Arc<dyn RealToComplex<f32>> {
    let cache = PLAN_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut map = cache.lock().unwrap_or_else(PoisonError::into_inner);

    if let Some(plan) = map.get(&size).and_then(Weak::upgrade) {
        return plan;
    }

    let plan = RealFftPlanner::<f32>::new().plan_fft_forward(size);
    map.insert(size, Arc::downgrade(&plan));
    map.retain(|_, weak| weak.strong_count() > 0);
    plan
}

/// Smallest even size `>= n` whose prime factors are all 2, 3 or 5
pub fn next_fast_size(n: usize) -> usize {
    let mut candidate = n.max(2);
    if candidate % 2 == 1 {
        candidate += 1;
    }
    loop {
        let mut rest = candidate;
        for factor in [2, 3, 5] {
            while rest % factor == 0 {
                rest /= factor;
            }
        }
        if rest == 1 {
            return candidate;
        }
        candidate += 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(1, 2)]
    #[test_case(2, 2)]
    #[test_case(100, 100)]
    #[test_case(101, 108)]
    #[test_case(481, 486)]
    #[test_case(1000, 1000)]
    #[test_case(1025, 1080)]
    fn test_next_fast_size(input: usize, expected: usize) {
        assert_eq!(next_fast_size(input), expected);
    }

    #[test]
    fn test_plans_are_shared() {
        let a = plan_for_size(1024);
        let b = plan_for_size(1024);
        assert!(Arc::ptr_eq(&a, &b));
    }
}
