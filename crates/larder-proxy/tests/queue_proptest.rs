use std::collections::VecDeque;

use larder_proxy::TaskQueue;
use proptest::prelude::*;

proptest! {
    #[test]
    fn drain_order_matches_enqueue_order(values in proptest::collection::vec(any::<u32>(), 1..200)) {
        let queue = TaskQueue::new(values.len());
        for value in &values {
            prop_assert!(queue.push(*value));
        }
        queue.close();
        let mut drained = Vec::new();
        while let Some(value) = queue.pop() {
            drained.push(value);
        }
        prop_assert_eq!(drained, values);
    }

    #[test]
    fn interleaved_push_pop_preserves_fifo(ops in proptest::collection::vec(any::<bool>(), 1..200)) {
        let queue = TaskQueue::new(200);
        let mut next = 0_u32;
        let mut expected = VecDeque::new();
        for push in ops {
            if push {
                prop_assert!(queue.push(next));
                expected.push_back(next);
                next += 1;
            } else if let Some(want) = expected.pop_front() {
                prop_assert_eq!(queue.pop(), Some(want));
            }
        }
    }
}
