use std::collections::VecDeque;

use crate::time::Time;

/// A ride request accepted by a ride-sharing node but not yet matched.
#[derive(Debug, Clone, Copy, PartialEq, derive_new::new)]
pub struct Request {
    pub arrival: Time,
    pub seats: u32,
}

/// FIFO of pending requests.
#[derive(Debug, Default, Clone, derive_new::new)]
pub(crate) struct PendingQ {
    #[new(default)]
    inner: VecDeque<Request>,
}

impl PendingQ {
    delegate::delegate! {
        to self.inner {
            #[call(push_back)]
            pub(crate) fn enqueue(&mut self, req: Request);

            #[call(pop_front)]
            pub(crate) fn dequeue(&mut self) -> Option<Request>;

            #[call(front)]
            pub(crate) fn head(&self) -> Option<&Request>;

            pub(crate) fn len(&self) -> usize;
            pub(crate) fn is_empty(&self) -> bool;
            pub(crate) fn clear(&mut self);
            pub(crate) fn iter(&self) -> std::collections::vec_deque::Iter<'_, Request>;
        }
    }

    /// Removes, in queue order, every request that fits in `budget` seats, charging
    /// each against the budget as it is taken. Stops as soon as the budget is spent.
    /// The relative order of the requests left behind is unchanged.
    pub(crate) fn take_fitting(&mut self, mut budget: u32) -> Vec<Request> {
        let mut taken = Vec::new();
        let mut idx = 0;
        while idx < self.inner.len() && budget > 0 {
            let seats = self.inner[idx].seats;
            if seats <= budget {
                let req = self.inner.remove(idx).expect("index is in bounds");
                budget -= seats;
                taken.push(req);
            } else {
                idx += 1;
            }
        }
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_of(seats: &[u32]) -> PendingQ {
        let mut q = PendingQ::new();
        for (i, &s) in seats.iter().enumerate() {
            q.enqueue(Request::new(Time::new(i as f64), s));
        }
        q
    }

    fn seats_of(q: &PendingQ) -> Vec<u32> {
        q.iter().map(|r| r.seats).collect()
    }

    #[test]
    fn takes_in_order_until_budget_spent() {
        let mut q = queue_of(&[2, 3, 1, 1, 2]);
        let taken = q.take_fitting(4);
        assert_eq!(taken.iter().map(|r| r.seats).collect::<Vec<_>>(), vec![2, 1, 1]);
        assert_eq!(seats_of(&q), vec![3, 2]);
    }

    #[test]
    fn skips_requests_that_do_not_fit() {
        let mut q = queue_of(&[3, 2, 4]);
        let taken = q.take_fitting(4);
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].seats, 3);
        assert_eq!(seats_of(&q), vec![2, 4]);
    }

    #[test]
    fn fifo_dequeue() {
        let mut q = queue_of(&[1, 2]);
        assert_eq!(q.head().map(|r| r.seats), Some(1));
        assert_eq!(q.dequeue().map(|r| r.seats), Some(1));
        assert_eq!(q.dequeue().map(|r| r.seats), Some(2));
        assert!(q.dequeue().is_none());
    }
}
