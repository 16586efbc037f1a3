use std::{cmp::Reverse, collections::BinaryHeap};

use delegate::delegate;

use crate::time::Time;

/// Min-ordered pending times.
#[derive(Debug, Default, Clone)]
pub(crate) struct Schedule {
    inner: BinaryHeap<Reverse<Time>>,
}

impl Schedule {
    delegate! {
        to self.inner {
            pub(crate) fn len(&self) -> usize;
            pub(crate) fn clear(&mut self);
        }
    }

    pub(crate) fn push(&mut self, time: Time) {
        self.inner.push(Reverse(time));
    }

    pub(crate) fn pop(&mut self) -> Option<Time> {
        self.inner.pop().map(|Reverse(t)| t)
    }

    pub(crate) fn peek(&self) -> Option<Time> {
        self.inner.peek().map(|&Reverse(t)| t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_earliest_first() {
        let mut schedule = Schedule::default();
        schedule.push(Time::new(3.0));
        schedule.push(Time::new(1.0));
        schedule.push(Time::new(2.0));
        assert_eq!(schedule.peek(), Some(Time::new(1.0)));
        assert_eq!(schedule.pop(), Some(Time::new(1.0)));
        assert_eq!(schedule.pop(), Some(Time::new(2.0)));
        assert_eq!(schedule.len(), 1);
    }
}
