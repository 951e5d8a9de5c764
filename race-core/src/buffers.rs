// Fixed-capacity ring buffer for bounded histories.
// Invariants: at most `cap` items retained, oldest evicted first.

#[derive(Clone, Debug)]
pub struct RingBuffer<T> {
    buf: Vec<T>,
    cap: usize,
    head: usize,
    len: usize,
}

impl<T: Clone> RingBuffer<T> {
    pub fn new(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
            cap: cap.max(1),
            head: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.len < self.cap {
            self.buf.push(item);
            self.len += 1;
        } else {
            self.buf[self.head] = item;
            self.head = (self.head + 1) % self.cap;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.head = 0;
        self.len = 0;
    }

    /// Oldest-first copy of the retained items.
    pub fn to_vec_ordered(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len);
        if self.len == 0 {
            return out;
        }

        if self.len < self.cap {
            out.extend(self.buf.iter().cloned());
            return out;
        }

        out.extend(self.buf[self.head..].iter().cloned());
        out.extend(self.buf[..self.head].iter().cloned());
        out
    }

    /// Most recent `n` items, oldest-first.
    pub fn tail(&self, n: usize) -> Vec<T> {
        let ordered = self.to_vec_ordered();
        let skip = ordered.len().saturating_sub(n);
        ordered[skip..].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_and_keeps_order() {
        let mut ring = RingBuffer::new(3);
        for value in 1..=5 {
            ring.push(value);
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.to_vec_ordered(), vec![3, 4, 5]);
    }

    #[test]
    fn tail_returns_most_recent() {
        let mut ring = RingBuffer::new(4);
        for value in 1..=4 {
            ring.push(value);
        }
        assert_eq!(ring.tail(2), vec![3, 4]);
        assert_eq!(ring.tail(10), vec![1, 2, 3, 4]);
    }
}
