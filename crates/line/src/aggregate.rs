//! Packing several short replies into as few segments as possible.

use relay_channels::Segment;

use crate::segment::Segmenter;

/// Greedy, order-preserving accumulator.
///
/// Messages are joined with `\n` while the joined text fits the segmenter's
/// limit. A message that is itself over the limit flushes whatever is in
/// progress and is split on its own.
#[derive(Debug)]
pub struct Aggregator<'a> {
    segmenter: &'a Segmenter,
    current: String,
    current_len: usize,
    out: Vec<Segment>,
}

impl<'a> Aggregator<'a> {
    pub fn new(segmenter: &'a Segmenter) -> Self {
        Self {
            segmenter,
            current: String::new(),
            current_len: 0,
            out: Vec::new(),
        }
    }

    pub fn push(&mut self, message: &str) {
        let len = message.chars().count();
        if len == 0 {
            return;
        }
        let max = self.segmenter.max_len();

        if len > max {
            self.flush();
            self.out.extend(self.segmenter.split(message));
            return;
        }

        let joined_len = if self.current.is_empty() {
            len
        } else {
            self.current_len + 1 + len
        };
        if joined_len > max {
            self.flush();
        }
        if !self.current.is_empty() {
            self.current.push('\n');
            self.current_len += 1;
        }
        self.current.push_str(message);
        self.current_len += len;
    }

    pub fn finish(mut self) -> Vec<Segment> {
        self.flush();
        self.out
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.out
                .push(Segment::text(std::mem::take(&mut self.current)));
            self.current_len = 0;
        }
    }
}

impl Segmenter {
    /// Pack `messages` into segments, see [`Aggregator`].
    pub fn pack<I, S>(&self, messages: I) -> Vec<Segment>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut aggregator = Aggregator::new(self);
        for message in messages {
            aggregator.push(message.as_ref());
        }
        aggregator.finish()
    }
}
