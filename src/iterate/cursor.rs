use std::collections::VecDeque;
use std::iter::FusedIterator;

use fluentql_core::Row;

use super::{Marker, PageSource, QueryPages, Strategy};
use crate::error::Result;

/// One-pass row iterator over a paged query.
///
/// At most one page is buffered. An error ends the iteration after it is
/// yielded; a new cursor is needed to traverse again.
#[derive(Debug)]
pub struct Cursor<'db> {
    pages: QueryPages<'db>,
    size: u64,
    next: Option<Marker>,
    buffer: VecDeque<Row>,
}

impl<'db> Cursor<'db> {
    pub(crate) fn new(pages: QueryPages<'db>, size: u64) -> Self {
        Cursor {
            pages,
            size,
            next: Some(Marker::Start),
            buffer: VecDeque::new(),
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.pages.strategy()
    }

    fn refill(&mut self) -> Result<()> {
        let Some(marker) = self.next.take() else {
            return Ok(());
        };
        let page = self.pages.fetch(self.size, &marker)?;
        if page.is_empty() {
            return Ok(());
        }
        self.next = self.pages.advance(&marker, &page, self.size);
        self.buffer.extend(page);
        Ok(())
    }
}

impl Iterator for Cursor<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() {
            if let Err(error) = self.refill() {
                self.next = None;
                return Some(Err(error));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

impl FusedIterator for Cursor<'_> {}
