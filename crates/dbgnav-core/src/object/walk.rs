//! Linked-list and string traversal.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::trace;

use crate::error::NavResult;
use crate::extensions::ObjectResolver;
use crate::object::DbgObject;
use crate::types::{BigValue, Scalar};

/// Characters requested per read when scanning for a terminator.
pub const STRING_CHUNK: u64 = 64;

/// Reads for unterminated strings are kept inside one page of this size.
pub const PAGE_SIZE: u64 = 4096;

/// How [`DbgObject::list`] moves from one node to the next.
#[derive(Clone)]
pub enum ListStep
{
    /// Field paths tried in order with [`DbgObject::f_any`].
    Paths(Vec<String>),
    /// Arbitrary code.
    Function(ObjectResolver),
}

impl ListStep
{
    /// Follow one field path.
    pub fn path(path: impl Into<String>) -> Self
    {
        ListStep::Paths(vec![path.into()])
    }

    /// Follow the first of several field paths that resolves.
    pub fn paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ListStep::Paths(paths.into_iter().map(Into::into).collect())
    }

    /// Compute the next node with a closure.
    pub fn function<F>(step: F) -> Self
    where
        F: Fn(DbgObject) -> BoxFuture<'static, NavResult<DbgObject>> + Send + Sync + 'static,
    {
        ListStep::Function(Arc::new(step))
    }

    async fn next(&self, node: &DbgObject) -> NavResult<DbgObject>
    {
        match self {
            ListStep::Paths(paths) => {
                let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
                node.f_any(&paths).await
            }
            ListStep::Function(step) => step(node.clone()).await,
        }
    }
}

impl From<&str> for ListStep
{
    fn from(path: &str) -> Self
    {
        ListStep::path(path)
    }
}

impl fmt::Debug for ListStep
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            ListStep::Paths(paths) => f.debug_tuple("Paths").field(paths).finish(),
            ListStep::Function(_) => f.write_str("Function(..)"),
        }
    }
}

impl DbgObject
{
    /// Collect the nodes of a linked list starting at this one.
    ///
    /// The walk ends at a NULL node, after `max_count` nodes, or at the stop
    /// node:
    ///
    /// - without `stop`, the first node is the sentinel: coming back to it
    ///   ends the walk and it is not collected twice
    /// - a `stop` at the first node behaves the same way
    /// - any other `stop` is the last node collected
    ///
    /// Collected nodes are plain values; a failing step discards the walk.
    pub async fn list(&self, step: impl Into<ListStep>, stop: Option<DbgObject>, max_count: Option<usize>) -> NavResult<Vec<DbgObject>>
    {
        let step = step.into();
        let stop = stop.unwrap_or_else(|| self.clone());
        let stop_is_start = stop.equals(self);

        let mut collected = Vec::new();
        let mut node = self.clone();
        loop {
            if node.is_null() || max_count.is_some_and(|max| collected.len() >= max) {
                break;
            }
            let at_stop = node.equals(&stop);
            if at_stop && stop_is_start && !collected.is_empty() {
                break;
            }

            trace!("List node {} at {}", collected.len(), node.ptr());
            collected.push(node.clone());
            if at_stop && !stop_is_start {
                break;
            }
            node = step.next(&node).await?;
        }
        Ok(collected)
    }

    /// Read a string of characters starting here.
    ///
    /// With a `length`, exactly that many characters are read. Otherwise
    /// characters are read in chunks until a zero terminator; a chunk never
    /// crosses a page boundary, and a failed chunk is retried one character
    /// at a time from then on. NULL reads as `"???"`.
    pub async fn string(&self, length: Option<u64>) -> NavResult<String>
    {
        if self.is_null() {
            return Ok("???".to_string());
        }
        if let Some(length) = length {
            let values = self.ubigvals(Some(length)).await?;
            return Ok(values.into_iter().map(to_char).collect());
        }

        let element = self.element_size().await?;
        let mut text = String::new();
        let mut cursor = self.idx(0).await?;
        let mut chunk = STRING_CHUNK;
        loop {
            let page_left = PAGE_SIZE - cursor.pointer_value().modulo(PAGE_SIZE)?;
            let mut size = chunk;
            while size > 1 && size.saturating_mul(element) > page_left {
                size /= 2;
            }

            let values = match cursor.ubigvals(Some(size)).await {
                Ok(values) => values,
                Err(error) if size > 1 => {
                    trace!("Chunked string read at {} failed ({}), reading one character at a time", cursor.ptr(), error);
                    chunk = 1;
                    size = 1;
                    cursor.ubigvals(Some(1)).await?
                }
                Err(error) => return Err(error),
            };

            for value in values {
                if value.as_integer().is_some_and(BigValue::is_zero) {
                    return Ok(text);
                }
                text.push(to_char(value));
            }
            cursor = cursor.idx(i64::try_from(size).unwrap_or(i64::MAX)).await?;
        }
    }
}

fn to_char(value: Scalar) -> char
{
    value
        .as_integer()
        .and_then(BigValue::to_u64)
        .and_then(|code| u32::try_from(code).ok())
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}
