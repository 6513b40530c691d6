use serde_json::Value;

use crate::error::Result;

use super::{Body, Response};

/// Lifecycle of a response stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Unopened,
    Connected,
    Closed,
    /// The response was broken from the start. Nothing can be read.
    Error,
}

impl StreamState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamState::Unopened => "unopened",
            StreamState::Connected => "connected",
            StreamState::Closed => "closed",
            StreamState::Error => "error",
        }
    }
}

/// Key of one element in a JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKey<'a> {
    Name(&'a str),
    Index(usize),
}

/// The next unread part of a response body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Chunk<'a> {
    /// All remaining bytes of a non-JSON body.
    Bytes(&'a [u8]),
    /// One element of a JSON body.
    Entry(EntryKey<'a>, &'a Value),
}

impl<'a> Chunk<'a> {
    /// How far reading this chunk moves the cursor.
    fn units(&self) -> usize {
        match self {
            Chunk::Bytes(v) => v.len(),
            Chunk::Entry(_, _) => 1,
        }
    }

    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match self {
            Chunk::Bytes(v) => Some(*v),
            Chunk::Entry(_, _) => None,
        }
    }

    pub fn as_entry(&self) -> Option<(EntryKey<'a>, &'a Value)> {
        match self {
            Chunk::Bytes(_) => None,
            Chunk::Entry(k, v) => Some((*k, *v)),
        }
    }
}

/// A JSON scalar is streamed as a collection of one element.
fn json_entry(value: &Value, index: usize) -> Option<Chunk<'_>> {
    match value {
        Value::Array(items) => items
            .get(index)
            .map(|v| Chunk::Entry(EntryKey::Index(index), v)),
        Value::Object(map) => map
            .iter()
            .nth(index)
            .map(|(k, v)| Chunk::Entry(EntryKey::Name(k), v)),
        scalar => (index == 0).then_some(Chunk::Entry(EntryKey::Index(0), scalar)),
    }
}

impl Response {
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Position of the cursor. Bytes for a non-JSON body, elements for JSON.
    pub fn read_index(&self) -> usize {
        self.read_index
    }

    fn chunk_at(&self, index: usize) -> Result<Option<Chunk<'_>>> {
        if self.state != StreamState::Connected {
            return Ok(None);
        }

        let chunk = match self.body()? {
            Body::Bytes(bytes) => bytes
                .get(index..)
                .filter(|rest| !rest.is_empty())
                .map(Chunk::Bytes),
            Body::Json(value) => json_entry(value, index),
        };

        Ok(chunk)
    }

    /// The next unread chunk, without moving the cursor.
    pub fn peek(&self) -> Result<Option<Chunk<'_>>> {
        self.chunk_at(self.read_index)
    }

    /// The next unread chunk, moving the cursor past it.
    pub fn read(&mut self) -> Result<Option<Chunk<'_>>> {
        let index = self.read_index;

        let units = self.chunk_at(index)?.map(|c| c.units());
        let Some(units) = units else {
            return Ok(None);
        };

        self.read_index += units;

        self.chunk_at(index)
    }

    /// Whether there is nothing left to read.
    pub fn empty(&self) -> Result<bool> {
        Ok(self.peek()?.is_none())
    }

    /// Move the cursor back by `count`, stopping at the start. `0` goes
    /// back to the start.
    pub fn rewind(&mut self, count: i64) {
        if self.state != StreamState::Connected || count < 0 {
            return;
        }

        self.read_index = if count == 0 {
            0
        } else {
            let count = usize::try_from(count).unwrap_or(usize::MAX);
            self.read_index.saturating_sub(count)
        };
    }

    /// The stream is read only. Does nothing.
    pub fn write(&mut self, _data: &[u8]) {}

    pub fn close(&mut self) {
        self.state = StreamState::Closed;
    }
}
