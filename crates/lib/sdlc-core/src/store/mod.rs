//! Record store gateway.
//!
//! The gateway is a thin query facade: a table, a column list, equality
//! filters, an optional order, and an optional limit. [`PostgrestStore`] talks
//! to a Supabase/PostgREST endpoint; [`MemoryStore`] serves rows from memory.

pub mod memory;
pub mod postgrest;

use std::{error::Error, fmt};

use async_trait::async_trait;
use sdlc_store::{DecodeError, Row};

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;

#[derive(Debug)]
pub enum StoreError {
    Config(String),
    Status { status: u16, body: String },
    Transport(reqwest::Error),
    Decode(DecodeError),
}

impl StoreError {
    /// HTTP status reported by the store, if the failure carried one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(message) => write!(f, "store configuration error: {message}"),
            Self::Status { status, body } => {
                write!(f, "store returned status {status}: {body}")
            }
            Self::Transport(err) => write!(f, "store request failed: {err}"),
            Self::Decode(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            Self::Decode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err)
    }
}

impl From<DecodeError> for StoreError {
    fn from(err: DecodeError) -> Self {
        Self::Decode(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
    pub nulls_first: bool,
}

impl Order {
    #[must_use]
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Asc,
            nulls_first: false,
        }
    }

    #[must_use]
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Desc,
            nulls_first: false,
        }
    }

    #[must_use]
    pub const fn nulls_first(mut self) -> Self {
        self.nulls_first = true;
        self
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self.direction {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        write!(f, "{}.{direction}", self.column)?;
        if self.nulls_first {
            f.write_str(".nullsfirst")?;
        }
        Ok(())
    }
}

/// A select against one table. Filters are column equality predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub table: String,
    pub select: String,
    pub filters: Vec<(String, String)>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    #[must_use]
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = columns.into();
        self
    }

    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    #[must_use]
    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Read access to the project store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Runs a query and returns every matching row.
    async fn query(&self, query: &Query) -> StoreResult<Vec<Row>>;

    /// Runs a query expecting at most one row.
    async fn query_single(&self, query: &Query) -> StoreResult<Option<Row>> {
        let limited = query.clone().limit(1);
        Ok(self.query(&limited).await?.into_iter().next())
    }
}
