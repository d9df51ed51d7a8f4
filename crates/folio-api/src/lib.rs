//! Wire contract for the folio document store.
//!
//! This crate holds everything that crosses the HTTP boundary, with no I/O
//! of its own:
//! - `value` - typed property values and their wire encoders/parsers
//! - `richtext` - rich-text run model (text, equations, mentions)
//! - `content` - block content discriminated union
//! - `filter` - boolean predicate trees for server-side queries
//! - `object` - page/block/database objects and list envelopes

pub mod content;
pub mod error;
pub mod filter;
pub mod object;
pub mod richtext;
pub mod value;

pub use content::BlockContent;
pub use error::ApiError;
pub use filter::{
    checkbox, date, multi_select, number, relation, select, text, title, Filter, FilterError,
    Sort, SortDirection, TimestampSort, MAX_FILTER_NESTING,
};
pub use object::{BlockObject, DatabaseObject, PagedBody, PageObject, ParentRef, QueryBody};
pub use richtext::{Mention, RichText, RichTextRun};
pub use value::{parse_property, DateValue, FileRef, ParsedProperty, PropertyKind, PropertyValue};
