// objindex — context-sensitive object identity tracking
//
// Library root. Core model (path indexing, identity tracking, aggregation
// trie, reporting) plus the trace front end used to replay recorded runs.

pub mod analysis;
pub mod config;
pub mod diag;
pub mod error;
pub mod id;
pub mod lexer;
pub mod location;
pub mod parser;
pub mod path_index;
pub mod replay;
pub mod report;
pub mod shadow;
pub mod trace;
pub mod tracker;
pub mod trie;
