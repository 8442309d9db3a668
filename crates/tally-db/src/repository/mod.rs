//! # Repository Module
//!
//! Repository implementations for database operations, one per aggregate.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                   Repository Layer                                  │
//! │                                                                     │
//! │  tally-engine services                                              │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌──────────────┐ ┌──────────────┐ ┌──────────┐ ┌──────────────┐   │
//! │  │  Product     │ │  Movement    │ │  Sale    │ │  Shift       │   │
//! │  │  Repository  │ │  Repository  │ │Repository│ │  Repository  │   │
//! │  └──────────────┘ └──────────────┘ └──────────┘ └──────────────┘   │
//! │       │                  │              │              │           │
//! │       └──────────────────┴──────┬───────┴──────────────┘           │
//! │                                 ▼                                   │
//! │                           SqlitePool                                │
//! │                                                                     │
//! │  Pool-level methods (&self):  single-statement reads and writes     │
//! │  `*_tx` methods (no self):    participants in a caller-owned        │
//! │                               transaction (&mut SqliteConnection)   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

pub mod movement;
pub mod product;
pub mod sale;
pub mod shift;
