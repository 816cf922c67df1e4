//! Builder API for assembling an executor's components.
//!
//! An [`Executor`](crate::executor::Executor) is composed from four shared
//! collaborators. [`ComponentsBuilder`] wires them together and reports the
//! first one that is missing:
//!
//! ```
//! use stately::builder::ComponentsBuilder;
//! use stately::local::{
//!     ContextExecutionStore, LocalDefinitionStore, LocalLoggerFactory, QueueTaskDispatcher,
//! };
//! use std::sync::Arc;
//!
//! let components = ComponentsBuilder::new()
//!     .definition_store(Arc::new(LocalDefinitionStore::new()))
//!     .execution_store(Arc::new(ContextExecutionStore::new()))
//!     .logger_factory(Arc::new(LocalLoggerFactory::default()))
//!     .task_dispatcher(Arc::new(QueueTaskDispatcher::new()))
//!     .build()
//!     .unwrap();
//! # let _ = components;
//! ```

pub mod components;
pub mod error;

pub use components::ComponentsBuilder;
pub use error::BuildError;
