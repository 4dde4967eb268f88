pub mod capture;
pub mod component;
pub mod config;
pub mod context;
mod cycle;
pub mod diff;
pub mod error;
pub mod node;
pub mod normalize;
pub mod observer;
pub mod refs;
pub mod scheduler;
pub mod tree;
pub mod unit;

// Re-export key types
pub use capture::Routed;
pub use component::{Component, ComponentType, Context, LifecycleHook, Props, Scope, State};
pub use config::{UpdateMode, UpdaterConfig};
pub use context::{resolve_child_context, select_context_by_keys};
pub use diff::{ChildList, KeyedDiff, TreeDiff};
pub use error::{CapturedError, ErrorInfo, UpdateError};
pub use node::{Element, NodeArena, NodeId, NodeKind, Rendered};
pub use normalize::{ChildNormalizer, Normalizer, UnsupportedChild};
pub use observer::{LifecycleObserver, NoopObserver, RecordingObserver};
pub use refs::{NodeRef, RefRegistry, RefTarget, Refs};
pub use scheduler::{Scheduler, UpdateBatch};
pub use tree::UpdateTree;
pub use unit::{Job, StatePatch, UnitHandle, UnitPhase, UpdateRequest, merge_states};
