use crate::component::LifecycleHook;
use smartstring::alias::String as SmartString;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("{hook} failed in <{component}>: {cause:#}")]
    Hook {
        component: SmartString,
        hook: LifecycleHook,
        cause: anyhow::Error,
    },

    #[error("<{component}> rendered {shape}, which cannot be turned into child nodes")]
    RenderShape {
        component: SmartString,
        shape: &'static str,
    },

    #[error("{hook} on <{component}> re-entered an instance that is still running a hook")]
    Reentrant {
        component: SmartString,
        hook: LifecycleHook,
    },

    #[error("drain aborted after {steps} jobs; an update keeps scheduling itself")]
    DrainLimitExceeded { steps: usize },

    #[error("invalid updater config: {0}")]
    Config(#[from] serde_json::Error),
}

impl UpdateError {
    /// Name of the component the failure was recorded against, if any.
    pub fn component(&self) -> Option<&str> {
        match self {
            UpdateError::Hook { component, .. }
            | UpdateError::RenderShape { component, .. }
            | UpdateError::Reentrant { component, .. } => Some(component),
            UpdateError::DrainLimitExceeded { .. } | UpdateError::Config(_) => None,
        }
    }

    pub fn hook(&self) -> Option<LifecycleHook> {
        match self {
            UpdateError::Hook { hook, .. } | UpdateError::Reentrant { hook, .. } => Some(*hook),
            UpdateError::RenderShape { .. } => Some(LifecycleHook::Render),
            UpdateError::DrainLimitExceeded { .. } | UpdateError::Config(_) => None,
        }
    }
}

/// Where a failure happened, handed to `component_did_catch` next to the error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub hook: LifecycleHook,
    /// One `in <Name>` line per component, failure site first
    pub component_stack: String,
}

impl ErrorInfo {
    pub fn new<S: AsRef<str>>(hook: LifecycleHook, names: &[S]) -> Self {
        let mut component_stack = String::new();
        for name in names {
            component_stack.push_str("\n    in ");
            component_stack.push_str(name.as_ref());
        }
        Self {
            hook,
            component_stack,
        }
    }
}

/// A recorded failure together with its location.
#[derive(Debug, Clone)]
pub struct CapturedError {
    pub error: Rc<UpdateError>,
    pub info: ErrorInfo,
}

impl fmt::Display for CapturedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.error, self.info.component_stack)
    }
}
