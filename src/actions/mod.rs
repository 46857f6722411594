// Actions attached to sections
//
// An action is a side-effecting or computed object owned by a section. It
// lives at the section's structural position: its parent is always the
// section's parent.

use std::fmt::{self, Debug};
use std::sync::Arc;

use crate::codec::types::Value;
use crate::internal::error::{Error, Result};
use crate::tree::{FieldPath, Scope};
use crate::values::DefaultValue;

/// A live action owned by one section instance.
pub trait Action: Debug + Send + Sync {
    fn parent(&self) -> Option<&FieldPath>;

    fn set_parent(&mut self, parent: Option<FieldPath>);

    /// Runs once, during the root's initialization pass, with the scope of
    /// the record that holds the section.
    fn initialize(&mut self, _scope: &Scope<'_>) -> Result<()> {
        Ok(())
    }

    /// Depth-bounded description: depth 0 is the most detailed, and past
    /// depth 2 nothing is printed.
    fn inspect(&self, depth: usize) -> String;
}

/// Factory for actions.
pub trait ActionType: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn instantiate(&self, args: Vec<Value>) -> Result<Box<dyn Action>>;
}

/// A constructor argument of an action.
#[derive(Debug, Clone)]
pub enum ActionArg {
    Value(Value),
    /// Resolved when the action is instantiated.
    Deferred(DefaultValue),
}

impl ActionArg {
    fn resolve(&self) -> Result<Value> {
        match self {
            ActionArg::Value(v) => Ok(v.clone()),
            ActionArg::Deferred(DefaultValue::Bound(_)) => Err(Error::ActionError(
                "bound values cannot be used as action arguments".to_string(),
            )),
            ActionArg::Deferred(default) => default.seed(Value::Null),
        }
    }

    fn deep_clone(&self) -> Option<Self> {
        match self {
            ActionArg::Value(v) => Some(ActionArg::Value(v.clone())),
            ActionArg::Deferred(d) => d.deep_clone().map(ActionArg::Deferred),
        }
    }
}

impl From<Value> for ActionArg {
    fn from(v: Value) -> Self {
        ActionArg::Value(v)
    }
}

impl From<DefaultValue> for ActionArg {
    fn from(d: DefaultValue) -> Self {
        ActionArg::Deferred(d)
    }
}

macro_rules! impl_value_arg {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ActionArg {
                fn from(v: $ty) -> Self {
                    ActionArg::Value(Value::from(v))
                }
            }
        )*
    };
}

impl_value_arg!(bool, u8, u16, u32, u64, i8, i16, i32, i64, &str, String);

/// Declarative prototype of an action; nothing is constructed until a
/// section holding it is instantiated.
#[derive(Debug, Clone)]
pub struct ActionDescriptor {
    action_type: Arc<dyn ActionType>,
    args: Vec<ActionArg>,
}

impl ActionDescriptor {
    pub fn new(action_type: Arc<dyn ActionType>, args: Vec<ActionArg>) -> Self {
        Self { action_type, args }
    }

    /// Action backed by a closure, run when the tree is initialized.
    pub fn custom<F>(name: impl Into<String>, run: F, args: Vec<ActionArg>) -> Self
    where
        F: Fn(&ActionContext<'_, '_>) -> Result<()> + Send + Sync + 'static,
    {
        Self::new(
            Arc::new(CustomActionType {
                name: name.into(),
                run: Arc::new(run),
            }),
            args,
        )
    }

    pub fn type_name(&self) -> &str {
        self.action_type.name()
    }

    pub fn args(&self) -> &[ActionArg] {
        &self.args
    }

    pub fn deep_clone(&self) -> Option<Self> {
        let args = self
            .args
            .iter()
            .map(ActionArg::deep_clone)
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            action_type: Arc::clone(&self.action_type),
            args,
        })
    }

    pub fn instantiate(&self) -> Result<Box<dyn Action>> {
        let args = self
            .args
            .iter()
            .map(ActionArg::resolve)
            .collect::<Result<Vec<_>>>()?;
        self.action_type.instantiate(args)
    }
}

/// Closure behind a custom action.
pub type CustomFn = dyn Fn(&ActionContext<'_, '_>) -> Result<()> + Send + Sync;

/// What a custom action sees when it runs.
pub struct ActionContext<'s, 'a> {
    pub scope: &'s Scope<'a>,
    pub parent: Option<&'s FieldPath>,
    pub args: &'s [Value],
}

struct CustomActionType {
    name: String,
    run: Arc<CustomFn>,
}

impl Debug for CustomActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomActionType").field("name", &self.name).finish()
    }
}

impl ActionType for CustomActionType {
    fn name(&self) -> &str {
        &self.name
    }

    fn instantiate(&self, args: Vec<Value>) -> Result<Box<dyn Action>> {
        Ok(Box::new(CustomAction {
            name: self.name.clone(),
            run: Arc::clone(&self.run),
            args,
            parent: None,
        }))
    }
}

/// Action instance created by [`ActionDescriptor::custom`].
pub struct CustomAction {
    name: String,
    run: Arc<CustomFn>,
    args: Vec<Value>,
    parent: Option<FieldPath>,
}

impl Debug for CustomAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomAction")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("parent", &self.parent)
            .finish()
    }
}

impl Action for CustomAction {
    fn parent(&self) -> Option<&FieldPath> {
        self.parent.as_ref()
    }

    fn set_parent(&mut self, parent: Option<FieldPath>) {
        self.parent = parent;
    }

    fn initialize(&mut self, scope: &Scope<'_>) -> Result<()> {
        let context = ActionContext {
            scope,
            parent: self.parent.as_ref(),
            args: &self.args,
        };
        (self.run)(&context)
    }

    fn inspect(&self, depth: usize) -> String {
        match depth {
            0 => {
                let args: Vec<String> = self.args.iter().map(Value::to_string).collect();
                format!("#<{} args=[{}]>", self.name, args.join(", "))
            }
            1 => format!("#<{}>", self.name),
            2 => self.name.clone(),
            _ => String::new(),
        }
    }
}
