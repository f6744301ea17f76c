//! Host dataflow boundary
//!
//! A dataflow host creates objects from text (`vratio 2`), sends them
//! messages (`config`, `start 1`, `gain 0 3`, `bang`) and destroys them.
//! This module provides the pieces the host needs for that: message atoms,
//! the [`HostObject`] interface, and a process-wide [`ClassTable`] mapping
//! class names to constructors.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use bridge_sdk::VoltageRatioSdk;
use tracing::{debug, info, warn};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::events::NodeEvent;
use crate::node::SensorNode;
use crate::route::RouteFactory;

/// Class name of the built-in sensor object
pub const SENSOR_CLASS: &str = "vratio";

/// One message element
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Float(f64),
    Symbol(String),
}

impl Atom {
    /// Parse a single whitespace-free token
    pub fn parse(token: &str) -> Self {
        match token.parse::<f64>() {
            Ok(v) => Atom::Float(v),
            Err(_) => Atom::Symbol(token.to_string()),
        }
    }

    /// Numeric value, if this is a float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Atom::Float(v) => Some(*v),
            Atom::Symbol(_) => None,
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Float(v) => write!(f, "{}", v),
            Atom::Symbol(s) => write!(f, "{}", s),
        }
    }
}

/// Split a line into atoms
pub fn parse_atoms(line: &str) -> Vec<Atom> {
    line.split_whitespace().map(Atom::parse).collect()
}

/// An object instantiated by the host
pub trait HostObject: Send {
    /// Name of the class this object was created from
    fn class_name(&self) -> &'static str;

    /// Number of outlets the object exposes
    fn outlets(&self) -> usize;

    /// Handle a message; an empty selector is a bare trigger
    fn dispatch(&mut self, selector: &str, args: &[Atom]) -> Result<(), NodeError>;

    /// Events produced since the last call
    fn drain_events(&mut self) -> Vec<NodeEvent> {
        Vec::new()
    }

    /// Destructor; consumes the object
    fn destroy(self: Box<Self>) -> Vec<NodeError> {
        Vec::new()
    }
}

/// Collaborators handed to every constructor
#[derive(Clone)]
pub struct ClassContext {
    pub sdk: Arc<dyn VoltageRatioSdk>,
    pub routes: Arc<dyn RouteFactory>,
    pub config: NodeConfig,
}

/// Constructor of a host object from its creation arguments
pub type Constructor = fn(&ClassContext, &[Atom]) -> Result<Box<dyn HostObject>, NodeError>;

/// Registered class
#[derive(Clone, Copy)]
pub struct ObjectClass {
    pub name: &'static str,
    pub constructor: Constructor,
    /// Message selectors the class answers to
    pub selectors: &'static [&'static str],
}

impl fmt::Debug for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectClass")
            .field("name", &self.name)
            .field("selectors", &self.selectors)
            .finish()
    }
}

/// Class registration table
#[derive(Debug, Default)]
pub struct ClassTable {
    classes: HashMap<&'static str, ObjectClass>,
}

static CLASSES: OnceLock<ClassTable> = OnceLock::new();

impl ClassTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Table containing the built-in classes
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        table.classes.insert(SENSOR_CLASS, SensorObject::CLASS);
        table
    }

    /// Process-wide table, populated with the built-ins on first use
    pub fn global() -> &'static ClassTable {
        CLASSES.get_or_init(|| {
            info!("Registering host class '{}'", SENSOR_CLASS);
            Self::with_builtins()
        })
    }

    /// Register a class under its name
    pub fn register(&mut self, class: ObjectClass) -> Result<(), NodeError> {
        if self.classes.contains_key(class.name) {
            return Err(NodeError::InvalidArgument(format!(
                "class '{}' is already registered",
                class.name
            )));
        }
        self.classes.insert(class.name, class);
        Ok(())
    }

    /// Look up a class
    pub fn get(&self, name: &str) -> Option<&ObjectClass> {
        self.classes.get(name)
    }

    /// Registered class names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.classes.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Create an object of a class
    pub fn instantiate(
        &self,
        name: &str,
        ctx: &ClassContext,
        args: &[Atom],
    ) -> Result<Box<dyn HostObject>, NodeError> {
        let class = self
            .get(name)
            .ok_or_else(|| NodeError::InvalidArgument(format!("unknown class '{}'", name)))?;
        (class.constructor)(ctx, args)
    }
}

/// Read an integral numeric argument
fn int_arg(args: &[Atom], pos: usize, what: &str) -> Result<i64, NodeError> {
    let value = args
        .get(pos)
        .and_then(Atom::as_float)
        .ok_or_else(|| NodeError::InvalidArgument(format!("{} must be a number", what)))?;

    if !value.is_finite() || value.fract() != 0.0 {
        return Err(NodeError::InvalidArgument(format!(
            "{} must be an integer, got {}",
            what, value
        )));
    }
    Ok(value as i64)
}

fn expect_args(selector: &str, args: &[Atom], count: usize) -> Result<(), NodeError> {
    if args.len() != count {
        return Err(NodeError::InvalidArgument(format!(
            "'{}' takes {} argument(s), got {}",
            selector,
            count,
            args.len()
        )));
    }
    Ok(())
}

/// Host object wrapping a [`SensorNode`]
pub struct SensorObject {
    node: SensorNode,
}

impl SensorObject {
    pub const CLASS: ObjectClass = ObjectClass {
        name: SENSOR_CLASS,
        constructor: Self::construct,
        selectors: &["config", "start", "gain", "bang"],
    };

    fn construct(ctx: &ClassContext, args: &[Atom]) -> Result<Box<dyn HostObject>, NodeError> {
        expect_args(SENSOR_CLASS, args, 1)?;
        let count = int_arg(args, 0, "channel count")?;
        let node =
            SensorNode::with_config(ctx.sdk.clone(), count, ctx.routes.as_ref(), ctx.config.clone())?;
        Ok(Box::new(Self { node }))
    }

    /// The wrapped node
    pub fn node(&self) -> &SensorNode {
        &self.node
    }
}

impl HostObject for SensorObject {
    fn class_name(&self) -> &'static str {
        SENSOR_CLASS
    }

    fn outlets(&self) -> usize {
        self.node.num_inputs()
    }

    fn dispatch(&mut self, selector: &str, args: &[Atom]) -> Result<(), NodeError> {
        debug!("vratio <- {} {:?}", selector, args);
        match selector {
            "config" => {
                expect_args(selector, args, 0)?;
                let report = self.node.configure()?;
                for e in report.errors() {
                    warn!("config: {}", e);
                }
                Ok(())
            }
            "start" => {
                expect_args(selector, args, 1)?;
                let on = args[0]
                    .as_float()
                    .ok_or_else(|| NodeError::InvalidArgument("start flag must be a number".into()))?
                    != 0.0;
                let report = self.node.set_bridge_enabled(on)?;
                for e in report.errors() {
                    warn!("start: {}", e);
                }
                Ok(())
            }
            "gain" => {
                expect_args(selector, args, 2)?;
                let channel = int_arg(args, 0, "channel")?;
                let level = int_arg(args, 1, "gain level")?;
                self.node.set_gain(channel, level)
            }
            "bang" | "" => {
                expect_args(selector, args, 0)?;
                self.node.signal();
                Ok(())
            }
            other => Err(NodeError::InvalidArgument(format!(
                "no method for '{}'",
                other
            ))),
        }
    }

    fn drain_events(&mut self) -> Vec<NodeEvent> {
        self.node.drain_events()
    }

    fn destroy(mut self: Box<Self>) -> Vec<NodeError> {
        self.node.tear_down()
    }
}
