//! Line-oriented host
//!
//! Each input line is either a console command or a message for the
//! current object:
//!
//! - `new <class> <args...>` creates an object (replacing the current one)
//! - `free` destroys the current object
//! - `quit` exits
//! - anything else is sent to the object; an empty line is a bare trigger

use bridge_node::{parse_atoms, Atom, ClassContext, ClassTable, HostObject, NodeError, NodeEvent};
use tracing::{info, warn};

/// What the host loop should do after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    /// A new object exists; its outlets are ready to be collected
    Created { outlets: usize },
    Destroyed,
    Quit,
}

/// Host state: the class table, collaborators and the current object
pub struct Console {
    classes: &'static ClassTable,
    ctx: ClassContext,
    object: Option<Box<dyn HostObject>>,
}

impl Console {
    /// Create a console using the process-wide class table
    pub fn new(ctx: ClassContext) -> Self {
        Self {
            classes: ClassTable::global(),
            ctx,
            object: None,
        }
    }

    /// The current object
    pub fn object(&self) -> Option<&dyn HostObject> {
        self.object.as_deref()
    }

    /// Handle one input line
    pub fn execute(&mut self, line: &str) -> Result<Outcome, NodeError> {
        let atoms = parse_atoms(line);
        let command = match atoms.first() {
            Some(Atom::Symbol(s)) => s.as_str(),
            Some(Atom::Float(_)) => "list",
            None => "",
        };

        match command {
            "new" => self.create(&atoms[1..]),
            "free" => {
                self.destroy();
                Ok(Outcome::Destroyed)
            }
            "quit" | "exit" => Ok(Outcome::Quit),
            _ => {
                let object = self.object.as_mut().ok_or_else(|| {
                    NodeError::InvalidArgument("no object; create one with 'new <class> <args>'".into())
                })?;
                let args = match atoms.first() {
                    Some(Atom::Symbol(_)) => &atoms[1..],
                    _ => &atoms[..],
                };
                let result = object.dispatch(command, args);
                self.report_events();
                result.map(|()| Outcome::Continue)
            }
        }
    }

    fn create(&mut self, atoms: &[Atom]) -> Result<Outcome, NodeError> {
        let Some(Atom::Symbol(class)) = atoms.first() else {
            return Err(NodeError::InvalidArgument("usage: new <class> <args...>".into()));
        };

        let object = self.classes.instantiate(class, &self.ctx, &atoms[1..])?;
        self.destroy();

        let outlets = object.outlets();
        info!("Created {} with {} outlet(s)", object.class_name(), outlets);
        self.object = Some(object);
        Ok(Outcome::Created { outlets })
    }

    fn destroy(&mut self) {
        if let Some(object) = self.object.take() {
            let name = object.class_name();
            for e in object.destroy() {
                warn!("free: {}", e);
            }
            info!("Destroyed {}", name);
        }
    }

    fn report_events(&mut self) {
        let Some(object) = self.object.as_mut() else {
            return;
        };
        for event in object.drain_events() {
            match &event {
                NodeEvent::ChannelFailed { error, .. } | NodeEvent::CommandFailed { error, .. } => {
                    warn!("{}", error)
                }
                NodeEvent::StateChanged { to, .. } => info!("Node is {}", to.name()),
                NodeEvent::ChannelAttached { channel, .. } => info!("Channel {} attached", channel),
                NodeEvent::Heartbeat => info!("bang"),
                other => tracing::debug!("{:?}", other),
            }
        }
    }

    /// Destroy the current object before exit
    pub fn shutdown(&mut self) {
        self.destroy();
    }
}
