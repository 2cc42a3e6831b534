//! Statically declared decision graphs
//!
//! A [`StateGraph`] is built node by node, like a phase list, and then
//! [`compile`](StateGraph::compile)d into a [`CompiledGraph`]. Compilation
//! checks the whole shape up front so a bad wiring never reaches a run:
//!
//! - exactly one edge out of [`START`]
//! - every edge endpoint is a declared node or a marker
//! - every node has exactly one outgoing transition (static or conditional)
//! - every node is reachable from [`START`]
//! - no cycles
//!
//! In an acyclic graph where every node has an outgoing transition, every
//! path terminates at [`END`].

mod compiled;

pub use compiled::{CompiledGraph, RunTrace, TraceStep};

use anyhow::{bail, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

/// Entry marker
pub const START: &str = "__start__";

/// Terminal marker
pub const END: &str = "__end__";

/// State types that can flow through a graph
pub trait GraphState: Clone {
    /// Short description used in the run-started event
    fn run_label(&self) -> String;

    /// Checked once the run reaches [`END`]
    fn check_terminal(&self) -> Result<()> {
        Ok(())
    }
}

/// Per-run context handed to every node
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub graph: String,
}

impl RunContext {
    pub fn new(graph: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            graph: graph.into(),
        }
    }
}

/// A node: borrows the prior state, returns the next one
pub type NodeFn<S> = Box<dyn Fn(&S, &RunContext) -> Result<S> + Send + Sync>;

/// A router: maps a state to a route key
pub type RouterFn<S> = Box<dyn Fn(&S) -> String + Send + Sync>;

pub(crate) enum Transition<S> {
    Static(String),
    Conditional {
        router: RouterFn<S>,
        routes: BTreeMap<String, String>,
    },
}

impl<S> Transition<S> {
    fn targets(&self) -> Vec<&str> {
        match self {
            Transition::Static(target) => vec![target.as_str()],
            Transition::Conditional { routes, .. } => {
                routes.values().map(String::as_str).collect()
            }
        }
    }
}

/// Builder for a decision graph
pub struct StateGraph<S> {
    name: String,
    nodes: Vec<(String, NodeFn<S>)>,
    entry: Option<String>,
    transitions: HashMap<String, Transition<S>>,
}

impl<S: GraphState> StateGraph<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            entry: None,
            transitions: HashMap::new(),
        }
    }

    /// Declare a node
    pub fn add_node<F>(&mut self, name: &str, node: F) -> Result<&mut Self>
    where
        F: Fn(&S, &RunContext) -> Result<S> + Send + Sync + 'static,
    {
        if name == START || name == END {
            bail!("'{}' is a reserved marker and cannot be a node name", name);
        }
        if name.is_empty() {
            bail!("Node name must not be empty");
        }
        if self.nodes.iter().any(|(existing, _)| existing == name) {
            bail!("Node '{}' is already declared", name);
        }
        self.nodes.push((name.to_string(), Box::new(node)));
        Ok(self)
    }

    /// Declare an unconditional edge; `from` may be [`START`], `to` may be [`END`]
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<&mut Self> {
        if to == START {
            bail!("Edges cannot point back to the start marker");
        }
        if from == END {
            bail!("Edges cannot leave the end marker");
        }

        if from == START {
            if let Some(existing) = &self.entry {
                bail!("Start edge already points to '{}'", existing);
            }
            if to == END {
                bail!("Start edge must point to a node");
            }
            self.entry = Some(to.to_string());
            return Ok(self);
        }

        self.set_transition(from, Transition::Static(to.to_string()))?;
        Ok(self)
    }

    /// Declare a conditional fan-out from `from`
    ///
    /// `routes` maps the router's keys to node names (or [`END`]).
    pub fn add_conditional_edges<R, I, K, V>(
        &mut self,
        from: &str,
        router: R,
        routes: I,
    ) -> Result<&mut Self>
    where
        R: Fn(&S) -> String + Send + Sync + 'static,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if from == START || from == END {
            bail!("Conditional edges must leave a node, not '{}'", from);
        }

        let routes: BTreeMap<String, String> = routes
            .into_iter()
            .map(|(key, target)| (key.into(), target.into()))
            .collect();
        if routes.is_empty() {
            bail!("Conditional edges from '{}' declare no routes", from);
        }
        if routes.values().any(|target| target == START) {
            bail!("Conditional edges from '{}' cannot route to the start marker", from);
        }

        self.set_transition(
            from,
            Transition::Conditional {
                router: Box::new(router),
                routes,
            },
        )?;
        Ok(self)
    }

    fn set_transition(&mut self, from: &str, transition: Transition<S>) -> Result<()> {
        if self.transitions.contains_key(from) {
            bail!("Node '{}' already has an outgoing transition", from);
        }
        self.transitions.insert(from.to_string(), transition);
        Ok(())
    }

    /// Validate the graph and freeze it for execution
    pub fn compile(self) -> Result<CompiledGraph<S>> {
        let declared: HashSet<&str> = self.nodes.iter().map(|(name, _)| name.as_str()).collect();

        let entry = match &self.entry {
            Some(entry) => entry.clone(),
            None => bail!("Graph '{}' has no start edge", self.name),
        };
        if !declared.contains(entry.as_str()) {
            bail!("Start edge points to undeclared node '{}'", entry);
        }

        for (from, transition) in &self.transitions {
            if !declared.contains(from.as_str()) {
                bail!("Edge leaves undeclared node '{}'", from);
            }
            for target in transition.targets() {
                if target != END && !declared.contains(target) {
                    bail!("Edge from '{}' points to undeclared node '{}'", from, target);
                }
            }
        }

        for (name, _) in &self.nodes {
            if !self.transitions.contains_key(name) {
                bail!("Node '{}' has no outgoing edge", name);
            }
        }

        let reachable = self.reachable_from(&entry);
        if let Some((name, _)) = self
            .nodes
            .iter()
            .find(|(name, _)| !reachable.contains(name.as_str()))
        {
            bail!("Node '{}' is unreachable from the start edge", name);
        }

        if let Some(node) = self.find_cycle(&entry) {
            bail!("Graph '{}' contains a cycle through '{}'", self.name, node);
        }

        Ok(CompiledGraph::new(
            self.name,
            self.nodes.into_iter().collect(),
            entry,
            self.transitions,
        ))
    }

    fn reachable_from<'a>(&'a self, entry: &'a str) -> HashSet<&'a str> {
        let mut seen = HashSet::new();
        let mut stack = vec![entry];
        while let Some(node) = stack.pop() {
            if node == END || !seen.insert(node) {
                continue;
            }
            if let Some(transition) = self.transitions.get(node) {
                stack.extend(transition.targets());
            }
        }
        seen
    }

    /// Depth-first search; returns a node on a cycle if there is one
    fn find_cycle(&self, entry: &str) -> Option<String> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<S>(
            node: &str,
            transitions: &HashMap<String, Transition<S>>,
            marks: &mut HashMap<String, Mark>,
        ) -> Option<String> {
            match marks.get(node) {
                Some(Mark::Visiting) => return Some(node.to_string()),
                Some(Mark::Done) => return None,
                None => {}
            }
            marks.insert(node.to_string(), Mark::Visiting);
            if let Some(transition) = transitions.get(node) {
                for target in transition.targets() {
                    if target == END {
                        continue;
                    }
                    if let Some(cycle) = visit(target, transitions, marks) {
                        return Some(cycle);
                    }
                }
            }
            marks.insert(node.to_string(), Mark::Done);
            None
        }

        let mut marks = HashMap::new();
        visit(entry, &self.transitions, &mut marks)
    }
}
