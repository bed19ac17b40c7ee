//! Tracer - builds a [`TraceNode`] tree through nested, optionally timed contexts

use std::time::Instant;

use super::TraceNode;
use crate::{Error, Result};

/// Metric name for elapsed wall-clock seconds of a context.
pub const WALLTIME: &str = "walltime";

/// Records a trace tree while a variant runs.
///
/// Contexts are opened with [`Tracer::enter`] (or the scoped
/// [`Tracer::context`]) and closed with [`Tracer::exit`]. Re-entering an
/// existing `(label, index)` under the same parent reuses that node, so a
/// tree never holds two siblings with the same key.
#[derive(Debug)]
pub struct Tracer {
    root: TraceNode,
    /// Child positions from the root to the current node.
    path: Vec<usize>,
    /// Start instants of the root and every open context.
    clocks: Vec<Instant>,
    start_clocks: bool,
}

impl Tracer {
    /// Create a tracer rooted at `label`.
    ///
    /// With `start_clocks` every context records its elapsed time under
    /// [`WALLTIME`]; without it the trace is fully deterministic.
    #[must_use]
    pub fn new(label: impl Into<String>, start_clocks: bool) -> Self {
        let clocks = if start_clocks {
            vec![Instant::now()]
        } else {
            Vec::new()
        };
        Self {
            root: TraceNode::new(label, None),
            path: Vec::new(),
            clocks,
            start_clocks,
        }
    }

    /// Number of open contexts below the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// The node currently being recorded into.
    #[must_use]
    pub fn current(&self) -> &TraceNode {
        let mut node = &self.root;
        for &i in &self.path {
            node = &node.children[i];
        }
        node
    }

    fn current_mut(&mut self) -> &mut TraceNode {
        let mut node = &mut self.root;
        for &i in &self.path {
            node = &mut node.children[i];
        }
        node
    }

    /// Open the child context `(label, index)` of the current node.
    pub fn enter(&mut self, label: impl Into<String>, index: Option<usize>) {
        let label = label.into();
        let pos = self.current_mut().child_position(&label, index);
        self.path.push(pos);
        if self.start_clocks {
            self.clocks.push(Instant::now());
        }
    }

    /// Close the current context.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if no context is open.
    pub fn exit(&mut self) -> Result<()> {
        if self.path.is_empty() {
            return Err(Error::InvalidInput(
                "tracer exit without a matching enter".to_string(),
            ));
        }
        if self.start_clocks {
            if let Some(start) = self.clocks.pop() {
                let elapsed = start.elapsed().as_secs_f64();
                self.current_mut().data_mut().increment(WALLTIME, elapsed);
            }
        }
        self.path.pop();
        Ok(())
    }

    /// Run `f` inside the context `(label, index)`.
    ///
    /// The context is closed even when `f` fails; the error of `f` wins.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `f`.
    pub fn context<T>(
        &mut self,
        label: impl Into<String>,
        index: Option<usize>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.enter(label, index);
        let depth = self.path.len();
        let out = f(self);
        // unwind contexts the closure left open
        while self.path.len() >= depth {
            self.exit()?;
        }
        out
    }

    /// Set a metric on the current node.
    pub fn record(&mut self, key: impl Into<String>, value: f64) {
        self.current_mut().data_mut().insert(key, value);
    }

    /// Add to a counter on the current node.
    pub fn increment(&mut self, key: impl Into<String>, by: f64) {
        self.current_mut().data_mut().increment(key, by);
    }

    /// Close every open context and return the finished tree.
    #[must_use]
    pub fn finish(mut self) -> TraceNode {
        while !self.path.is_empty() {
            // path is non-empty, exit cannot fail
            let _ = self.exit();
        }
        if self.start_clocks {
            if let Some(start) = self.clocks.pop() {
                let elapsed = start.elapsed().as_secs_f64();
                self.root.data_mut().increment(WALLTIME, elapsed);
            }
        }
        self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_contexts() {
        let mut tracer = Tracer::new("root", false);
        tracer
            .context("tour", Some(0), |t| {
                t.increment("swaps", 1.0);
                t.context("preprocessing", None, |t| {
                    assert_eq!(t.depth(), 2);
                    t.record("calls", 4.0);
                    Ok(())
                })
            })
            .unwrap();
        assert_eq!(tracer.depth(), 0);

        let trace = tracer.finish();
        let pre = trace
            .find_path(&[("tour", Some(0)), ("preprocessing", None)])
            .unwrap();
        assert_eq!(pre.data().get("calls"), Some(4.0));
        assert!(trace.data().is_empty());
    }

    #[test]
    fn test_reentering_reuses_node() {
        let mut tracer = Tracer::new("root", false);
        for _ in 0..3 {
            tracer
                .context("tour", Some(0), |t| {
                    t.increment("swaps", 2.0);
                    Ok(())
                })
                .unwrap();
        }
        let trace = tracer.finish();
        assert_eq!(trace.children().len(), 1);
        assert_eq!(trace.find("tour", Some(0)).unwrap().data().get("swaps"), Some(6.0));
    }

    #[test]
    fn test_context_closes_on_error() {
        let mut tracer = Tracer::new("root", false);
        let result: Result<()> = tracer.context("tour", Some(0), |t| {
            t.enter("inner", None);
            Err(Error::Other("boom".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(tracer.depth(), 0);
    }

    #[test]
    fn test_exit_without_enter_errors() {
        let mut tracer = Tracer::new("root", false);
        assert!(tracer.exit().is_err());
    }

    #[test]
    fn test_clocks_record_walltime() {
        let mut tracer = Tracer::new("root", true);
        tracer.context("tour", Some(0), |_| Ok(())).unwrap();
        let trace = tracer.finish();
        assert!(trace.data().get(WALLTIME).unwrap() >= 0.0);
        assert!(trace.find("tour", Some(0)).unwrap().data().contains_key(WALLTIME));
    }

    #[test]
    fn test_finish_closes_open_contexts() {
        let mut tracer = Tracer::new("root", false);
        tracer.enter("tour", Some(0));
        tracer.enter("svp", Some(3));
        let trace = tracer.finish();
        assert!(trace.find_path(&[("tour", Some(0)), ("svp", Some(3))]).is_some());
    }
}
