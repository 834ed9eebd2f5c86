use crate::value::{Bindings, Value};

/// Stack of scope frames. The first frame is the global scope.
///
/// Lookup walks innermost to outermost and returns the first match.
#[derive(Debug, Clone)]
pub struct Environment {
    frames: Vec<Bindings>,
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new(Bindings::new())
    }
}

impl Environment {
    pub fn new(globals: Bindings) -> Self {
        Environment {
            frames: vec![globals],
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Binds `name` in the innermost frame.
    pub fn declare(&mut self, name: impl Into<String>, value: Value) {
        self.innermost().insert(name.into(), value);
    }

    /// Updates the frame that owns `name`, or binds it in the innermost
    /// frame when no frame does.
    pub fn assign(&mut self, name: &str, value: Value) {
        if let Some(frame) = self.frames.iter_mut().rev().find(|f| f.contains_key(name)) {
            frame.insert(name.to_string(), value);
        } else {
            self.innermost().insert(name.to_string(), value);
        }
    }

    pub fn push(&mut self) {
        self.frames.push(Bindings::new());
    }

    /// Drops the innermost frame. The global frame is never popped.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn globals(&self) -> &Bindings {
        &self.frames[0]
    }

    /// Consumes the environment, keeping only the global frame.
    pub fn into_globals(mut self) -> Bindings {
        self.frames.truncate(1);
        self.frames.pop().unwrap_or_default()
    }

    fn innermost(&mut self) -> &mut Bindings {
        if self.frames.is_empty() {
            self.frames.push(Bindings::new());
        }
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }
}
