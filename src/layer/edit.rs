use anyhow::{bail, ensure, Result};

/// A labelled group of changes that undo/redo as one step.
#[derive(Debug, Clone)]
pub struct EditCommand<C> {
    pub label: String,
    pub changes: Vec<C>,
}

/// Edit session with a linear undo stack.
///
/// `index` counts the commands currently applied; commands past it form the
/// redo tail, which is dropped as soon as a new command is pushed.
#[derive(Debug, Clone)]
pub(crate) struct EditBuffer<C> {
    editing: bool,
    stack: Vec<EditCommand<C>>,
    index: usize,
    open: Option<EditCommand<C>>,
}

impl<C> Default for EditBuffer<C> {
    fn default() -> Self {
        Self { editing: false, stack: Vec::new(), index: 0, open: None }
    }
}

impl<C> EditBuffer<C> {
    #[inline] pub(crate) fn is_editing(&self) -> bool { self.editing }

    #[inline] pub(crate) fn has_open_command(&self) -> bool { self.open.is_some() }

    #[inline] pub(crate) fn index(&self) -> usize { self.index }

    /// Number of changes recorded in the open command.
    #[inline]
    pub(crate) fn open_len(&self) -> usize { self.open.as_ref().map_or(0, |open| open.changes.len()) }

    #[inline] pub(crate) fn len(&self) -> usize { self.stack.len() }

    pub(crate) fn start(&mut self) { self.editing = true }

    /// Leave edit mode, forgetting the undo history.
    pub(crate) fn stop(&mut self) {
        self.editing = false;
        self.clear();
    }

    pub(crate) fn clear(&mut self) {
        self.stack.clear();
        self.index = 0;
        self.open = None;
    }

    pub(crate) fn begin(&mut self, label: &str) -> Result<()> {
        ensure!(self.editing, "Layer is not in edit mode");
        if let Some(open) = &self.open {
            bail!("Edit command '{}' is already open", open.label);
        }
        self.open = Some(EditCommand { label: label.to_string(), changes: Vec::new() });
        Ok(())
    }

    /// Record a change that has already been applied.
    /// Returns the change back if there is no open command to hold it.
    pub(crate) fn record(&mut self, change: C) -> Option<C> {
        match self.open.as_mut() {
            Some(open) => { open.changes.push(change); None }
            None => Some(change),
        }
    }

    /// Push a complete command onto the stack, dropping the redo tail.
    pub(crate) fn push(&mut self, command: EditCommand<C>) {
        self.stack.truncate(self.index);
        self.stack.push(command);
        self.index = self.stack.len();
    }

    /// Close the open command. Empty commands are not pushed.
    /// Returns whether a command was added to the stack.
    pub(crate) fn end(&mut self) -> Result<bool> {
        let Some(open) = self.open.take() else { bail!("No edit command is open") };
        if open.changes.is_empty() { return Ok(false) }
        self.push(open);
        Ok(true)
    }

    /// Remove the open command without pushing it; the caller reverts its changes.
    pub(crate) fn take_open(&mut self) -> Option<EditCommand<C>> { self.open.take() }

    /// Move one command back and return it for reverting.
    pub(crate) fn step_back(&mut self) -> Option<&EditCommand<C>> {
        if self.index == 0 || self.open.is_some() { return None }
        self.index -= 1;
        self.stack.get(self.index)
    }

    /// Move one command forward and return it for reapplying.
    pub(crate) fn step_forward(&mut self) -> Option<&EditCommand<C>> {
        if self.index >= self.stack.len() || self.open.is_some() { return None }
        self.index += 1;
        self.stack.get(self.index - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_requires_edit_mode() {
        let mut buffer = EditBuffer::<u32>::default();
        assert!(buffer.begin("x").is_err());
        buffer.start();
        assert!(buffer.begin("x").is_ok());
        assert!(buffer.begin("y").is_err());
    }

    #[test]
    fn empty_commands_are_not_pushed() {
        let mut buffer = EditBuffer::<u32>::default();
        buffer.start();
        buffer.begin("noop").unwrap();
        assert!(!buffer.end().unwrap());
        assert_eq!(buffer.index(), 0);
    }

    #[test]
    fn push_drops_redo_tail() {
        let mut buffer = EditBuffer::<u32>::default();
        buffer.start();
        for value in 0..3 {
            buffer.begin("c").unwrap();
            assert!(buffer.record(value).is_none());
            buffer.end().unwrap();
        }
        assert_eq!(buffer.step_back().unwrap().changes, vec![2]);
        assert_eq!(buffer.step_back().unwrap().changes, vec![1]);
        assert_eq!(buffer.index(), 1);

        buffer.push(EditCommand { label: "d".into(), changes: vec![9] });
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.index(), 2);
        assert!(buffer.step_forward().is_none());
    }
}
