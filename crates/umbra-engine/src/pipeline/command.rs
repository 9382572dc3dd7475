use crate::coords::Viewport;
use crate::error::RenderError;
use crate::geometry::Model;
use crate::paint::Color;
use crate::target::{TargetCommand, TargetId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PassKind {
    Albedo,
    Normal,
    Light,
    Composite,
}

/// Color attachment of a pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PassTarget {
    Offscreen(TargetId),
    /// The swapchain image handed to the executor.
    Surface,
}

#[derive(Debug, Clone)]
pub enum Command {
    Target(TargetCommand),
    BeginPass {
        kind: PassKind,
        target: PassTarget,
        size: Viewport,
        /// `None` loads the existing contents.
        clear: Option<Color>,
    },
    Draw(Model),
    EndPass,
}

/// Ordered GPU work for one frame.
///
/// Storage changes come first, then the passes in execution order. Draws
/// appear only between a `BeginPass` and its `EndPass`.
#[derive(Debug, Clone, Default)]
pub struct FrameCommands {
    pub size: Viewport,
    pub commands: Vec<Command>,
    /// Everything that degraded this frame.
    pub diagnostics: Vec<RenderError>,
}

impl FrameCommands {
    pub fn new(size: Viewport) -> Self {
        Self {
            size,
            commands: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::Draw(_)))
            .count()
    }

    /// Draws recorded inside passes of `kind`.
    pub fn draws_in(&self, kind: PassKind) -> usize {
        let mut current = None;
        let mut count = 0;
        for command in &self.commands {
            match command {
                Command::BeginPass { kind: k, .. } => current = Some(*k),
                Command::EndPass => current = None,
                Command::Draw(_) if current == Some(kind) => count += 1,
                _ => {}
            }
        }
        count
    }

    /// `(kind, target, size)` of every pass, in order.
    pub fn passes(&self) -> Vec<(PassKind, PassTarget, Viewport)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::BeginPass { kind, target, size, .. } => Some((*kind, *target, *size)),
                _ => None,
            })
            .collect()
    }

    pub fn allocations(&self) -> impl Iterator<Item = &TargetCommand> {
        self.target_commands()
            .filter(|c| matches!(c, TargetCommand::Allocate { .. }))
    }

    pub fn disposals(&self) -> impl Iterator<Item = &TargetCommand> {
        self.target_commands()
            .filter(|c| matches!(c, TargetCommand::Dispose { .. }))
    }

    fn target_commands(&self) -> impl Iterator<Item = &TargetCommand> {
        self.commands.iter().filter_map(|c| match c {
            Command::Target(t) => Some(t),
            _ => None,
        })
    }
}
